use similar::{capture_diff_slices, Algorithm, DiffOp};

/// Free text written into the shadow note in place of the reader's own
pub const SENTINEL: &str = "placeholder";

/// A run of lines that are equal, only in the live note, or only in the shadow
#[derive(Debug, Clone, PartialEq)]
pub enum DiffBlock {
    Equal(Vec<String>),
    Removed(Vec<String>),
    Added(Vec<String>),
}

impl DiffBlock {
    fn lines_mut(&mut self) -> &mut Vec<String> {
        match self {
            DiffBlock::Equal(lines) | DiffBlock::Removed(lines) | DiffBlock::Added(lines) => lines,
        }
    }

    fn into_lines(self) -> Vec<String> {
        match self {
            DiffBlock::Equal(lines) | DiffBlock::Removed(lines) | DiffBlock::Added(lines) => lines,
        }
    }

    fn push(blocks: &mut Vec<DiffBlock>, block: DiffBlock) {
        match blocks.last_mut() {
            Some(last) if std::mem::discriminant(last) == std::mem::discriminant(&block) => {
                last.lines_mut().extend(block.into_lines())
            }
            _ => blocks.push(block),
        }
    }
}

fn trimmed_lines(text: &str) -> Vec<&str> {
    text.lines().map(str::trim).collect()
}

/// Line diff of `live` against `shadow`, whitespace around each line ignored.
///
/// Consecutive operations of one kind are merged; a replacement becomes a
/// `Removed` block followed by an `Added` block.
pub fn diff_blocks(live: &str, shadow: &str) -> Vec<DiffBlock> {
    let old = trimmed_lines(live);
    let new = trimmed_lines(shadow);
    let owned = |lines: &[&str]| lines.iter().map(|l| l.to_string()).collect::<Vec<_>>();

    let mut blocks = Vec::new();
    for op in capture_diff_slices(Algorithm::Myers, &old, &new) {
        match op {
            DiffOp::Equal { old_index, len, .. } => {
                DiffBlock::push(&mut blocks, DiffBlock::Equal(owned(&old[old_index..old_index + len])));
            }
            DiffOp::Delete {
                old_index, old_len, ..
            } => {
                DiffBlock::push(
                    &mut blocks,
                    DiffBlock::Removed(owned(&old[old_index..old_index + old_len])),
                );
            }
            DiffOp::Insert {
                new_index, new_len, ..
            } => {
                DiffBlock::push(&mut blocks, DiffBlock::Added(owned(&new[new_index..new_index + new_len])));
            }
            DiffOp::Replace {
                old_index,
                old_len,
                new_index,
                new_len,
            } => {
                DiffBlock::push(
                    &mut blocks,
                    DiffBlock::Removed(owned(&old[old_index..old_index + old_len])),
                );
                DiffBlock::push(&mut blocks, DiffBlock::Added(owned(&new[new_index..new_index + new_len])));
            }
        }
    }
    blocks
}

/// Text the reader wrote where the shadow carries the sentinel.
///
/// `None` when no added block consists of exactly the sentinel line. When
/// the block before the sentinel is not a removal the reader left the spot
/// empty, which yields an empty string.
pub fn sentinel_text(live: &str, shadow: &str) -> Option<String> {
    let blocks = diff_blocks(live, shadow);
    let at = blocks
        .iter()
        .position(|block| matches!(block, DiffBlock::Added(lines) if lines.len() == 1 && lines[0] == SENTINEL))?;

    match at.checked_sub(1).and_then(|i| blocks.get(i)) {
        Some(DiffBlock::Removed(lines)) => Some(lines.join("\n")),
        _ => Some(String::new()),
    }
}
