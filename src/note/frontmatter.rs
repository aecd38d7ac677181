use serde_yaml::{Mapping, Value};
use thiserror::Error;

use super::header::{SyncHeader, SYNC_KEY};

#[derive(Error, Debug)]
pub enum FrontMatterError {
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Front matter is not a key-value block")]
    NotAMapping,

    #[error("Unterminated front matter block")]
    Unterminated,
}

/// A markdown note split into its front matter and body.
///
/// Keys written by other tools are kept in order and written back untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteFile {
    front_matter: Mapping,
    pub body: String,
}

impl NoteFile {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            front_matter: Mapping::new(),
            body: body.into(),
        }
    }

    /// Split `---` delimited YAML from the body.
    ///
    /// Content without an opening delimiter is all body.
    pub fn parse(content: &str) -> Result<Self, FrontMatterError> {
        let Some(after_open) = strip_delimiter_line(content) else {
            return Ok(Self::new(content));
        };

        let (yaml, body) = split_at_closing_delimiter(after_open).ok_or(FrontMatterError::Unterminated)?;

        let front_matter = if yaml.trim().is_empty() {
            Mapping::new()
        } else {
            match serde_yaml::from_str::<Value>(yaml)? {
                Value::Mapping(map) => map,
                Value::Null => Mapping::new(),
                _ => return Err(FrontMatterError::NotAMapping),
            }
        };

        Ok(Self {
            front_matter,
            body: body.to_string(),
        })
    }

    /// The importer's header, `None` when the note carries no `koreader-sync` key.
    pub fn sync_header(&self) -> Result<Option<SyncHeader>, FrontMatterError> {
        match self.front_matter.get(SYNC_KEY) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(serde_yaml::from_value(value.clone())?)),
        }
    }

    /// Replace the importer's header in place, keeping its position.
    pub fn set_sync_header(&mut self, header: &SyncHeader) -> Result<(), FrontMatterError> {
        let value = serde_yaml::to_value(header)?;
        self.front_matter.insert(Value::String(SYNC_KEY.to_string()), value);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.front_matter.get(key)
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.front_matter.insert(Value::String(key.to_string()), value);
    }

    /// Serialize back to markdown. The body always ends with a newline.
    pub fn to_markdown(&self) -> Result<String, FrontMatterError> {
        let body = with_trailing_newline(&self.body);
        if self.front_matter.is_empty() {
            return Ok(body);
        }
        let yaml = serde_yaml::to_string(&self.front_matter)?;
        Ok(format!("---\n{}---\n{}", with_trailing_newline(&yaml), body))
    }
}

/// The body as it reads back after a write
pub fn with_trailing_newline(text: &str) -> String {
    if text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{}\n", text)
    }
}

fn strip_delimiter_line(content: &str) -> Option<&str> {
    let rest = content.strip_prefix("---")?;
    rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))
}

/// Find the closing `---` line; returns (yaml, body)
fn split_at_closing_delimiter(after_open: &str) -> Option<(&str, &str)> {
    let mut line_start = 0;
    for line in after_open.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == "---" {
            let yaml = &after_open[..line_start];
            let body = &after_open[line_start + line.len()..];
            return Some((yaml, body));
        }
        line_start += line.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::{HighlightData, HighlightHeader, HighlightMetadata};

    fn sample_header() -> SyncHeader {
        SyncHeader::Highlight(HighlightHeader {
            unique_id: "abc".to_string(),
            data: HighlightData {
                title: "Foo".to_string(),
                authors: "Bar".to_string(),
                chapter: "Ch1".to_string(),
                page: 5,
                highlight: "hi".to_string(),
                datetime: "2022-01-01 00:00:00".to_string(),
                text: "my thoughts".to_string(),
            },
            metadata: HighlightMetadata {
                body_hash: "h".to_string(),
                keep_in_sync: true,
                yet_to_be_edited: true,
                managed_book_title: "Foo-Bar".to_string(),
            },
            extra: Default::default(),
        })
    }

    #[test]
    fn test_parse_without_front_matter() {
        let note = NoteFile::parse("# Just a heading\n\nSome content.").unwrap();
        assert!(note.sync_header().unwrap().is_none());
        assert_eq!(note.body, "# Just a heading\n\nSome content.");
    }

    #[test]
    fn test_parse_foreign_front_matter() {
        let note = NoteFile::parse("---\ntags: [a, b]\n---\nbody\n").unwrap();
        assert!(note.sync_header().unwrap().is_none());
        assert!(note.get("tags").is_some());
        assert_eq!(note.body, "body\n");
    }

    #[test]
    fn test_header_survives_write_and_read() {
        let mut note = NoteFile::new("body text");
        note.set("tags", Value::String("reading".to_string()));
        note.set_sync_header(&sample_header()).unwrap();

        let markdown = note.to_markdown().unwrap();
        assert!(markdown.starts_with("---\ntags: reading\nkoreader-sync:\n  type: single-highlight-note\n"));
        assert!(markdown.ends_with("---\nbody text\n"));

        let parsed = NoteFile::parse(&markdown).unwrap();
        assert_eq!(parsed.sync_header().unwrap(), Some(sample_header()));
        assert_eq!(parsed.body, "body text\n");
        assert_eq!(parsed.get("tags"), Some(&Value::String("reading".to_string())));
    }

    #[test]
    fn test_hand_added_header_keys_survive_rewrite() {
        let content = "---\nkoreader-sync:\n  type: single-highlight-note\n  uniqueId: abc\n  rating: 5\n  metadata:\n    keep_in_sync: true\n---\nbody\n";
        let mut note = NoteFile::parse(content).unwrap();
        let mut header = note.sync_header().unwrap().unwrap();
        header.set_yet_to_be_edited(false);
        note.set_sync_header(&header).unwrap();

        let reparsed = NoteFile::parse(&note.to_markdown().unwrap()).unwrap();
        match reparsed.sync_header().unwrap() {
            Some(SyncHeader::Highlight(h)) => {
                assert_eq!(h.unique_id, "abc");
                assert_eq!(h.extra.get("rating"), Some(&Value::Number(5.into())));
                assert!(h.extra.get("type").is_none());
            }
            other => panic!("expected highlight header, got {:?}", other),
        }
    }

    #[test]
    fn test_legacy_type_tag() {
        let content = "---\nkoreader-sync:\n  type: koreader-sync-note\n  uniqueId: xyz\n  data:\n    page: 3\n  metadata:\n    keep_in_sync: true\n    yet_to_be_edited: false\n---\nbody";
        let header = NoteFile::parse(content).unwrap().sync_header().unwrap().unwrap();
        match header {
            SyncHeader::Highlight(h) => {
                assert_eq!(h.unique_id, "xyz");
                assert_eq!(h.data.page, 3);
                assert!(h.metadata.keep_in_sync);
                assert!(!h.metadata.yet_to_be_edited);
            }
            other => panic!("expected highlight header, got {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_front_matter() {
        let result = NoteFile::parse("---\nkey: value\nbody");
        assert!(matches!(result, Err(FrontMatterError::Unterminated)));
    }

    #[test]
    fn test_scalar_front_matter_rejected() {
        let result = NoteFile::parse("---\njust a string\n---\nbody");
        assert!(matches!(result, Err(FrontMatterError::NotAMapping)));
    }
}
