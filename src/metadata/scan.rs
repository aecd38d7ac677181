use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use walkdir::WalkDir;

use super::lua::decode_metadata;
use super::models::{Book, Bookmark, Books};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid Lua in {path}: {message}")]
    Lua { path: String, message: String },

    #[error("Malformed metadata in {path}: {reason}")]
    Malformed { path: String, reason: String },
}

/// Reads every KOReader sidecar below a base path.
pub struct MetadataSource {
    base_path: PathBuf,
    file_pattern: Regex,
}

impl MetadataSource {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            file_pattern: Regex::new(r"^metadata\..*\.lua$").expect("Invalid regex"),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Scan the whole tree.
    ///
    /// Any traversal error or unparsable sidecar aborts the scan, so callers
    /// never act on a partial view of the device. Books without highlights
    /// are left out.
    pub fn scan(&self) -> Result<Books, ScanError> {
        let mut books = Books::new();

        for entry in WalkDir::new(&self.base_path) {
            let entry = entry.map_err(|source| ScanError::Walk {
                path: self.base_path.clone(),
                source,
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let file_name = entry.file_name().to_string_lossy();
            if !self.file_pattern.is_match(&file_name) {
                continue;
            }

            let path = entry.path();
            log::debug!("Reading sidecar {}", path.display());
            let content = fs::read_to_string(path)?;
            let tree = decode_metadata(&content, &path.to_string_lossy())?;

            if let Some(book) = book_from_metadata(&tree, &path.to_string_lossy())? {
                let key = book.full_title();
                if books.contains_key(&key) {
                    log::warn!("Duplicate metadata for \"{}\", keeping {}", key, path.display());
                }
                books.insert(key, book);
            }
        }

        log::info!(
            "Scanned {}: {} book(s) with highlights",
            self.base_path.display(),
            books.len()
        );
        Ok(books)
    }
}

/// Build a [`Book`] from a decoded sidecar tree.
///
/// Returns `Ok(None)` when the book has no highlights or no bookmarks yet.
pub fn book_from_metadata(tree: &Value, path: &str) -> Result<Option<Book>, ScanError> {
    let doc_props = tree
        .get("doc_props")
        .and_then(Value::as_object)
        .ok_or_else(|| ScanError::Malformed {
            path: path.to_string(),
            reason: "missing doc_props table".to_string(),
        })?;

    let highlight = tree.get("highlight").cloned().unwrap_or(Value::Null);
    let bookmarks = match tree.get("bookmarks") {
        Some(Value::Object(map)) => map,
        _ => return Ok(None),
    };

    if is_empty_table(&highlight) || bookmarks.is_empty() {
        return Ok(None);
    }

    let mut parsed = std::collections::BTreeMap::new();
    for (index, raw) in bookmarks {
        if !raw.is_object() {
            return Err(ScanError::Malformed {
                path: path.to_string(),
                reason: format!("bookmark {} is not a table", index),
            });
        }
        parsed.insert(index.clone(), bookmark_from_metadata(raw));
    }

    let percent_finished = tree
        .get("percent_finished")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);

    Ok(Some(Book {
        title: field_string(doc_props.get("title")).unwrap_or_default(),
        authors: field_string(doc_props.get("authors")).unwrap_or_default(),
        bookmarks: parsed,
        percent_finished: percent_finished * 100.0,
        highlight,
    }))
}

fn bookmark_from_metadata(raw: &Value) -> Bookmark {
    Bookmark {
        chapter: field_string(raw.get("chapter")).unwrap_or_default(),
        text: field_string(raw.get("text")),
        datetime: field_string(raw.get("datetime")).unwrap_or_default(),
        notes: field_string(raw.get("notes")).unwrap_or_default(),
        highlighted: raw.get("highlighted").and_then(Value::as_bool).unwrap_or(false),
        pos0: field_string(raw.get("pos0")).unwrap_or_default(),
        pos1: field_string(raw.get("pos1")),
        page: field_string(raw.get("page")).unwrap_or_default(),
    }
}

fn is_empty_table(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => true,
    }
}

/// Sidecars store some scalars as numbers depending on the document type
fn field_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SIDECAR: &str = r#"-- we can read Lua syntax here!
return {
    ["doc_props"] = {
        ["title"] = "Foo",
        ["authors"] = "Bar",
    },
    ["percent_finished"] = 0.25,
    ["highlight"] = {
        [5] = {
            [1] = {
                ["chapter"] = "Ch1",
                ["datetime"] = "2022-01-01 00:00:00",
                ["pos0"] = "p0",
                ["pos1"] = "p1",
                ["text"] = "hi",
            },
        },
    },
    ["bookmarks"] = {
        [1] = {
            ["chapter"] = "Ch1",
            ["datetime"] = "2022-01-01 00:00:00",
            ["highlighted"] = true,
            ["notes"] = "hi",
            ["page"] = "p0",
            ["pos0"] = "p0",
            ["pos1"] = "p1",
            ["text"] = "Pagina 5 hi @ 2022-01-01 00:00:00 my thoughts",
        },
    },
}"#;

    const UNANNOTATED: &str = r#"return {
    ["doc_props"] = { ["title"] = "Empty", ["authors"] = "Nobody" },
    ["highlight"] = {},
    ["bookmarks"] = {},
}"#;

    fn write_sidecar(root: &Path, dir: &str, name: &str, content: &str) {
        let sdr = root.join(dir);
        fs::create_dir_all(&sdr).unwrap();
        fs::write(sdr.join(name), content).unwrap();
    }

    #[test]
    fn test_scan_finds_annotated_books() {
        let temp = TempDir::new().unwrap();
        write_sidecar(temp.path(), "books/foo.sdr", "metadata.epub.lua", SIDECAR);
        write_sidecar(temp.path(), "books/empty.sdr", "metadata.pdf.lua", UNANNOTATED);
        write_sidecar(temp.path(), "books/foo.sdr", "notes.lua", SIDECAR);

        let books = MetadataSource::new(temp.path()).scan().unwrap();

        assert_eq!(books.len(), 1);
        let book = &books["Foo - Bar"];
        assert_eq!(book.title, "Foo");
        assert_eq!(book.authors, "Bar");
        assert_eq!(book.percent_finished, 25.0);

        let bookmark = &book.bookmarks["1"];
        assert_eq!(bookmark.pos0, "p0");
        assert_eq!(bookmark.pos1.as_deref(), Some("p1"));
        assert_eq!(bookmark.notes, "hi");
        assert!(bookmark.highlighted);
        assert_eq!(
            bookmark.text.as_deref(),
            Some("Pagina 5 hi @ 2022-01-01 00:00:00 my thoughts")
        );
    }

    #[test]
    fn test_scan_duplicate_books_collapse() {
        let temp = TempDir::new().unwrap();
        write_sidecar(temp.path(), "a.sdr", "metadata.epub.lua", SIDECAR);
        write_sidecar(temp.path(), "b.sdr", "metadata.epub.lua", SIDECAR);

        let books = MetadataSource::new(temp.path()).scan().unwrap();
        assert_eq!(books.len(), 1);
    }

    #[test]
    fn test_scan_malformed_sidecar_is_fatal() {
        let temp = TempDir::new().unwrap();
        write_sidecar(temp.path(), "a.sdr", "metadata.epub.lua", SIDECAR);
        write_sidecar(temp.path(), "b.sdr", "metadata.epub.lua", "return {");

        let result = MetadataSource::new(temp.path()).scan();
        assert!(matches!(result, Err(ScanError::Lua { .. })));
    }

    #[test]
    fn test_scan_missing_root_is_fatal() {
        let temp = TempDir::new().unwrap();
        let result = MetadataSource::new(temp.path().join("not-mounted")).scan();
        assert!(matches!(result, Err(ScanError::Walk { .. })));
    }

    #[test]
    fn test_book_without_doc_props() {
        let tree = serde_json::json!({ "bookmarks": {} });
        let result = book_from_metadata(&tree, "metadata.epub.lua");
        assert!(matches!(result, Err(ScanError::Malformed { .. })));
    }

    #[test]
    fn test_point_bookmark_has_no_pos1() {
        let tree = serde_json::json!({
            "doc_props": { "title": "T", "authors": "A" },
            "highlight": { "3": {} },
            "bookmarks": { "1": { "pos0": "x", "page": 12 } },
        });
        let book = book_from_metadata(&tree, "m").unwrap().unwrap();
        let bookmark = &book.bookmarks["1"];
        assert_eq!(bookmark.pos1, None);
        assert_eq!(bookmark.page, "12");
        assert_eq!(bookmark.text, None);
    }
}
