use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;

/// Top-level front-matter key holding everything this importer writes
pub const SYNC_KEY: &str = "koreader-sync";

/// CSS class attached to book-summary notes
pub const BOOK_NOTE_CSS_CLASS: &str = "koreader-sync-dataview";

/// The `koreader-sync` block of a generated note.
///
/// The older `koreader-sync-note` / `koreader-sync-dataview` tags are read as
/// aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SyncHeader {
    #[serde(rename = "single-highlight-note", alias = "koreader-sync-note")]
    Highlight(HighlightHeader),
    #[serde(rename = "book-summary-note", alias = "koreader-sync-dataview")]
    BookSummary(BookSummaryHeader),
}

impl SyncHeader {
    pub fn unique_id(&self) -> &str {
        match self {
            SyncHeader::Highlight(h) => &h.unique_id,
            SyncHeader::BookSummary(b) => &b.unique_id,
        }
    }

    pub fn keep_in_sync(&self) -> bool {
        match self {
            SyncHeader::Highlight(h) => h.metadata.keep_in_sync,
            SyncHeader::BookSummary(b) => b.metadata.keep_in_sync,
        }
    }

    pub fn yet_to_be_edited(&self) -> bool {
        match self {
            SyncHeader::Highlight(h) => h.metadata.yet_to_be_edited,
            SyncHeader::BookSummary(b) => b.metadata.yet_to_be_edited,
        }
    }

    pub fn set_keep_in_sync(&mut self, value: bool) {
        match self {
            SyncHeader::Highlight(h) => h.metadata.keep_in_sync = value,
            SyncHeader::BookSummary(b) => b.metadata.keep_in_sync = value,
        }
    }

    pub fn set_yet_to_be_edited(&mut self, value: bool) {
        match self {
            SyncHeader::Highlight(h) => h.metadata.yet_to_be_edited = value,
            SyncHeader::BookSummary(b) => b.metadata.yet_to_be_edited = value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightHeader {
    #[serde(rename = "uniqueId", default)]
    pub unique_id: String,
    #[serde(default)]
    pub data: HighlightData,
    #[serde(default)]
    pub metadata: HighlightMetadata,
    /// Keys added to the block by hand, written back untouched
    #[serde(flatten, default, skip_serializing_if = "Mapping::is_empty")]
    pub extra: Mapping,
}

/// Rendering inputs captured when the note was last generated
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightData {
    pub title: String,
    pub authors: String,
    pub chapter: String,
    pub page: i64,
    pub highlight: String,
    pub datetime: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightMetadata {
    pub body_hash: String,
    pub keep_in_sync: bool,
    pub yet_to_be_edited: bool,
    pub managed_book_title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookSummaryHeader {
    #[serde(rename = "uniqueId", default)]
    pub unique_id: String,
    #[serde(default)]
    pub data: BookData,
    #[serde(default)]
    pub metadata: BookMetadata,
    #[serde(flatten, default, skip_serializing_if = "Mapping::is_empty")]
    pub extra: Mapping,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookData {
    pub title: String,
    pub authors: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookMetadata {
    /// Percentage, 0..=100
    pub percent_finished: f64,
    pub managed_title: String,
    pub keep_in_sync: bool,
    pub yet_to_be_edited: bool,
}
