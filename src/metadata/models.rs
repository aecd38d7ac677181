use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One highlighted passage or annotation from a KOReader sidecar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bookmark {
    /// Section label the highlight belongs to
    pub chapter: String,
    /// Composite "Pagina <page> <highlight> @ <datetime> <note>" string
    pub text: Option<String>,
    /// `YYYY-MM-DD HH:MM:SS`, sortable lexically
    pub datetime: String,
    /// The highlighted excerpt itself
    pub notes: String,
    pub highlighted: bool,
    pub pos0: String,
    pub pos1: Option<String>,
    pub page: String,
}

/// A book and its bookmarks as found at scan time.
///
/// `highlight` is carried through untouched; the reconciler never reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub title: String,
    pub authors: String,
    /// Local index (as found in the sidecar) to bookmark
    pub bookmarks: BTreeMap<String, Bookmark>,
    /// Reading progress as a percentage (0..=100)
    pub percent_finished: f64,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub highlight: serde_json::Value,
}

impl Book {
    /// Key used to collapse duplicate sidecars of the same book
    pub fn full_title(&self) -> String {
        format!("{} - {}", self.title, self.authors)
    }
}

/// Books keyed by [`Book::full_title`].
pub type Books = BTreeMap<String, Book>;
