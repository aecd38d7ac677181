//! KOReader metadata source
//!
//! Walks a KOReader mount point for `metadata.<ext>.lua` sidecar files and
//! turns each one into a [`Book`] with its bookmarks.
//! Supports:
//! - Lua table decoding through an embedded interpreter
//! - Skipping books that carry no highlights yet
//! - Last-scanned-wins on duplicate `title - authors` keys

mod lua;
mod models;
mod scan;

pub use lua::decode_metadata;
pub use models::*;
pub use scan::*;
