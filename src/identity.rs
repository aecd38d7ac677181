//! Stable note identities
//!
//! A highlight is identified by its book and its position in the document,
//! never by its text: KOReader lets the reader edit the note text and the
//! timestamp moves with it, but the positions stay put.

/// Stand-in for a missing end position. Identifiers already stored in
/// existing vaults were computed with this literal.
const MISSING_POSITION: &str = "undefined";

/// Fingerprint of a single highlight.
pub fn fingerprint(title: &str, authors: &str, pos0: &str, pos1: Option<&str>) -> String {
    let key = format!(
        "{} - {} - {} - {}",
        title,
        authors,
        pos0,
        pos1.unwrap_or(MISSING_POSITION)
    );
    format!("{:x}", md5::compute(key.as_bytes()))
}

/// Fingerprint of a book-summary note.
pub fn book_fingerprint(title: &str, authors: &str) -> String {
    // The trailing brace is part of the identifier format found in existing vaults
    let key = format!("{} - {}}}", title, authors);
    format!("{:x}", md5::compute(key.as_bytes()))
}

/// Hex digest of a rendered note body.
pub fn body_hash(body: &str) -> String {
    format!("{:x}", md5::compute(body.as_bytes()))
}
