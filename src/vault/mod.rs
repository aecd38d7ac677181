//! Note vault access
//!
//! The reconciler and the edit detector only talk to the vault through the
//! [`Vault`] trait. [`FsVault`] maps it onto a directory of markdown files.

mod fs_vault;

pub use fs_vault::FsVault;

use thiserror::Error;

use crate::note::{FrontMatterError, NoteFile};

#[derive(Error, Debug)]
pub enum VaultError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to walk vault: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid vault path: {0}")]
    InvalidPath(String),

    #[error("Invalid front matter in {path}: {source}")]
    FrontMatter {
        path: String,
        #[source]
        source: FrontMatterError,
    },
}

pub type Result<T> = std::result::Result<T, VaultError>;

/// File operations the importer needs from the host vault.
///
/// Paths are vault-relative and `/`-separated (see [`normalize_path`]).
pub trait Vault {
    /// Every markdown note in the vault
    fn list_markdown_files(&self) -> Result<Vec<String>>;

    fn exists(&self, path: &str) -> bool;

    fn read(&self, path: &str) -> Result<String>;

    /// Create a new file, failing if one is already there
    fn create(&self, path: &str, content: &str) -> Result<()>;

    /// Replace the content of an existing file
    fn modify(&self, path: &str, content: &str) -> Result<()>;

    fn delete(&self, path: &str) -> Result<()>;

    fn create_folder(&self, path: &str) -> Result<()>;

    /// Parsed note, front matter included
    fn read_note(&self, path: &str) -> Result<NoteFile> {
        let content = self.read(path)?;
        NoteFile::parse(&content).map_err(|source| VaultError::FrontMatter {
            path: path.to_string(),
            source,
        })
    }
}

/// Collapse separators and strip leading/trailing slashes.
///
/// `"/"` and `""` both name the vault root and normalize to `""`.
pub fn normalize_path(path: &str) -> String {
    path.split(['/', '\\'])
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Join two vault paths and normalize the result.
pub fn join_path(base: &str, name: &str) -> String {
    normalize_path(&format!("{}/{}", base, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/"), "");
        assert_eq!(normalize_path(""), "");
        assert_eq!(normalize_path("//a///b/"), "a/b");
        assert_eq!(normalize_path("./notes\\books"), "notes/books");
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("/", "note.md"), "note.md");
        assert_eq!(join_path("Highlights/", "/Book"), "Highlights/Book");
    }
}
