//! Fingerprints of highlights that were already imported once
//!
//! A fingerprint in this set whose note is missing from the vault was deleted
//! on purpose and is not recreated.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Data directory not found")]
    DataDirNotFound,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImportedSet {
    fingerprints: BTreeSet<String>,
}

impl ImportedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default location: `<data_local_dir>/koreader-sync/imported.json`
    pub fn default_path() -> Result<PathBuf, StateError> {
        dirs::data_local_dir()
            .map(|p| p.join("koreader-sync").join("imported.json"))
            .ok_or(StateError::DataDirNotFound)
    }

    /// Load the set; a missing file is an empty set.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, StateError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), StateError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn contains(&self, fingerprint: &str) -> bool {
        self.fingerprints.contains(fingerprint)
    }

    /// Returns `true` if the fingerprint was not yet present
    pub fn insert(&mut self, fingerprint: impl Into<String>) -> bool {
        self.fingerprints.insert(fingerprint.into())
    }

    pub fn clear(&mut self) {
        self.fingerprints.clear();
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.fingerprints.iter().map(String::as_str)
    }
}
