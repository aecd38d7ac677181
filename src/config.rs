//! Importer settings, stored as TOML

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::title::TitleOptions;
use crate::vault::{join_path, normalize_path};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config directory not found")]
    ConfigDirNotFound,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Where the KOReader device (or a copy of it) is mounted
    pub koreader_base_path: PathBuf,
    /// Root of the note vault
    pub vault_path: PathBuf,
    /// Vault folder receiving the notes, `/` for the vault root
    pub note_folder: String,
    /// Default `keep_in_sync` for newly created notes
    pub keep_in_sync: bool,
    /// Put each book's notes in a folder named after the book
    pub folder_per_book: bool,
    pub custom_template: bool,
    /// Vault-relative path of the note template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_path: Option<String>,
    pub custom_book_template: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book_template_path: Option<String>,
    /// Generate a summary note per book
    pub create_book_note: bool,
    /// Allow `reset-imported`; switched off again after a reset
    pub enable_reset_imported_notes: bool,
    // Tables last so the TOML output stays valid
    pub note_title_options: TitleOptions,
    pub book_title_options: TitleOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            koreader_base_path: PathBuf::from("/media/user/KOBOeReader"),
            vault_path: PathBuf::from("."),
            note_folder: "/".to_string(),
            keep_in_sync: false,
            folder_per_book: false,
            custom_template: false,
            template_path: None,
            custom_book_template: false,
            book_template_path: None,
            create_book_note: false,
            enable_reset_imported_notes: false,
            note_title_options: TitleOptions {
                max_words: Some(5),
                max_length: Some(25),
                ..Default::default()
            },
            book_title_options: TitleOptions {
                max_words: Some(5),
                max_length: Some(25),
                prefix: Some("(book) ".to_string()),
                ..Default::default()
            },
        }
    }
}

impl Settings {
    /// Default location: `<config_dir>/koreader-sync/config.toml`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|p| p.join("koreader-sync").join("config.toml"))
            .ok_or(ConfigError::ConfigDirNotFound)
    }

    /// Load settings, falling back to defaults when the file does not exist.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let rendered = toml::to_string_pretty(self)?;
        fs::write(path, rendered)?;
        Ok(())
    }

    /// Vault folder holding the notes of a book
    pub fn book_folder(&self, managed_book_title: &str) -> String {
        book_folder(&self.note_folder, self.folder_per_book, managed_book_title)
    }
}

/// `note_folder`, or `note_folder/<managed book title>` with one folder per book
pub fn book_folder(note_folder: &str, folder_per_book: bool, managed_book_title: &str) -> String {
    if folder_per_book {
        join_path(note_folder, managed_book_title)
    } else {
        normalize_path(note_folder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_from_missing_file_returns_defaults() {
        let temp = TempDir::new().unwrap();
        let settings = Settings::load_from(temp.path().join("config.toml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.note_title_options.max_words, Some(5));
        assert_eq!(settings.book_title_options.prefix.as_deref(), Some("(book) "));
    }

    #[test]
    fn load_from_partial_toml_fills_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "note_folder = \"Highlights\"\nkeep_in_sync = true\n\n[note_title_options]\nmax_words = 3\n",
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.note_folder, "Highlights");
        assert!(settings.keep_in_sync);
        assert_eq!(settings.note_title_options.max_words, Some(3));
        assert_eq!(settings.note_title_options.max_length, None);
        assert!(!settings.folder_per_book);
    }

    #[test]
    fn load_from_invalid_toml_returns_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "keep_in_sync = [").unwrap();
        assert!(matches!(Settings::load_from(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn save_and_reload_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        let settings = Settings {
            folder_per_book: true,
            custom_template: true,
            template_path: Some("templates/note.md".to_string()),
            ..Default::default()
        };
        settings.save_to(&path).unwrap();

        assert_eq!(Settings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn book_folder_layout() {
        let mut settings = Settings {
            note_folder: "/Highlights/".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.book_folder("Foo-Bar"), "Highlights");
        settings.folder_per_book = true;
        assert_eq!(settings.book_folder("Foo-Bar"), "Highlights/Foo-Bar");
    }
}
