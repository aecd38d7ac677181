use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use koreader_sync_lib::config::Settings;
use koreader_sync_lib::state::ImportedSet;
use koreader_sync_lib::vault::{normalize_path, FsVault, Vault};

/// Shared application state for CLI commands
pub struct App {
    pub settings: Settings,
    pub config_path: PathBuf,
    pub state_path: PathBuf,
    pub vault: FsVault,
}

impl App {
    /// Load settings from `config`, or the default location
    pub fn new(config: Option<&Path>) -> Result<Self> {
        let config_path = match config {
            Some(path) => path.to_path_buf(),
            None => Settings::default_path().context("Failed to locate config directory")?,
        };
        let settings = Settings::load_from(&config_path)
            .with_context(|| format!("Failed to load settings from {}", config_path.display()))?;
        let state_path = ImportedSet::default_path().context("Failed to locate data directory")?;

        if !settings.vault_path.is_dir() {
            bail!("Vault {} is not a directory", settings.vault_path.display());
        }
        let root = settings
            .vault_path
            .canonicalize()
            .with_context(|| format!("Failed to resolve vault {}", settings.vault_path.display()))?;
        let vault = FsVault::new(root);

        Ok(Self {
            settings,
            config_path,
            state_path,
            vault,
        })
    }

    pub fn load_imported(&self) -> Result<ImportedSet> {
        ImportedSet::load_from(&self.state_path)
            .with_context(|| format!("Failed to load imported notes from {}", self.state_path.display()))
    }

    pub fn save_imported(&self, imported: &ImportedSet) -> Result<()> {
        imported
            .save_to(&self.state_path)
            .with_context(|| format!("Failed to save imported notes to {}", self.state_path.display()))
    }

    pub fn save_settings(&self) -> Result<()> {
        self.settings
            .save_to(&self.config_path)
            .with_context(|| format!("Failed to save settings to {}", self.config_path.display()))
    }

    /// Resolve a note argument to a vault-relative path.
    ///
    /// Absolute paths must lie inside the vault; a missing `.md` extension
    /// is added.
    pub fn note_path(&self, note: &str) -> Result<String> {
        let path = Path::new(note);
        let relative = if path.is_absolute() {
            let absolute = path.canonicalize().with_context(|| format!("Note '{}' not found", note))?;
            match self.vault.relative_path(&absolute) {
                Some(rel) => rel,
                None => bail!("{} is outside the vault {}", note, self.vault.root().display()),
            }
        } else {
            normalize_path(note)
        };

        let relative = if relative.ends_with(".md") {
            relative
        } else {
            format!("{}.md", relative)
        };
        if !self.vault.exists(&relative) {
            bail!("No note '{}' in the vault", relative);
        }
        Ok(relative)
    }
}
