use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use super::{normalize_path, Result, Vault, VaultError};

/// A vault backed by a directory on disk
pub struct FsVault {
    root: PathBuf,
}

impl FsVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a vault path, refusing anything that escapes the root
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let normalized = normalize_path(path);
        let relative = Path::new(&normalized);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(VaultError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }

    /// Vault path of an absolute file path, if it lives inside the vault
    pub fn relative_path(&self, absolute: &Path) -> Option<String> {
        let relative = absolute.strip_prefix(&self.root).ok()?;
        Some(normalize_path(&relative.to_string_lossy()))
    }

    /// Write through a temporary sibling so readers never see half a note
    fn write_atomic(&self, target: &Path, content: &str) -> Result<()> {
        let tmp = target.with_extension("md.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, target)?;
        Ok(())
    }
}

impl Vault for FsVault {
    fn list_markdown_files(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();

        let walker = WalkDir::new(&self.root).into_iter().filter_entry(|entry| {
            // Skip .obsidian, .trash and other hidden folders; notes may start with a dot
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !entry.file_name().to_string_lossy().starts_with('.')
        });

        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let is_markdown = entry
                .path()
                .extension()
                .map_or(false, |ext| ext == "md");
            if !is_markdown {
                continue;
            }
            if let Some(relative) = self.relative_path(entry.path()) {
                files.push(relative);
            }
        }

        files.sort();
        Ok(files)
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).map(|p| p.exists()).unwrap_or(false)
    }

    fn read(&self, path: &str) -> Result<String> {
        let full = self.resolve(path)?;
        if !full.is_file() {
            return Err(VaultError::NotFound(path.to_string()));
        }
        Ok(fs::read_to_string(full)?)
    }

    fn create(&self, path: &str, content: &str) -> Result<()> {
        let full = self.resolve(path)?;
        if full.exists() {
            return Err(VaultError::AlreadyExists(path.to_string()));
        }
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        self.write_atomic(&full, content)
    }

    fn modify(&self, path: &str, content: &str) -> Result<()> {
        let full = self.resolve(path)?;
        if !full.is_file() {
            return Err(VaultError::NotFound(path.to_string()));
        }
        self.write_atomic(&full, content)
    }

    fn delete(&self, path: &str) -> Result<()> {
        let full = self.resolve(path)?;
        if !full.is_file() {
            return Err(VaultError::NotFound(path.to_string()));
        }
        fs::remove_file(full)?;
        Ok(())
    }

    fn create_folder(&self, path: &str) -> Result<()> {
        let full = self.resolve(path)?;
        fs::create_dir_all(full)?;
        Ok(())
    }
}
