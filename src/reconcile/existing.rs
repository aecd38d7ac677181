use std::collections::HashMap;

use crate::note::NoteFile;
use crate::vault::{Vault, VaultError};

/// Sync-relevant state of a note already in the vault
#[derive(Debug, Clone, PartialEq)]
pub struct ExistingNote {
    pub path: String,
    pub keep_in_sync: bool,
    pub yet_to_be_edited: bool,
}

/// Notes carrying an importer header, by `uniqueId`
pub type ExistingNotes = HashMap<String, ExistingNote>;

/// Index every note that carries a non-empty `uniqueId`.
///
/// Notes whose front matter cannot be read are skipped with a warning.
pub fn collect_existing_notes(vault: &dyn Vault) -> Result<ExistingNotes, VaultError> {
    let mut notes = ExistingNotes::new();

    for path in vault.list_markdown_files()? {
        let content = match vault.read(&path) {
            Ok(content) => content,
            Err(e) => {
                log::warn!("Skipping unreadable note {}: {}", path, e);
                continue;
            }
        };

        let header = match NoteFile::parse(&content).and_then(|note| note.sync_header()) {
            Ok(Some(header)) => header,
            Ok(None) => continue,
            Err(e) => {
                log::warn!("Skipping {} with invalid front matter: {}", path, e);
                continue;
            }
        };

        if header.unique_id().is_empty() {
            continue;
        }

        let note = ExistingNote {
            path: path.clone(),
            keep_in_sync: header.keep_in_sync(),
            yet_to_be_edited: header.yet_to_be_edited(),
        };
        if let Some(previous) = notes.insert(header.unique_id().to_string(), note) {
            log::warn!(
                "Notes {} and {} share the id {}, using the latter",
                previous.path,
                path,
                header.unique_id()
            );
        }
    }

    log::debug!("Found {} existing note(s)", notes.len());
    Ok(notes)
}
