//! Per-note commands and the imported-set reset

use thiserror::Error;

use crate::config::Settings;
use crate::note::{FrontMatterError, SyncHeader};
use crate::state::ImportedSet;
use crate::vault::{Vault, VaultError};

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("{0} is not a note created by the importer")]
    NotManaged(String),

    #[error("Resetting imported notes is disabled in the settings")]
    ResetDisabled,

    #[error("Vault error: {0}")]
    Vault(#[from] VaultError),

    #[error("Front matter error: {0}")]
    FrontMatter(#[from] FrontMatterError),
}

type CommandResult<T> = Result<T, CommandError>;

/// Rewrite the sync header of `path` through `update`.
///
/// Returns `false`, writing nothing, when `update` reports no change.
fn update_header(
    vault: &dyn Vault,
    path: &str,
    update: impl FnOnce(&mut SyncHeader) -> bool,
) -> CommandResult<bool> {
    let mut note = vault.read_note(path)?;
    let mut header = note
        .sync_header()?
        .ok_or_else(|| CommandError::NotManaged(path.to_string()))?;

    if !update(&mut header) {
        return Ok(false);
    }

    note.set_sync_header(&header)?;
    vault.modify(path, &note.to_markdown()?)?;
    Ok(true)
}

/// Mark a note as edited (`edited = true`) or back as pristine.
///
/// An edited note is never overwritten by a sync.
pub fn set_edited(vault: &dyn Vault, path: &str, edited: bool) -> CommandResult<bool> {
    let changed = update_header(vault, path, |header| {
        if header.yet_to_be_edited() == !edited {
            return false;
        }
        header.set_yet_to_be_edited(!edited);
        true
    })?;
    if changed {
        log::info!("Marked {} as {}", path, if edited { "edited" } else { "not edited" });
    }
    Ok(changed)
}

/// Opt a note in or out of future syncs
pub fn set_keep_in_sync(vault: &dyn Vault, path: &str, keep_in_sync: bool) -> CommandResult<bool> {
    let changed = update_header(vault, path, |header| {
        if header.keep_in_sync() == keep_in_sync {
            return false;
        }
        header.set_keep_in_sync(keep_in_sync);
        true
    })?;
    if changed {
        log::info!(
            "{} sync for {}",
            if keep_in_sync { "Enabled" } else { "Disabled" },
            path
        );
    }
    Ok(changed)
}

/// Forget every imported fingerprint so deleted notes come back on the next
/// sync. Allowed once per opt-in: the toggle is switched off again.
///
/// Returns how many fingerprints were dropped. The caller persists both
/// `settings` and `imported`.
pub fn reset_imported(settings: &mut Settings, imported: &mut ImportedSet) -> CommandResult<usize> {
    if !settings.enable_reset_imported_notes {
        return Err(CommandError::ResetDisabled);
    }
    let dropped = imported.len();
    imported.clear();
    settings.enable_reset_imported_notes = false;
    log::info!("Reset {} imported fingerprint(s)", dropped);
    Ok(dropped)
}
