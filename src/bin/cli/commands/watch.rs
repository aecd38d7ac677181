use std::path::Path;

use anyhow::{Context, Result};

use koreader_sync_lib::edit::{EditDetector, EditOutcome};
use koreader_sync_lib::vault::{FsVault, Vault};
use koreader_sync_lib::watcher::{next_batch, watch_vault, DEBOUNCE_WINDOW};

use crate::app::App;
use crate::render::terminal::{notice, success};

pub fn run(app: &App, use_color: bool) -> Result<()> {
    let (_watcher, rx) = watch_vault(app.vault.root())
        .with_context(|| format!("Failed to watch {}", app.vault.root().display()))?;
    let detector = EditDetector::new(&app.vault, &app.settings);
    println!("Watching {} (Ctrl-C to stop)", app.vault.root().display());

    while let Some(paths) = next_batch(&rx, DEBOUNCE_WINDOW) {
        for path in paths {
            let Some(relative) = vault_note(&app.vault, &path) else {
                continue;
            };
            match detector.on_file_changed(&relative) {
                Ok(EditOutcome::Updated { .. }) => success(&format!("Captured edit in {}", relative), use_color),
                Ok(_) => {}
                Err(e) => {
                    log::error!("Edit detection failed for {}: {}", relative, e);
                    notice(&format!("{}: {}", relative, e), use_color);
                }
            }
        }
    }

    Ok(())
}

/// Vault path of a changed file that still exists inside the vault
fn vault_note(vault: &FsVault, path: &Path) -> Option<String> {
    let relative = vault.relative_path(path)?;
    vault.exists(&relative).then_some(relative)
}
