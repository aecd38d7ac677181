use anyhow::{Context, Result};

use koreader_sync_lib::commands;
use koreader_sync_lib::edit::{EditDetector, EditOutcome};

use crate::app::App;
use crate::render::terminal::{notice, success};

pub fn set_edited(app: &App, note: &str, edited: bool, use_color: bool) -> Result<()> {
    let path = app.note_path(note)?;
    let changed = commands::set_edited(&app.vault, &path, edited)
        .with_context(|| format!("Failed to update {}", path))?;
    let state = if edited { "edited" } else { "not edited" };
    if changed {
        success(&format!("{} marked as {}", path, state), use_color);
    } else {
        notice(&format!("{} is already {}", path, state), use_color);
    }
    Ok(())
}

pub fn set_keep_in_sync(app: &App, note: &str, keep_in_sync: bool, use_color: bool) -> Result<()> {
    let path = app.note_path(note)?;
    let changed = commands::set_keep_in_sync(&app.vault, &path, keep_in_sync)
        .with_context(|| format!("Failed to update {}", path))?;
    let state = if keep_in_sync { "enabled" } else { "disabled" };
    if changed {
        success(&format!("Sync {} for {}", state, path), use_color);
    } else {
        notice(&format!("Sync already {} for {}", state, path), use_color);
    }
    Ok(())
}

pub fn reset_imported(app: &mut App, use_color: bool) -> Result<()> {
    let mut imported = app.load_imported()?;
    let dropped = commands::reset_imported(&mut app.settings, &mut imported)?;
    app.save_imported(&imported)?;
    app.save_settings()?;
    success(&format!("Forgot {} imported highlight(s)", dropped), use_color);
    Ok(())
}

pub fn check(app: &App, note: &str, use_color: bool) -> Result<()> {
    let path = app.note_path(note)?;
    match EditDetector::new(&app.vault, &app.settings).on_file_changed(&path) {
        Ok(EditOutcome::NotManaged) => notice(&format!("{} is not a highlight note", path), use_color),
        Ok(EditOutcome::Unchanged) => println!("{}: no new edits", path),
        Ok(EditOutcome::Updated { text }) => success(&format!("{}: captured \"{}\"", path, text), use_color),
        Err(e) => {
            log::error!("Edit detection failed for {}: {}", path, e);
            return Err(e).with_context(|| format!("Edit detection failed for {}", path));
        }
    }
    Ok(())
}
