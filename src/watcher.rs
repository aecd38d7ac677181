//! Change listener feeding note paths to the edit detector

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;

/// Quiet period that closes a batch of change events
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(300);

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Watch error: {0}")]
    Notify(#[from] notify::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Markdown files under `root` created or modified by `event`.
///
/// Temporary files from atomic writes and anything inside a hidden folder
/// of the vault are left out. Only the part of the path below `root`
/// counts, so the vault itself may live under a dot-directory.
pub fn note_paths(event: &Event, root: &Path) -> Vec<PathBuf> {
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
        return Vec::new();
    }
    event
        .paths
        .iter()
        .filter(|path| is_note(path, root))
        .cloned()
        .collect()
}

fn is_note(path: &Path, root: &Path) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return false;
    };
    if !relative.extension().is_some_and(|ext| ext == "md") {
        return false;
    }
    // Folders only: a note's own name may start with a dot
    let mut folders = relative.components();
    folders.next_back();
    !folders.any(|c| c.as_os_str().to_str().is_some_and(|s| s.starts_with('.')))
}

/// Watch the vault recursively.
///
/// The watcher must be kept alive for as long as paths should arrive.
pub fn watch_vault(root: &Path) -> Result<(RecommendedWatcher, Receiver<PathBuf>), WatchError> {
    // Event paths come back resolved, so match them against the resolved root
    let root = root.canonicalize()?;
    let watched = root.clone();
    let (tx, rx) = mpsc::channel();

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| match res {
            Ok(event) => {
                for path in note_paths(&event, &watched) {
                    let _ = tx.send(path);
                }
            }
            Err(e) => log::warn!("Watch error: {}", e),
        },
        Config::default(),
    )?;
    watcher.watch(&root, RecursiveMode::Recursive)?;
    log::info!("Watching {}", root.display());

    Ok((watcher, rx))
}

/// Block for the next change, then gather whatever else arrives until the
/// channel stays quiet for `window`. `None` once the sender is gone.
pub fn next_batch(rx: &Receiver<PathBuf>, window: Duration) -> Option<Vec<PathBuf>> {
    let mut batch = BTreeSet::new();
    batch.insert(rx.recv().ok()?);

    loop {
        match rx.recv_timeout(window) {
            Ok(path) => {
                batch.insert(path);
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    Some(batch.into_iter().collect())
}
