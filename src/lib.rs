//! Import KOReader highlights into a markdown vault and keep them in sync.
//!
//! A sync pass scans the device's `metadata.*.lua` sidecars, fingerprints
//! every bookmark and reconciles the result against notes already in the
//! vault. Edits made to generated notes are captured back into their front
//! matter so later passes leave them alone.

pub mod commands;
pub mod config;
pub mod edit;
pub mod identity;
pub mod metadata;
pub mod note;
pub mod reconcile;
pub mod state;
pub mod template;
pub mod title;
pub mod vault;
pub mod watcher;

pub use config::Settings;
pub use edit::{EditDetectionError, EditDetector, EditOutcome};
pub use metadata::{Book, Bookmark, Books, MetadataSource};
pub use reconcile::{run_sync, Reconciler, SyncReport};
pub use state::ImportedSet;
pub use vault::{FsVault, Vault};
