//! Reconciliation of scanned highlights against the vault
//!
//! One sync pass walks every book, then every bookmark, strictly in order,
//! and decides per bookmark whether to create, update or leave its note.
//! Failures while writing one note are recorded and do not stop the pass.

mod existing;

pub use existing::{collect_existing_notes, ExistingNote, ExistingNotes};

use serde::Serialize;
use thiserror::Error;

use crate::config::{book_folder, Settings};
use crate::identity::fingerprint;
use crate::metadata::{Book, Books, MetadataSource, ScanError};
use crate::note::{with_trailing_newline, FrontMatterError, NoteFile, NoteRenderer, NoteRequest, SyncHeader};
use crate::state::ImportedSet;
use crate::template::RenderError;
use crate::vault::{Vault, VaultError};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Metadata scan failed: {0}")]
    Scan(#[from] ScanError),

    #[error("Template error: {0}")]
    Render(#[from] RenderError),

    #[error("Vault error: {0}")]
    Vault(#[from] VaultError),
}

/// Failure of a single note inside a sync pass
#[derive(Error, Debug)]
pub enum NoteError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    FrontMatter(#[from] FrontMatterError),
}

/// Where a bookmark stands before this pass touches it
#[derive(Debug, Clone, PartialEq)]
pub enum NoteState {
    /// Never imported and no note carries its fingerprint
    Unseen,
    /// A note carries the fingerprint but the imported set does not
    Untracked,
    /// Imported before, note since deleted by the user
    SeenButDeleted,
    /// Note exists but is not opted into sync, or awaits its first edit
    ExistsAndLocked(ExistingNote),
    /// Note exists, opted into sync and edited since generation
    ExistsAndSyncable(ExistingNote),
}

/// Classify a fingerprint
pub fn classify(unique_id: &str, imported: &ImportedSet, existing: &ExistingNotes) -> NoteState {
    match (imported.contains(unique_id), existing.get(unique_id)) {
        (false, None) => NoteState::Unseen,
        (false, Some(_)) => NoteState::Untracked,
        (true, None) => NoteState::SeenButDeleted,
        (true, Some(note)) if note.keep_in_sync && !note.yet_to_be_edited => {
            NoteState::ExistsAndSyncable(note.clone())
        }
        (true, Some(note)) => NoteState::ExistsAndLocked(note.clone()),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncFailure {
    pub book: String,
    pub unique_id: String,
    pub message: String,
}

/// What a sync pass did
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub books: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub adopted: usize,
    pub skipped_deleted: usize,
    pub skipped_locked: usize,
    pub book_notes_created: usize,
    pub book_notes_updated: usize,
    pub failed: usize,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    /// Number of files written to the vault
    pub fn writes(&self) -> usize {
        self.created + self.updated + self.book_notes_created + self.book_notes_updated
    }

    fn record_failure(&mut self, book: &Book, unique_id: &str, error: &dyn std::fmt::Display) {
        log::warn!("Failed to sync {} ({}): {}", book.full_title(), unique_id, error);
        self.failed += 1;
        self.failures.push(SyncFailure {
            book: book.full_title(),
            unique_id: unique_id.to_string(),
            message: error.to_string(),
        });
    }
}

/// Layout switches the reconciler needs from the settings
#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    pub note_folder: String,
    pub folder_per_book: bool,
    pub create_book_note: bool,
    /// Default `keep_in_sync` for new book-summary notes
    pub keep_in_sync: bool,
}

impl From<&Settings> for ReconcileOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            note_folder: settings.note_folder.clone(),
            folder_per_book: settings.folder_per_book,
            create_book_note: settings.create_book_note,
            keep_in_sync: settings.keep_in_sync,
        }
    }
}

pub struct Reconciler<'a> {
    vault: &'a dyn Vault,
    renderer: &'a NoteRenderer,
    options: ReconcileOptions,
}

impl<'a> Reconciler<'a> {
    pub fn new(vault: &'a dyn Vault, renderer: &'a NoteRenderer, options: ReconcileOptions) -> Self {
        Self {
            vault,
            renderer,
            options,
        }
    }

    /// Reconcile all books with the vault.
    ///
    /// `imported` gains the fingerprint of every note created or adopted;
    /// the caller persists it afterwards.
    pub fn sync(&self, books: &Books, imported: &mut ImportedSet) -> Result<SyncReport, SyncError> {
        let mut existing = collect_existing_notes(self.vault)?;
        let mut report = SyncReport::default();

        for book in books.values() {
            report.books += 1;
            self.sync_book(book, imported, &mut existing, &mut report);
        }

        log::info!(
            "Sync finished: {} created, {} updated, {} unchanged, {} failed",
            report.created,
            report.updated,
            report.unchanged,
            report.failed
        );
        Ok(report)
    }

    fn sync_book(
        &self,
        book: &Book,
        imported: &mut ImportedSet,
        existing: &mut ExistingNotes,
        report: &mut SyncReport,
    ) {
        let managed_book_title = self.renderer.managed_book_title(&book.title, &book.authors);
        let folder = book_folder(&self.options.note_folder, self.options.folder_per_book, &managed_book_title);

        if self.options.folder_per_book && !self.vault.exists(&folder) {
            if let Err(e) = self.vault.create_folder(&folder) {
                report.record_failure(book, "", &e);
            }
        }

        if self.options.create_book_note {
            if let Err(e) = self.sync_book_note(&folder, book, &managed_book_title, report) {
                report.record_failure(book, "", &e);
            }
        }

        for bookmark in book.bookmarks.values() {
            let unique_id = fingerprint(&book.title, &book.authors, &bookmark.pos0, bookmark.pos1.as_deref());
            let state = classify(&unique_id, imported, existing);
            log::debug!("{} {:?}", unique_id, state);

            let request = NoteRequest {
                folder: &folder,
                unique_id: &unique_id,
                bookmark,
                title: &book.title,
                authors: &book.authors,
                managed_book_title: &managed_book_title,
                keep_in_sync: false,
            };

            match state {
                NoteState::Unseen => match self.create_note(&request) {
                    Ok(note) => {
                        imported.insert(unique_id.clone());
                        existing.insert(unique_id, note);
                        report.created += 1;
                    }
                    Err(e) => report.record_failure(book, &unique_id, &e),
                },
                NoteState::Untracked => {
                    imported.insert(unique_id);
                    report.adopted += 1;
                }
                NoteState::SeenButDeleted => report.skipped_deleted += 1,
                NoteState::ExistsAndLocked(_) => report.skipped_locked += 1,
                NoteState::ExistsAndSyncable(note) => {
                    let request = NoteRequest {
                        keep_in_sync: note.keep_in_sync,
                        ..request
                    };
                    match self.update_note(&note, &request) {
                        Ok(true) => {
                            if let Some(entry) = existing.get_mut(&unique_id) {
                                entry.yet_to_be_edited = true;
                            }
                            report.updated += 1;
                        }
                        Ok(false) => report.unchanged += 1,
                        Err(e) => report.record_failure(book, &unique_id, &e),
                    }
                }
            }
        }
    }

    fn create_note(&self, request: &NoteRequest<'_>) -> Result<ExistingNote, NoteError> {
        let mut rendered = self.renderer.render_note(request)?;
        rendered.path = self.free_path(&rendered.path);

        let markdown = rendered.to_note_file()?.to_markdown()?;
        self.vault.create(&rendered.path, &markdown)?;
        log::info!("Created {}", rendered.path);

        Ok(ExistingNote {
            path: rendered.path,
            keep_in_sync: rendered.header.metadata.keep_in_sync,
            yet_to_be_edited: rendered.header.metadata.yet_to_be_edited,
        })
    }

    /// Overwrite a syncable note. Returns `false` when nothing changed.
    fn update_note(&self, note: &ExistingNote, request: &NoteRequest<'_>) -> Result<bool, NoteError> {
        let mut rendered = self.renderer.render_note(request)?;
        let mut live = self.vault.read_note(&note.path)?;

        let live_header = match live.sync_header()? {
            Some(SyncHeader::Highlight(header)) => Some(header),
            _ => None,
        };
        if live.body == with_trailing_newline(&rendered.body)
            && live_header.as_ref().map(|h| &h.data) == Some(&rendered.header.data)
        {
            return Ok(false);
        }

        if let Some(header) = live_header {
            rendered.header.extra = header.extra;
        }
        live.body = rendered.body.clone();
        live.set_sync_header(&SyncHeader::Highlight(rendered.header))?;
        self.vault.modify(&note.path, &live.to_markdown()?)?;
        log::info!("Updated {}", note.path);
        Ok(true)
    }

    /// Create the book-summary note, or refresh it while it is still
    /// opted into sync and untouched.
    fn sync_book_note(
        &self,
        folder: &str,
        book: &Book,
        managed_book_title: &str,
        report: &mut SyncReport,
    ) -> Result<(), NoteError> {
        let path = format!("{}.md", crate::vault::join_path(folder, managed_book_title));

        if !self.vault.exists(&path) {
            let rendered =
                self.renderer
                    .render_book_note(folder, book, managed_book_title, self.options.keep_in_sync)?;
            self.vault.create(&rendered.path, &rendered.to_note_file()?.to_markdown()?)?;
            log::info!("Created book note {}", rendered.path);
            report.book_notes_created += 1;
            return Ok(());
        }

        let content = self.vault.read(&path)?;
        let mut live = NoteFile::parse(&content)?;
        let extra = match live.sync_header()? {
            Some(SyncHeader::BookSummary(header)) if header.metadata.keep_in_sync && header.metadata.yet_to_be_edited => {
                header.extra
            }
            _ => return Ok(()),
        };

        let mut rendered = self
            .renderer
            .render_book_note(folder, book, managed_book_title, true)?;
        rendered.header.extra = extra;
        live.body = rendered.body;
        live.set_sync_header(&SyncHeader::BookSummary(rendered.header))?;
        let markdown = live.to_markdown()?;
        if markdown == content {
            return Ok(());
        }

        self.vault.modify(&path, &markdown)?;
        log::info!("Updated book note {}", path);
        report.book_notes_updated += 1;
        Ok(())
    }

    /// `path` itself, or `path` with " 1", " 2", ... before the extension
    fn free_path(&self, path: &str) -> String {
        if !self.vault.exists(path) {
            return path.to_string();
        }
        let stem = path.strip_suffix(".md").unwrap_or(path);
        let mut n = 1;
        loop {
            let candidate = format!("{} {}.md", stem, n);
            if !self.vault.exists(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Scan the device and reconcile the vault with it.
///
/// The scan completes before anything is written: a scan failure leaves the
/// vault untouched.
pub fn run_sync(settings: &Settings, vault: &dyn Vault, imported: &mut ImportedSet) -> Result<SyncReport, SyncError> {
    let renderer = NoteRenderer::from_settings(settings, vault)?;
    let books = MetadataSource::new(&settings.koreader_base_path).scan()?;
    Reconciler::new(vault, &renderer, ReconcileOptions::from(settings)).sync(&books, imported)
}
