//! Capture the reader's edits back into a note's header
//!
//! The detector renders a shadow of the note from its stored header with a
//! sentinel in place of the free text, diffs it against the live body and
//! reads the reader's text off the lines the sentinel replaced. This only
//! works while edits stay inside the free-text region of the template.

mod diff;

pub use diff::{diff_blocks, sentinel_text, DiffBlock, SENTINEL};

use thiserror::Error;

use crate::config::Settings;
use crate::metadata::Bookmark;
use crate::note::{FrontMatterError, HighlightHeader, NoteFile, NoteRenderer, NoteRequest, SyncHeader};
use crate::template::RenderError;
use crate::vault::{Vault, VaultError};

#[derive(Error, Debug)]
pub enum EditDetectionError {
    #[error("No placeholder found: the note's structure no longer matches its template")]
    NoPlaceholderFound,

    #[error("No placeholder note created: {0}")]
    NoPlaceholderNoteCreated(#[source] RenderError),

    #[error("Vault error: {0}")]
    Vault(#[from] VaultError),

    #[error("Front matter error: {0}")]
    FrontMatter(#[from] FrontMatterError),
}

/// The reader's free text in `live`, located by diffing against the shadow
/// note `shadow_factory` renders with the sentinel as free text.
pub fn extract_user_edited_text<F>(live: &str, shadow_factory: F) -> Result<String, EditDetectionError>
where
    F: FnOnce() -> Result<String, RenderError>,
{
    let shadow = shadow_factory().map_err(EditDetectionError::NoPlaceholderNoteCreated)?;
    sentinel_text(live, &shadow).ok_or(EditDetectionError::NoPlaceholderFound)
}

/// What handling one change event did
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    /// No highlight header, nothing to do
    NotManaged,
    /// Extracted text matches the header already
    Unchanged,
    /// Header now carries the edited text
    Updated { text: String },
}

pub struct EditDetector<'a> {
    vault: &'a dyn Vault,
    settings: &'a Settings,
}

impl<'a> EditDetector<'a> {
    pub fn new(vault: &'a dyn Vault, settings: &'a Settings) -> Self {
        Self { vault, settings }
    }

    /// Handle a change notification for the note at `path`.
    pub fn on_file_changed(&self, path: &str) -> Result<EditOutcome, EditDetectionError> {
        let content = self.vault.read(path)?;
        let mut note = match NoteFile::parse(&content) {
            Ok(note) => note,
            Err(e) => {
                log::debug!("Ignoring {}: {}", path, e);
                return Ok(EditOutcome::NotManaged);
            }
        };
        let mut header = match note.sync_header() {
            Ok(Some(SyncHeader::Highlight(header))) => header,
            Ok(_) => return Ok(EditOutcome::NotManaged),
            Err(e) => {
                log::debug!("Ignoring {}: {}", path, e);
                return Ok(EditOutcome::NotManaged);
            }
        };

        let text = extract_user_edited_text(&note.body, || self.render_shadow(&header))?;

        if text == header.data.text {
            log::debug!("No edit in {}", path);
            return Ok(EditOutcome::Unchanged);
        }

        header.data.text = text.clone();
        header.metadata.yet_to_be_edited = false;
        note.set_sync_header(&SyncHeader::Highlight(header))?;
        self.vault.modify(path, &note.to_markdown()?)?;
        log::info!("Captured edit in {}", path);

        Ok(EditOutcome::Updated { text })
    }

    /// Body the note would have if its free text were the sentinel
    fn render_shadow(&self, header: &HighlightHeader) -> Result<String, RenderError> {
        let renderer = NoteRenderer::from_settings(self.settings, self.vault)?;
        let data = &header.data;
        let bookmark = shadow_bookmark(header);
        let folder = self.settings.book_folder(&header.metadata.managed_book_title);

        let request = NoteRequest {
            folder: &folder,
            unique_id: &header.unique_id,
            bookmark: &bookmark,
            title: &data.title,
            authors: &data.authors,
            managed_book_title: &header.metadata.managed_book_title,
            keep_in_sync: header.metadata.keep_in_sync,
        };
        Ok(renderer.render_note(&request)?.body)
    }
}

/// Bookmark rebuilt from stored data, free text replaced by the sentinel
fn shadow_bookmark(header: &HighlightHeader) -> Bookmark {
    let data = &header.data;
    Bookmark {
        chapter: data.chapter.clone(),
        text: Some(format!(
            "Pagina {} {} @ {} {}",
            data.page, data.highlight, data.datetime, SENTINEL
        )),
        datetime: data.datetime.clone(),
        notes: data.highlight.clone(),
        highlighted: true,
        pos0: "pos0".to_string(),
        pos1: Some("pos1".to_string()),
        page: data.page.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::identity::fingerprint;
    use crate::note::{HighlightData, HighlightMetadata};
    use crate::title::TitleOptions;
    use crate::vault::FsVault;

    const NOTE_PATH: &str = "Highlights/my thoughts.md";

    fn settings() -> Settings {
        Settings {
            note_folder: "Highlights".to_string(),
            ..Default::default()
        }
    }

    /// Write a note exactly as a sync would
    fn generated_note(vault: &FsVault, settings: &Settings) {
        let renderer = NoteRenderer::new(TitleOptions::default(), TitleOptions::default(), false);
        let bookmark = Bookmark {
            chapter: "Ch1".to_string(),
            text: Some("Pagina 5 hi @ 2022-01-01 00:00:00 my thoughts".to_string()),
            datetime: "2022-01-01 00:00:00".to_string(),
            notes: "hi".to_string(),
            highlighted: true,
            pos0: "p0".to_string(),
            pos1: Some("p1".to_string()),
            page: "5".to_string(),
        };
        let unique_id = fingerprint("Foo", "Bar", "p0", Some("p1"));
        let managed = renderer.managed_book_title("Foo", "Bar");
        let folder = settings.book_folder(&managed);
        let rendered = renderer
            .render_note(&NoteRequest {
                folder: &folder,
                unique_id: &unique_id,
                bookmark: &bookmark,
                title: "Foo",
                authors: "Bar",
                managed_book_title: &managed,
                keep_in_sync: false,
            })
            .unwrap();
        assert_eq!(rendered.path, NOTE_PATH);
        vault
            .create(&rendered.path, &rendered.to_note_file().unwrap().to_markdown().unwrap())
            .unwrap();
    }

    fn edit_body(vault: &FsVault, from: &str, to: &str) {
        let mut note = vault.read_note(NOTE_PATH).unwrap();
        note.body = note.body.replace(from, to);
        vault.modify(NOTE_PATH, &note.to_markdown().unwrap()).unwrap();
    }

    fn header(vault: &FsVault) -> HighlightHeader {
        match vault.read_note(NOTE_PATH).unwrap().sync_header().unwrap() {
            Some(SyncHeader::Highlight(header)) => header,
            other => panic!("expected highlight header, got {:?}", other),
        }
    }

    #[test]
    fn test_untouched_note_is_unchanged() {
        let temp = TempDir::new().unwrap();
        let vault = FsVault::new(temp.path());
        let settings = settings();
        generated_note(&vault, &settings);
        let before = vault.read(NOTE_PATH).unwrap();

        let outcome = EditDetector::new(&vault, &settings).on_file_changed(NOTE_PATH).unwrap();
        assert_eq!(outcome, EditOutcome::Unchanged);
        assert_eq!(vault.read(NOTE_PATH).unwrap(), before);
    }

    #[test]
    fn test_edit_is_captured() {
        let temp = TempDir::new().unwrap();
        let vault = FsVault::new(temp.path());
        let settings = settings();
        generated_note(&vault, &settings);
        edit_body(&vault, "my thoughts", "revised thoughts");
        let body_before = vault.read_note(NOTE_PATH).unwrap().body;

        let outcome = EditDetector::new(&vault, &settings).on_file_changed(NOTE_PATH).unwrap();
        assert_eq!(
            outcome,
            EditOutcome::Updated {
                text: "revised thoughts".to_string()
            }
        );

        let header = header(&vault);
        assert_eq!(header.data.text, "revised thoughts");
        assert!(!header.metadata.yet_to_be_edited);
        assert_eq!(vault.read_note(NOTE_PATH).unwrap().body, body_before);

        // Saving again without changes writes nothing
        let outcome = EditDetector::new(&vault, &settings).on_file_changed(NOTE_PATH).unwrap();
        assert_eq!(outcome, EditOutcome::Unchanged);
    }

    #[test]
    fn test_multi_line_edit() {
        let temp = TempDir::new().unwrap();
        let vault = FsVault::new(temp.path());
        let settings = settings();
        generated_note(&vault, &settings);
        edit_body(&vault, "my thoughts", "line one\nline two");

        EditDetector::new(&vault, &settings).on_file_changed(NOTE_PATH).unwrap();
        assert_eq!(header(&vault).data.text, "line one\nline two");
    }

    #[test]
    fn test_structural_edit_reports_no_placeholder() {
        let temp = TempDir::new().unwrap();
        let vault = FsVault::new(temp.path());
        let settings = settings();
        generated_note(&vault, &settings);
        edit_body(&vault, "**==hi==**\n\nmy thoughts", "**==hi==**\nmy thoughts");
        let before = vault.read(NOTE_PATH).unwrap();

        let result = EditDetector::new(&vault, &settings).on_file_changed(NOTE_PATH);
        assert!(matches!(result, Err(EditDetectionError::NoPlaceholderFound)));
        assert_eq!(vault.read(NOTE_PATH).unwrap(), before);
    }

    #[test]
    fn test_broken_template_reports_no_placeholder_note() {
        let temp = TempDir::new().unwrap();
        let vault = FsVault::new(temp.path());
        let mut settings = settings();
        generated_note(&vault, &settings);
        vault.create("template.md", "{{text}} {{nope}}").unwrap();
        settings.custom_template = true;
        settings.template_path = Some("template.md".to_string());

        let result = EditDetector::new(&vault, &settings).on_file_changed(NOTE_PATH);
        assert!(matches!(
            result,
            Err(EditDetectionError::NoPlaceholderNoteCreated(RenderError::UnknownVariable(_)))
        ));
    }

    #[test]
    fn test_unmanaged_files_are_ignored() {
        let temp = TempDir::new().unwrap();
        let vault = FsVault::new(temp.path());
        let settings = settings();
        vault.create("plain.md", "just text").unwrap();
        vault.create("foreign.md", "---\ntags: [a]\n---\nbody").unwrap();
        vault.create("broken.md", "---\nkey: [x\n---\nbody").unwrap();

        let detector = EditDetector::new(&vault, &settings);
        for path in ["plain.md", "foreign.md", "broken.md"] {
            assert_eq!(detector.on_file_changed(path).unwrap(), EditOutcome::NotManaged);
        }
    }

    #[test]
    fn test_extract_user_edited_text_errors() {
        let failed = extract_user_edited_text("text", || Err(RenderError::UnterminatedTag(0)));
        assert!(matches!(failed, Err(EditDetectionError::NoPlaceholderNoteCreated(_))));

        let missing = extract_user_edited_text("a\nb", || Ok("a\nb".to_string()));
        assert!(matches!(missing, Err(EditDetectionError::NoPlaceholderFound)));

        let found = extract_user_edited_text("a\nmine", || Ok(format!("a\n{}", SENTINEL)));
        assert_eq!(found.unwrap(), "mine");
    }

    #[test]
    fn test_shadow_bookmark_carries_sentinel() {
        let header = HighlightHeader {
            unique_id: "id".to_string(),
            data: HighlightData {
                title: "Foo".to_string(),
                authors: "Bar".to_string(),
                chapter: "Ch1".to_string(),
                page: 12,
                highlight: "hi".to_string(),
                datetime: "2022-01-01 00:00:00".to_string(),
                text: "mine".to_string(),
            },
            metadata: HighlightMetadata::default(),
            extra: Default::default(),
        };
        let bookmark = shadow_bookmark(&header);
        assert_eq!(crate::note::free_text(&bookmark), SENTINEL);
        assert_eq!(crate::note::page_number(bookmark.text.as_deref()), 12);
    }
}
