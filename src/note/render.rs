use serde_json::{json, Value};

use super::frontmatter::{FrontMatterError, NoteFile};
use super::header::{
    BookData, BookMetadata, BookSummaryHeader, HighlightData, HighlightHeader, HighlightMetadata,
    SyncHeader, BOOK_NOTE_CSS_CLASS,
};
use crate::config::Settings;
use crate::identity::{body_hash, book_fingerprint};
use crate::metadata::{Book, Bookmark};
use crate::template::{render, RenderError, Variables, DEFAULT_BOOK_TEMPLATE, DEFAULT_NOTE_TEMPLATE};
use crate::title::{sanitize, TitleOptions};
use crate::vault::{join_path, Vault};

/// Everything needed to render one highlight note
pub struct NoteRequest<'a> {
    /// Vault folder the note goes into
    pub folder: &'a str,
    pub unique_id: &'a str,
    pub bookmark: &'a Bookmark,
    pub title: &'a str,
    pub authors: &'a str,
    pub managed_book_title: &'a str,
    pub keep_in_sync: bool,
}

/// A rendered highlight note, ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedNote {
    /// Vault path including the `.md` extension
    pub path: String,
    pub body: String,
    pub header: HighlightHeader,
}

impl RenderedNote {
    pub fn to_note_file(&self) -> Result<NoteFile, FrontMatterError> {
        let mut note = NoteFile::new(self.body.clone());
        note.set_sync_header(&SyncHeader::Highlight(self.header.clone()))?;
        Ok(note)
    }
}

/// A rendered book-summary note
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedBookNote {
    pub path: String,
    pub body: String,
    pub header: BookSummaryHeader,
}

impl RenderedBookNote {
    pub fn to_note_file(&self) -> Result<NoteFile, FrontMatterError> {
        let mut note = NoteFile::new(self.body.clone());
        note.set("cssclass", serde_yaml::Value::String(BOOK_NOTE_CSS_CLASS.to_string()));
        note.set_sync_header(&SyncHeader::BookSummary(self.header.clone()))?;
        Ok(note)
    }
}

/// Renders notes with the active templates and title options
#[derive(Debug, Clone)]
pub struct NoteRenderer {
    note_template: String,
    book_template: String,
    note_title_options: TitleOptions,
    book_title_options: TitleOptions,
    default_keep_in_sync: bool,
}

impl NoteRenderer {
    /// Renderer with the built-in templates
    pub fn new(
        note_title_options: TitleOptions,
        book_title_options: TitleOptions,
        default_keep_in_sync: bool,
    ) -> Self {
        Self {
            note_template: DEFAULT_NOTE_TEMPLATE.to_string(),
            book_template: DEFAULT_BOOK_TEMPLATE.to_string(),
            note_title_options,
            book_title_options,
            default_keep_in_sync,
        }
    }

    /// Renderer configured from settings, reading custom templates from the vault.
    ///
    /// A custom template that is switched on but missing from the vault falls
    /// back to the built-in one.
    pub fn from_settings(settings: &Settings, vault: &dyn Vault) -> Result<Self, RenderError> {
        let mut renderer = Self::new(
            settings.note_title_options.clone(),
            settings.book_title_options.clone(),
            settings.keep_in_sync,
        );
        if settings.custom_template {
            if let Some(template) = load_template(vault, settings.template_path.as_deref())? {
                renderer.note_template = template;
            }
        }
        if settings.custom_book_template {
            if let Some(template) = load_template(vault, settings.book_template_path.as_deref())? {
                renderer.book_template = template;
            }
        }
        Ok(renderer)
    }

    pub fn with_note_template(mut self, template: impl Into<String>) -> Self {
        self.note_template = template.into();
        self
    }

    pub fn with_book_template(mut self, template: impl Into<String>) -> Self {
        self.book_template = template.into();
        self
    }

    /// Grouping key of a book: its sanitized title followed by the authors
    pub fn managed_book_title(&self, title: &str, authors: &str) -> String {
        format!("{}-{}", sanitize(title, &self.book_title_options), authors)
    }

    /// Title (file stem) of the note for a bookmark
    pub fn note_title(&self, bookmark: &Bookmark, authors: &str) -> String {
        let free_text = free_text(bookmark);
        if free_text.is_empty() {
            format!(
                "{}-{}",
                sanitize(&bookmark.notes, &self.note_title_options),
                sanitize(authors, &self.note_title_options)
            )
        } else {
            sanitize(&free_text, &self.note_title_options)
        }
    }

    pub fn render_note(&self, request: &NoteRequest<'_>) -> Result<RenderedNote, RenderError> {
        let bookmark = request.bookmark;
        let page = page_number(bookmark.text.as_deref());
        let text = free_text(bookmark);
        let note_title = self.note_title(bookmark, request.authors);
        let path = format!("{}.md", join_path(request.folder, &note_title));
        let book_path = join_path(request.folder, request.managed_book_title);

        let variables = as_variables(json!({
            "bookPath": book_path,
            "title": request.title,
            "authors": request.authors,
            "chapter": bookmark.chapter,
            "highlight": bookmark.notes,
            "text": text,
            "datetime": bookmark.datetime,
            "page": page,
        }));
        let body = render(&self.note_template, &variables)?;

        let header = HighlightHeader {
            unique_id: request.unique_id.to_string(),
            data: HighlightData {
                title: request.title.to_string(),
                authors: request.authors.to_string(),
                chapter: bookmark.chapter.clone(),
                page,
                highlight: bookmark.notes.clone(),
                datetime: bookmark.datetime.clone(),
                text,
            },
            metadata: HighlightMetadata {
                body_hash: body_hash(&body),
                keep_in_sync: request.keep_in_sync || self.default_keep_in_sync,
                yet_to_be_edited: true,
                managed_book_title: request.managed_book_title.to_string(),
            },
            extra: Default::default(),
        };

        Ok(RenderedNote { path, body, header })
    }

    pub fn render_book_note(
        &self,
        folder: &str,
        book: &Book,
        managed_book_title: &str,
        keep_in_sync: bool,
    ) -> Result<RenderedBookNote, RenderError> {
        let header = BookSummaryHeader {
            unique_id: book_fingerprint(&book.title, &book.authors),
            data: BookData {
                title: book.title.clone(),
                authors: book.authors.clone(),
            },
            metadata: BookMetadata {
                percent_finished: book.percent_finished,
                managed_title: managed_book_title.to_string(),
                keep_in_sync,
                yet_to_be_edited: true,
            },
            extra: Default::default(),
        };

        let variables = match serde_json::to_value(SyncHeader::BookSummary(header.clone())) {
            Ok(Value::Object(map)) => map,
            _ => Variables::new(),
        };
        let body = render(&self.book_template, &variables)?;
        let path = format!("{}.md", join_path(folder, managed_book_title));

        Ok(RenderedBookNote { path, body, header })
    }
}

fn load_template(vault: &dyn Vault, path: Option<&str>) -> Result<Option<String>, RenderError> {
    let Some(path) = path.filter(|p| !p.trim().is_empty()) else {
        return Ok(None);
    };
    if !vault.exists(path) {
        log::warn!("Template {} not found, using the built-in one", path);
        return Ok(None);
    }
    vault.read(path).map(Some).map_err(|e| RenderError::TemplateRead {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

fn as_variables(value: Value) -> Variables {
    match value {
        Value::Object(map) => map,
        _ => Variables::new(),
    }
}

/// First run of digits in the bookmark text, `-1` when there is none.
/// Runs too long for an `i64` clamp to `i64::MAX`.
pub fn page_number(text: Option<&str>) -> i64 {
    let Some(text) = text else {
        return -1;
    };
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return -1;
    }
    digits.parse().unwrap_or(i64::MAX)
}

/// What the reader typed after the highlight's timestamp
pub fn free_text(bookmark: &Bookmark) -> String {
    let Some(text) = bookmark.text.as_deref() else {
        return String::new();
    };
    if bookmark.datetime.is_empty() {
        return String::new();
    }
    match text.find(&bookmark.datetime) {
        Some(pos) => text[pos + bookmark.datetime.len()..].trim().to_string(),
        None => String::new(),
    }
}
