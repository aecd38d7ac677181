use anyhow::{Context, Result};

use koreader_sync_lib::identity::fingerprint;
use koreader_sync_lib::metadata::MetadataSource;
use koreader_sync_lib::note::{free_text, page_number};

use crate::app::App;
use crate::render::terminal::{paint, progress_bar, Color};
use crate::OutputFormat;

pub fn run(app: &App, format: &OutputFormat, use_color: bool) -> Result<()> {
    let source = MetadataSource::new(&app.settings.koreader_base_path);
    let books = source
        .scan()
        .with_context(|| format!("Failed to scan {}", source.base_path().display()))?;
    let imported = app.load_imported()?;

    match format {
        OutputFormat::Json => {
            let output: Vec<_> = books
                .values()
                .map(|book| {
                    let highlights: Vec<_> = book
                        .bookmarks
                        .values()
                        .map(|b| {
                            let id = fingerprint(&book.title, &book.authors, &b.pos0, b.pos1.as_deref());
                            serde_json::json!({
                                "uniqueId": id,
                                "imported": imported.contains(&id),
                                "chapter": b.chapter,
                                "page": page_number(b.text.as_deref()),
                                "highlight": b.notes,
                                "text": free_text(b),
                                "datetime": b.datetime,
                            })
                        })
                        .collect();
                    serde_json::json!({
                        "title": book.title,
                        "authors": book.authors,
                        "percentFinished": book.percent_finished,
                        "highlights": highlights,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if books.is_empty() {
                println!("(no highlighted books)");
            }
            for book in books.values() {
                println!(
                    "{} {}",
                    paint(&book.full_title(), Color::BOLD, use_color),
                    progress_bar(book.percent_finished, 20)
                );
                for b in book.bookmarks.values() {
                    let id = fingerprint(&book.title, &book.authors, &b.pos0, b.pos1.as_deref());
                    let marker = if imported.contains(&id) { " " } else { "+" };
                    println!("  {} p.{} {}", marker, page_number(b.text.as_deref()), b.notes);
                }
                println!();
            }
        }
    }

    Ok(())
}
