use anyhow::Result;

use koreader_sync_lib::reconcile::{run_sync, SyncReport};

use crate::app::App;
use crate::render::terminal::{failure, notice, success, Color, paint};
use crate::OutputFormat;

pub fn run(app: &App, format: &OutputFormat, use_color: bool) -> Result<()> {
    let mut imported = app.load_imported()?;

    let report = match run_sync(&app.settings, &app.vault, &mut imported) {
        Ok(report) => report,
        Err(e) => {
            log::error!("Sync failed: {}", e);
            failure(&format!("Sync failed: {}", e), use_color);
            return Err(e.into());
        }
    };
    app.save_imported(&imported)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Plain => print_report(&report, use_color),
    }
    Ok(())
}

fn print_report(report: &SyncReport, use_color: bool) {
    success(
        &format!(
            "Synced {} book(s): {} created, {} updated, {} unchanged",
            report.books, report.created, report.updated, report.unchanged
        ),
        use_color,
    );

    let skipped = [
        ("adopted", report.adopted),
        ("deleted in vault", report.skipped_deleted),
        ("locked", report.skipped_locked),
        ("book notes created", report.book_notes_created),
        ("book notes updated", report.book_notes_updated),
    ];
    for (label, count) in skipped.iter().filter(|(_, count)| *count > 0) {
        println!("  {}", paint(&format!("{}: {}", label, count), Color::DIM, use_color));
    }

    for failed in &report.failures {
        notice(
            &format!("Could not sync a highlight of {}: {}", failed.book, failed.message),
            use_color,
        );
    }
}
