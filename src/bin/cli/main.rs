mod app;
mod commands;
mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "koreader-sync", about = "Sync KOReader highlights into a markdown vault", version)]
struct Cli {
    /// Settings file (default: <config dir>/koreader-sync/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Import new highlights and refresh synced notes
    Sync,

    /// List books and highlights found on the device without writing
    Scan,

    /// Watch the vault and capture edits to generated notes
    Watch,

    /// Mark a note as edited so syncs leave it alone
    Edited {
        /// Note path, vault-relative or absolute
        note: String,
    },

    /// Mark a note as not edited
    NotEdited {
        /// Note path, vault-relative or absolute
        note: String,
    },

    /// Let future syncs overwrite a note
    EnableSync {
        /// Note path, vault-relative or absolute
        note: String,
    },

    /// Stop future syncs from overwriting a note
    DisableSync {
        /// Note path, vault-relative or absolute
        note: String,
    },

    /// Forget imported highlights so deleted notes are created again
    ResetImported,

    /// Run edit detection once on a note
    Check {
        /// Note path, vault-relative or absolute
        note: String,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let use_color = !cli.no_color && atty_check();
    let mut app = app::App::new(cli.config.as_deref())?;

    match cli.command {
        Command::Sync => commands::sync::run(&app, &cli.format, use_color)?,
        Command::Scan => commands::scan::run(&app, &cli.format, use_color)?,
        Command::Watch => commands::watch::run(&app, use_color)?,
        Command::Edited { note } => commands::note::set_edited(&app, &note, true, use_color)?,
        Command::NotEdited { note } => commands::note::set_edited(&app, &note, false, use_color)?,
        Command::EnableSync { note } => commands::note::set_keep_in_sync(&app, &note, true, use_color)?,
        Command::DisableSync { note } => commands::note::set_keep_in_sync(&app, &note, false, use_color)?,
        Command::ResetImported => commands::note::reset_imported(&mut app, use_color)?,
        Command::Check { note } => commands::note::check(&app, &note, use_color)?,
    }

    Ok(())
}

/// Check if stdout is a terminal (for color support)
fn atty_check() -> bool {
    unsafe { libc_isatty(1) != 0 }
}

extern "C" {
    #[link_name = "isatty"]
    fn libc_isatty(fd: i32) -> i32;
}
