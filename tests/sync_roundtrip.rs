use std::fs;
use std::path::Path;

use tempfile::TempDir;

use koreader_sync_lib::commands::reset_imported;
use koreader_sync_lib::edit::{EditDetector, EditOutcome};
use koreader_sync_lib::identity::fingerprint;
use koreader_sync_lib::note::{NoteFile, SyncHeader};
use koreader_sync_lib::reconcile::run_sync;
use koreader_sync_lib::{FsVault, ImportedSet, Settings, Vault};

const SIDECAR: &str = r#"return {
    ["doc_props"] = {
        ["title"] = "Foo",
        ["authors"] = "Bar",
    },
    ["percent_finished"] = 0.5,
    ["highlight"] = {
        [5] = {
            [1] = {
                ["chapter"] = "Ch1",
                ["datetime"] = "2022-01-01 00:00:00",
                ["pos0"] = "p0",
                ["pos1"] = "p1",
                ["text"] = "hi",
            },
        },
    },
    ["bookmarks"] = {
        [1] = {
            ["chapter"] = "Ch1",
            ["datetime"] = "2022-01-01 00:00:00",
            ["highlighted"] = true,
            ["notes"] = "hi",
            ["page"] = "5",
            ["pos0"] = "p0",
            ["pos1"] = "p1",
            ["text"] = "Pagina 5 hi @ 2022-01-01 00:00:00 my thoughts",
        },
    },
}"#;

const NOTE: &str = "Highlights/my thoughts.md";

struct Fixture {
    _temp: TempDir,
    settings: Settings,
    vault: FsVault,
}

fn fixture() -> Fixture {
    let temp = TempDir::new().unwrap();
    let device = temp.path().join("device");
    let vault_dir = temp.path().join("vault");
    fs::create_dir_all(device.join("books/foo.sdr")).unwrap();
    fs::create_dir_all(&vault_dir).unwrap();
    fs::write(device.join("books/foo.sdr/metadata.epub.lua"), SIDECAR).unwrap();

    let settings = Settings {
        koreader_base_path: device,
        vault_path: vault_dir.clone(),
        note_folder: "Highlights".to_string(),
        ..Default::default()
    };
    Fixture {
        _temp: temp,
        settings,
        vault: FsVault::new(vault_dir),
    }
}

fn read(vault_root: &Path, path: &str) -> String {
    fs::read_to_string(vault_root.join(path)).unwrap()
}

fn highlight(vault: &FsVault, path: &str) -> koreader_sync_lib::note::HighlightHeader {
    let note = NoteFile::parse(&vault.read(path).unwrap()).unwrap();
    match note.sync_header().unwrap() {
        Some(SyncHeader::Highlight(header)) => header,
        other => panic!("expected highlight header, got {:?}", other),
    }
}

#[test]
fn test_import_is_idempotent_and_respects_deletion() {
    let f = fixture();
    let mut imported = ImportedSet::new();

    let report = run_sync(&f.settings, &f.vault, &mut imported).unwrap();
    assert_eq!(report.created, 1);

    let header = highlight(&f.vault, NOTE);
    assert_eq!(header.unique_id, fingerprint("Foo", "Bar", "p0", Some("p1")));
    assert_eq!(header.data.page, 5);
    assert_eq!(header.data.text, "my thoughts");
    assert!(header.metadata.yet_to_be_edited);
    assert!(!header.metadata.keep_in_sync);

    let body = NoteFile::parse(&f.vault.read(NOTE).unwrap()).unwrap().body;
    assert!(body.contains("**==hi==**"));
    assert!(body.contains("Page: 5"));

    // Nothing changed upstream: no writes, same bytes
    let before = read(f.vault.root(), NOTE);
    let report = run_sync(&f.settings, &f.vault, &mut imported).unwrap();
    assert_eq!(report.writes(), 0);
    assert_eq!(read(f.vault.root(), NOTE), before);

    // A deleted note stays deleted
    f.vault.delete(NOTE).unwrap();
    let report = run_sync(&f.settings, &f.vault, &mut imported).unwrap();
    assert_eq!(report.skipped_deleted, 1);
    assert!(!f.vault.exists(NOTE));

    // Until the imported set is reset
    let mut settings = f.settings.clone();
    settings.enable_reset_imported_notes = true;
    reset_imported(&mut settings, &mut imported).unwrap();
    let report = run_sync(&settings, &f.vault, &mut imported).unwrap();
    assert_eq!(report.created, 1);
    assert!(f.vault.exists(NOTE));
}

#[test]
fn test_edited_note_survives_sync() {
    let f = fixture();
    let mut imported = ImportedSet::new();
    run_sync(&f.settings, &f.vault, &mut imported).unwrap();

    let mut note = NoteFile::parse(&f.vault.read(NOTE).unwrap()).unwrap();
    note.body = note.body.replace("my thoughts", "second thoughts\nand more");
    f.vault.modify(NOTE, &note.to_markdown().unwrap()).unwrap();

    let outcome = EditDetector::new(&f.vault, &f.settings).on_file_changed(NOTE).unwrap();
    assert_eq!(
        outcome,
        EditOutcome::Updated {
            text: "second thoughts\nand more".to_string()
        }
    );
    let header = highlight(&f.vault, NOTE);
    assert_eq!(header.data.text, "second thoughts\nand more");
    assert!(!header.metadata.yet_to_be_edited);

    let edited = read(f.vault.root(), NOTE);
    let report = run_sync(&f.settings, &f.vault, &mut imported).unwrap();
    assert_eq!(report.writes(), 0);
    assert_eq!(read(f.vault.root(), NOTE), edited);
}

#[test]
fn test_settings_round_trip_through_toml() {
    let f = fixture();
    let path = f.settings.vault_path.join("../config.toml");
    f.settings.save_to(&path).unwrap();
    assert_eq!(Settings::load_from(&path).unwrap(), f.settings);
}
