use std::path::Path;
use rusqlite::{Connection, params};
use showmyslskd::import::{ImportEvent, ImportSummary, Importer};
use showmyslskd::storage::{self, ReportStore};
use showmyslskd::{AppConfig, Error, ReportEngine, ReportRequest, ReportTemplate};

fn create_source(path: &Path, rows: &[(&str, &str, &str, &str, Option<&str>, i64)]) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE Transfers (
            Id TEXT PRIMARY KEY,
            Username TEXT NOT NULL,
            Direction TEXT NOT NULL,
            Filename TEXT NOT NULL,
            Size INTEGER NOT NULL,
            State TEXT NOT NULL,
            EndedAt TEXT,
            BytesTransferred INTEGER NOT NULL,
            AverageSpeed REAL NOT NULL
        );",
    )
    .unwrap();
    for (id, username, direction, filename, ended_at, bytes) in rows {
        conn.execute(
            "INSERT INTO Transfers (Id, Username, Direction, Filename, Size, State, EndedAt, BytesTransferred, AverageSpeed)
             VALUES (?1, ?2, ?3, ?4, ?5, 'Completed, Succeeded', ?6, ?5, 4096.0)",
            params![id, username, direction, filename, bytes, ended_at],
        )
        .unwrap();
    }
}

fn sample_rows() -> Vec<(&'static str, &'static str, &'static str, &'static str, Option<&'static str>, i64)> {
    vec![
        ("t1", "alice", "Upload", "/home/music/Beatles/song.mp3", Some("2024-06-01 10:00:00"), 1_048_576),
        ("t2", "bob", "Upload", "/x/y.mp3", Some("2024-06-01 11:00:00"), 3_145_728),
        ("t3", "alice", "Upload", "/music/Queen/hit.mp3", Some("2024-06-02 09:30:00"), 2_097_152),
        ("t4", "carol", "Download", "/music/Queen/other.mp3", Some("2024-06-02 09:30:00"), 1_048_576),
        ("t5", "dave", "Upload", "/music/Muse/live.mp3", None, 1_048_576),
    ]
}

#[test]
fn test_file_import_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("slskd.db");
    let target = dir.path().join("report.db");
    create_source(&source, &sample_rows());

    let importer = Importer::new(&source, &target);
    let first = importer.run(&Default::default(), |_| {}).unwrap();
    let second = importer.run(&Default::default(), |_| {}).unwrap();

    assert_eq!(first, ImportSummary { new_records: 3, skipped_records: 0, cancelled: false });
    assert_eq!(second, ImportSummary { new_records: 0, skipped_records: 3, cancelled: false });

    let store = ReportStore::open(&target).unwrap();
    assert_eq!(store.count().unwrap(), 3);
    assert_eq!(store.get_transfer("t1").unwrap().unwrap().artist, "Beatles");
    assert_eq!(store.get_transfer("t2").unwrap().unwrap().artist, "Unknown");
    assert_eq!(store.get_transfer("t3").unwrap().unwrap().artist, "Queen");
    assert!(!store.contains_id("t4").unwrap());
    assert!(!store.contains_id("t5").unwrap());
}

#[test]
fn test_spawned_import_streams_events() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("slskd.db");
    let target = dir.path().join("report.db");
    create_source(&source, &sample_rows());

    let handle = Importer::new(&source, &target).batch_size(1).spawn().unwrap();
    let mut progress = Vec::new();
    let mut summary = None;
    for event in handle.events().iter() {
        match event {
            ImportEvent::Progress(p) => progress.push(p),
            ImportEvent::Finished(s) => summary = Some(s),
            ImportEvent::Failed(e) => panic!("import failed: {}", e),
        }
    }
    handle.join().unwrap();

    assert_eq!(summary.unwrap().new_records, 3);
    assert_eq!(progress.first(), Some(&0));
    assert_eq!(progress.last(), Some(&100));
    assert!(progress.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_spawned_import_reports_storage_failure() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("report.db");

    let handle = Importer::new(dir.path().join("missing.db"), &target).spawn().unwrap();
    let result = handle.wait();

    assert!(matches!(result, Err(Error::Storage(_))));
}

#[test]
fn test_importer_from_config_requires_paths() {
    let config = AppConfig { input_db: Some("in.db".to_string()), output_db: None };
    assert!(matches!(Importer::from_config(&config), Err(Error::ConfigurationMissing("output_db"))));

    let complete = AppConfig::new("in.db", "out.db");
    let importer = Importer::from_config(&complete).unwrap();
    assert_eq!(importer.source(), Path::new("in.db"));
    assert_eq!(importer.target(), Path::new("out.db"));
}

#[test]
fn test_reports_and_names_after_import() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("slskd.db");
    let target = dir.path().join("report.db");
    create_source(&source, &sample_rows());
    Importer::new(&source, &target).spawn().unwrap().wait().unwrap();

    let store = ReportStore::open(&target).unwrap();
    let table = ReportEngine::new(&store)
        .run(&ReportRequest::new(ReportTemplate::TopUsersByData))
        .unwrap();
    let first: Vec<String> = table.rows[0].iter().map(ToString::to_string).collect();
    // alice: 1 MB + 2 MB, bob: 3 MB; ties keep both at 3
    assert_eq!(first[1], "3");
    assert_eq!(table.rows.len(), 2);

    let names = storage::distinct_usernames_and_artists(Some(target.as_path())).unwrap();
    assert_eq!(names, vec!["alice", "bob", "Beatles", "Queen", "Unknown"]);
}

#[test]
fn test_write_failure_rolls_back_whole_run() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("slskd.db");
    let target = dir.path().join("report.db");
    create_source(
        &source,
        &[
            ("t1", "alice", "Upload", "/music/Queen/a.mp3", Some("2024-06-01 10:00:00"), 1_048_576),
            ("t2", "alice", "Upload", "/music/Queen/b.mp3", Some("2024-06-01 10:05:00"), 1_048_576),
            ("t3", "bob", "Upload", "/music/Muse/c.mp3", Some("2024-06-01 10:10:00"), 1_048_576),
        ],
    );
    drop(ReportStore::open(&target).unwrap());
    Connection::open(&target)
        .unwrap()
        .execute_batch(
            "CREATE TRIGGER reject_t3 BEFORE INSERT ON UserTransfers
             WHEN NEW.Id = 't3'
             BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
        )
        .unwrap();

    let handle = Importer::new(&source, &target).spawn().unwrap();
    let last = handle.events().iter().last();
    handle.join().unwrap();

    assert!(matches!(last, Some(ImportEvent::Failed(Error::Storage(_)))));
    assert_eq!(ReportStore::open(&target).unwrap().count().unwrap(), 0);
}

#[test]
fn test_reports_never_touch_a_foreign_database() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("slskd.db");
    create_source(&source, &sample_rows());

    assert!(matches!(ReportStore::open_read_only(&source), Err(Error::NotAReportDatabase(_))));

    let conn = Connection::open(&source).unwrap();
    let tables: i64 = conn
        .query_row("SELECT COUNT(*) FROM sqlite_master WHERE name = 'UserTransfers'", [], |row| row.get(0))
        .unwrap();
    assert_eq!(tables, 0);
}
