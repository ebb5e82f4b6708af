use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::Connection;
use ytce_core::checkpoint::CheckpointStore;
use ytce_core::models::{CoreErrorKind, ResultValue, TaskResult};
use ytce_core::sqlite::{SqliteCheckpointStore, current_schema_version, migrations};

fn temp_db_path(test_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time should be after unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("ytce-{test_name}-{nanos}.sqlite3"))
}

fn ok(value: ResultValue) -> TaskResult {
    TaskResult::ok(value, 0.8, "{}")
}

#[test]
fn open_applies_all_migrations() {
    let path = temp_db_path("migrate");
    let store = SqliteCheckpointStore::open(&path).unwrap();
    assert_eq!(store.current_version().unwrap(), current_schema_version());
    assert_eq!(
        migrations().last().map(|migration| migration.version),
        Some(current_schema_version())
    );

    store.apply_migration(0).unwrap();
    assert_eq!(store.current_version().unwrap(), 0);
    store.migrate_to_latest().unwrap();
    assert_eq!(store.current_version().unwrap(), current_schema_version());

    let _ = fs::remove_file(path);
}

#[test]
fn undefined_migration_target_is_rejected() {
    let path = temp_db_path("bad-target");
    let store = SqliteCheckpointStore::new(&path);
    let error = store
        .apply_migration(current_schema_version() + 1)
        .unwrap_err();
    assert_eq!(error.kind, CoreErrorKind::Checkpoint);

    let _ = fs::remove_file(path);
}

#[test]
fn every_value_shape_round_trips() {
    let path = temp_db_path("values");
    let store = SqliteCheckpointStore::open(&path).unwrap();
    store
        .record_batch(
            "mixed",
            &[
                ("text".to_string(), ok(ResultValue::Text("positive".into()))),
                (
                    "labels".to_string(),
                    ok(ResultValue::Labels(vec!["price".into(), "quality".into()])),
                ),
                ("number".to_string(), ok(ResultValue::Number(3.5))),
                ("failed".to_string(), TaskResult::failed("raw", "bad label")),
            ],
        )
        .unwrap();

    let completed = store.completed("mixed").unwrap();
    assert_eq!(completed.len(), 3);
    assert_eq!(
        completed["labels"].value,
        Some(ResultValue::Labels(vec!["price".into(), "quality".into()]))
    );
    assert_eq!(completed["number"].value, Some(ResultValue::Number(3.5)));
    assert_eq!(store.entry_count().unwrap(), 4);

    let _ = fs::remove_file(path);
}

#[test]
fn upsert_is_idempotent_and_never_downgrades_ok() {
    let path = temp_db_path("upsert");
    let store = SqliteCheckpointStore::open(&path).unwrap();
    let positive = ok(ResultValue::Text("positive".into()));

    store.record("sentiment", "1", &positive).unwrap();
    store.record("sentiment", "1", &positive).unwrap();
    store
        .record("sentiment", "1", &TaskResult::failed("", "timeout"))
        .unwrap();
    store
        .record("sentiment", "2", &TaskResult::failed("", "timeout"))
        .unwrap();

    assert_eq!(store.entry_count().unwrap(), 2);
    let done = store.already_done("sentiment").unwrap();
    assert!(done.contains("1"));
    assert!(!done.contains("2"));

    store
        .record("sentiment", "2", &ok(ResultValue::Text("neutral".into())))
        .unwrap();
    assert!(store.already_done("sentiment").unwrap().contains("2"));

    let _ = fs::remove_file(path);
}

#[test]
fn a_second_handle_sees_committed_entries() {
    let path = temp_db_path("second-handle");
    let writer = SqliteCheckpointStore::open(&path).unwrap();
    writer
        .record("sentiment", "1", &ok(ResultValue::Text("positive".into())))
        .unwrap();

    let reader = SqliteCheckpointStore::open(&path).unwrap();
    reader
        .record("sentiment", "1", &TaskResult::failed("", "late failure"))
        .unwrap();
    assert!(writer.already_done("sentiment").unwrap().contains("1"));

    let _ = fs::remove_file(path);
}

#[test]
fn non_database_file_is_a_fatal_checkpoint_error() {
    let path = temp_db_path("not-a-db");
    fs::write(&path, "this is not a sqlite database\n".repeat(200)).unwrap();

    let error = SqliteCheckpointStore::open(&path).unwrap_err();
    assert_eq!(error.kind, CoreErrorKind::Checkpoint);

    let _ = fs::remove_file(path);
}

#[test]
fn unknown_stored_status_is_a_fatal_checkpoint_error() {
    let path = temp_db_path("bad-status");
    let store = SqliteCheckpointStore::open(&path).unwrap();
    store
        .record("sentiment", "1", &ok(ResultValue::Text("positive".into())))
        .unwrap();

    let connection = Connection::open(&path).unwrap();
    connection
        .execute("UPDATE checkpoint_entries SET status = 'maybe'", [])
        .unwrap();
    drop(connection);

    let error = SqliteCheckpointStore::open(&path).unwrap_err();
    assert_eq!(error.kind, CoreErrorKind::Checkpoint);
    assert!(error.message.contains("maybe"), "{}", error.message);

    let _ = fs::remove_file(path);
}
