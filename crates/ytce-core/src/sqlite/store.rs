use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::checkpoint::{CheckpointEntry, CheckpointResult, CheckpointStore, unix_now};
use crate::models::{CoreError, ResultStatus, ResultValue, TaskResult};
use crate::sqlite::migrations::{SqliteMigration, current_schema_version, migration};

const MIGRATIONS_TABLE: &str = "ytce_schema_migrations";

/// Checkpoint backend on a SQLite file. Each call opens its own connection,
/// so the store is safe to share across threads.
#[derive(Debug)]
pub struct SqliteCheckpointStore {
    database_path: PathBuf,
}

impl SqliteCheckpointStore {
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
        }
    }

    /// Opens the database, migrates it, and verifies every stored row
    /// decodes. A store that fails any of these is not used.
    pub fn open(database_path: impl Into<PathBuf>) -> CheckpointResult<Self> {
        let store = Self::new(database_path);
        store.migrate_to_latest()?;
        let rows = store.with_connection("verify", |connection| {
            let mut statement = connection.prepare(&format!("{SELECT_ENTRIES} ORDER BY task_id"))?;
            let rows = statement.query_map([], entry_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })?;
        tracing::debug!(
            path = %store.database_path.display(),
            entries = rows.len(),
            "opened sqlite checkpoint"
        );
        Ok(store)
    }

    pub fn current_version(&self) -> CheckpointResult<i64> {
        self.with_connection("current_version", |connection| {
            ensure_migrations_table(connection)?;
            read_current_version(connection)
        })
    }

    pub fn migrate_to_latest(&self) -> CheckpointResult<()> {
        self.apply_migration(current_schema_version())
    }

    /// Moves the schema up or down to `target_version`.
    pub fn apply_migration(&self, target_version: i64) -> CheckpointResult<()> {
        if target_version < 0 || target_version > current_schema_version() {
            return Err(storage_error_text(
                "apply_migration",
                format!("invalid migration target version '{target_version}'"),
            ));
        }

        self.with_connection("apply_migration", |connection| {
            ensure_migrations_table(connection)?;
            let current_version = read_current_version(connection)?;
            if current_version > current_schema_version() {
                return Err(storage_error_sqlite(&format!(
                    "database schema version {current_version} is newer than supported version {}",
                    current_schema_version()
                )));
            }

            if target_version >= current_version {
                for version in (current_version + 1)..=target_version {
                    apply_up_migration(connection, defined_migration(version)?)?;
                }
            } else {
                for version in ((target_version + 1)..=current_version).rev() {
                    apply_down_migration(connection, defined_migration(version)?)?;
                }
            }
            Ok(())
        })
    }

    fn with_connection<T>(
        &self,
        operation_name: &str,
        operation: impl FnOnce(&mut Connection) -> rusqlite::Result<T>,
    ) -> CheckpointResult<T> {
        let mut connection = open_connection(&self.database_path)
            .map_err(|error| storage_error(operation_name, error))?;
        operation(&mut connection).map_err(|error| storage_error(operation_name, error))
    }

    fn ok_entries(&self, operation_name: &str, task_id: &str) -> CheckpointResult<Vec<CheckpointEntry>> {
        self.with_connection(operation_name, |connection| {
            ensure_schema_ready(connection)?;
            let mut statement = connection.prepare(&format!(
                "{SELECT_ENTRIES} WHERE task_id = ?1 AND status = 'ok'"
            ))?;
            let rows = statement.query_map([task_id], entry_from_row)?;
            rows.collect()
        })
    }
}

const SELECT_ENTRIES: &str = "
SELECT task_id, comment_id, value_json, confidence, status, raw_response, error_message,
       recorded_at_unix
FROM checkpoint_entries";

impl CheckpointStore for SqliteCheckpointStore {
    fn already_done(&self, task_id: &str) -> CheckpointResult<HashSet<String>> {
        Ok(self
            .ok_entries("already_done", task_id)?
            .into_iter()
            .map(|entry| entry.comment_id)
            .collect())
    }

    fn completed(&self, task_id: &str) -> CheckpointResult<HashMap<String, TaskResult>> {
        Ok(self
            .ok_entries("completed", task_id)?
            .into_iter()
            .map(|entry| {
                let result = entry.result();
                (entry.comment_id, result)
            })
            .collect())
    }

    fn record_batch(&self, task_id: &str, results: &[(String, TaskResult)]) -> CheckpointResult<()> {
        self.with_connection("record_batch", |connection| {
            ensure_schema_ready(connection)?;
            let transaction = connection.transaction()?;
            {
                let mut statement = transaction.prepare(
                    "
INSERT INTO checkpoint_entries (
    task_id, comment_id, value_json, confidence, status, raw_response, error_message,
    recorded_at_unix
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
ON CONFLICT(task_id, comment_id) DO UPDATE SET
    value_json = excluded.value_json,
    confidence = excluded.confidence,
    status = excluded.status,
    raw_response = excluded.raw_response,
    error_message = excluded.error_message,
    recorded_at_unix = excluded.recorded_at_unix
WHERE checkpoint_entries.status <> 'ok' OR excluded.status = 'ok'
",
                )?;

                let recorded_at = to_i64(unix_now())?;
                for (comment_id, result) in results {
                    let value_json = result
                        .value
                        .as_ref()
                        .map(serde_json::to_string)
                        .transpose()
                        .map_err(|error| rusqlite::Error::ToSqlConversionFailure(Box::new(error)))?;
                    statement.execute((
                        task_id,
                        comment_id.as_str(),
                        value_json.as_deref(),
                        result.confidence,
                        result.status.as_str(),
                        result.raw_response.as_str(),
                        result.error.as_deref(),
                        recorded_at,
                    ))?;
                }
            }
            transaction.commit()
        })
    }

    fn entry_count(&self) -> CheckpointResult<usize> {
        self.with_connection("entry_count", |connection| {
            ensure_schema_ready(connection)?;
            let count: i64 =
                connection.query_row("SELECT COUNT(*) FROM checkpoint_entries", [], |row| {
                    row.get(0)
                })?;
            usize::try_from(count).map_err(|_| storage_error_sqlite("negative row count"))
        })
    }
}

fn entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CheckpointEntry> {
    let status_raw: String = row.get(4)?;
    let status = status_raw.parse::<ResultStatus>().map_err(|_| {
        storage_error_sqlite(&format!(
            "unknown result status '{status_raw}' in sqlite record"
        ))
    })?;
    let value = row
        .get::<_, Option<String>>(2)?
        .map(|raw| {
            serde_json::from_str::<ResultValue>(&raw).map_err(|error| {
                storage_error_sqlite(&format!("unparseable stored value '{raw}': {error}"))
            })
        })
        .transpose()?;
    let recorded_at: i64 = row.get(7)?;

    Ok(CheckpointEntry {
        task_id: row.get(0)?,
        comment_id: row.get(1)?,
        value,
        confidence: row.get(3)?,
        status,
        raw_response: row.get(5)?,
        error: row.get(6)?,
        timestamp: u64::try_from(recorded_at)
            .map_err(|_| storage_error_sqlite("negative timestamp in sqlite record"))?,
    })
}

fn open_connection(database_path: &Path) -> rusqlite::Result<Connection> {
    if let Some(parent) = database_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|error| rusqlite::Error::ToSqlConversionFailure(Box::new(error)))?;
    }
    Connection::open(database_path)
}

fn ensure_migrations_table(connection: &Connection) -> rusqlite::Result<()> {
    connection.execute_batch(&format!(
        "
CREATE TABLE IF NOT EXISTS {MIGRATIONS_TABLE} (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at_unix INTEGER NOT NULL
);
"
    ))
}

fn ensure_schema_ready(connection: &Connection) -> rusqlite::Result<()> {
    ensure_migrations_table(connection)?;
    let version = read_current_version(connection)?;
    if version <= 0 {
        return Err(storage_error_sqlite(
            "checkpoint schema is not initialized; apply migrations first",
        ));
    }
    Ok(())
}

fn read_current_version(connection: &Connection) -> rusqlite::Result<i64> {
    connection.query_row(
        &format!("SELECT COALESCE(MAX(version), 0) FROM {MIGRATIONS_TABLE}"),
        [],
        |row| row.get(0),
    )
}

fn defined_migration(version: i64) -> rusqlite::Result<&'static SqliteMigration> {
    migration(version)
        .ok_or_else(|| storage_error_sqlite(&format!("migration version '{version}' is not defined")))
}

fn apply_up_migration(
    connection: &mut Connection,
    migration: &SqliteMigration,
) -> rusqlite::Result<()> {
    let transaction = connection.transaction()?;
    transaction.execute_batch(migration.up_sql)?;
    transaction.execute(
        &format!(
            "INSERT INTO {MIGRATIONS_TABLE} (version, name, applied_at_unix)
             VALUES (?1, ?2, strftime('%s', 'now'))"
        ),
        (migration.version, migration.name),
    )?;
    transaction.commit()
}

fn apply_down_migration(
    connection: &mut Connection,
    migration: &SqliteMigration,
) -> rusqlite::Result<()> {
    let transaction = connection.transaction()?;
    transaction.execute_batch(migration.down_sql)?;
    transaction.execute(
        &format!("DELETE FROM {MIGRATIONS_TABLE} WHERE version = ?1"),
        [migration.version],
    )?;
    transaction.commit()
}

fn to_i64(value: u64) -> rusqlite::Result<i64> {
    i64::try_from(value).map_err(|_| storage_error_sqlite("value exceeds i64 range"))
}

fn storage_error(operation: &str, error: rusqlite::Error) -> CoreError {
    storage_error_text(operation, error.to_string())
}

fn storage_error_sqlite(message: &str) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(std::io::Error::other(message.to_string())))
}

fn storage_error_text(operation: &str, message: impl AsRef<str>) -> CoreError {
    CoreError::checkpoint(format!(
        "sqlite checkpoint '{operation}' failed: {}",
        message.as_ref()
    ))
}
