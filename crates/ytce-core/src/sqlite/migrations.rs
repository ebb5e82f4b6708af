#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SqliteMigration {
    pub version: i64,
    pub name: &'static str,
    pub up_sql: &'static str,
    pub down_sql: &'static str,
}

const MIGRATION_0001: SqliteMigration = SqliteMigration {
    version: 1,
    name: "initial_checkpoint_schema",
    up_sql: r#"
CREATE TABLE IF NOT EXISTS checkpoint_entries (
    task_id TEXT NOT NULL,
    comment_id TEXT NOT NULL,
    value_json TEXT,
    confidence REAL NOT NULL,
    status TEXT NOT NULL,
    raw_response TEXT NOT NULL,
    error_message TEXT,
    recorded_at_unix INTEGER NOT NULL,
    PRIMARY KEY (task_id, comment_id)
);
"#,
    down_sql: r#"
DROP TABLE IF EXISTS checkpoint_entries;
"#,
};

const MIGRATION_0002: SqliteMigration = SqliteMigration {
    version: 2,
    name: "add_checkpoint_status_index",
    up_sql: r#"
CREATE INDEX IF NOT EXISTS idx_checkpoint_entries_task_status
    ON checkpoint_entries (task_id, status);
"#,
    down_sql: r#"
DROP INDEX IF EXISTS idx_checkpoint_entries_task_status;
"#,
};

const MIGRATIONS: [SqliteMigration; 2] = [MIGRATION_0001, MIGRATION_0002];

pub fn migrations() -> &'static [SqliteMigration] {
    &MIGRATIONS
}

pub fn migration(version: i64) -> Option<&'static SqliteMigration> {
    MIGRATIONS.iter().find(|entry| entry.version == version)
}

pub fn current_schema_version() -> i64 {
    MIGRATIONS.last().map(|entry| entry.version).unwrap_or(0)
}
