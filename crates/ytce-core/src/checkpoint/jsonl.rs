use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::checkpoint::{CheckpointEntry, CheckpointIndex, CheckpointResult, CheckpointStore};
use crate::models::{CoreError, TaskResult};

/// Append-only log with one JSON object per line. The log is folded into an
/// in-memory index on open; every batch is flushed and synced before
/// `record_batch` returns.
#[derive(Debug)]
pub struct JsonlCheckpointStore {
    path: PathBuf,
    state: Mutex<LogState>,
}

#[derive(Debug)]
struct LogState {
    file: File,
    index: CheckpointIndex,
}

impl JsonlCheckpointStore {
    /// Opens or creates the log. Any unreadable line makes the whole store
    /// unusable.
    pub fn open(path: impl Into<PathBuf>) -> CheckpointResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|error| io_error(&path, "create directory", error))?;
        }

        let index = if path.exists() {
            load_index(&path)?
        } else {
            CheckpointIndex::new()
        };
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|error| io_error(&path, "open", error))?;

        tracing::debug!(
            path = %path.display(),
            entries = index.len(),
            "opened jsonl checkpoint"
        );
        Ok(Self {
            path,
            state: Mutex::new(LogState { file, index }),
        })
    }

    fn lock(&self) -> CheckpointResult<MutexGuard<'_, LogState>> {
        self.state
            .lock()
            .map_err(|_| CoreError::checkpoint("checkpoint log lock poisoned"))
    }
}

impl CheckpointStore for JsonlCheckpointStore {
    fn already_done(&self, task_id: &str) -> CheckpointResult<HashSet<String>> {
        Ok(self.lock()?.index.already_done(task_id))
    }

    fn completed(&self, task_id: &str) -> CheckpointResult<HashMap<String, TaskResult>> {
        Ok(self.lock()?.index.completed(task_id))
    }

    fn record_batch(&self, task_id: &str, results: &[(String, TaskResult)]) -> CheckpointResult<()> {
        let mut state = self.lock()?;

        let entries: Vec<CheckpointEntry> = results
            .iter()
            .map(|(comment_id, result)| CheckpointEntry::new(task_id, comment_id, result))
            .filter(|entry| state.index.accepts(entry))
            .collect();
        if entries.is_empty() {
            return Ok(());
        }

        let mut buffer = String::new();
        for entry in &entries {
            let line = serde_json::to_string(entry).map_err(|error| {
                CoreError::checkpoint(format!("failed to encode checkpoint entry: {error}"))
            })?;
            buffer.push_str(&line);
            buffer.push('\n');
        }

        append(&mut state.file, buffer.as_bytes())
            .map_err(|error| io_error(&self.path, "append", error))?;

        for entry in entries {
            state.index.apply(entry);
        }
        Ok(())
    }

    fn entry_count(&self) -> CheckpointResult<usize> {
        Ok(self.lock()?.index.len())
    }
}

fn append(file: &mut File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes)?;
    file.flush()?;
    file.sync_all()
}

fn load_index(path: &Path) -> CheckpointResult<CheckpointIndex> {
    let file = File::open(path).map_err(|error| io_error(path, "read", error))?;
    let mut index = CheckpointIndex::new();

    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|error| io_error(path, "read", error))?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: CheckpointEntry = serde_json::from_str(&line).map_err(|error| {
            CoreError::checkpoint(format!(
                "checkpoint '{}' is corrupt at line {}: {error}",
                path.display(),
                number + 1
            ))
        })?;
        index.apply(entry);
    }
    Ok(index)
}

fn io_error(path: &Path, operation: &str, error: std::io::Error) -> CoreError {
    CoreError::checkpoint(format!(
        "checkpoint '{}' {operation} failed: {error}",
        path.display()
    ))
}
