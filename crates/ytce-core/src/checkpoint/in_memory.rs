use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use crate::checkpoint::{CheckpointEntry, CheckpointIndex, CheckpointResult, CheckpointStore};
use crate::models::{CoreError, TaskResult};

/// Non-durable store for tests and dry runs without a checkpoint file.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    index: Mutex<CheckpointIndex>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(
        &self,
        task_id: &str,
        comment_id: &str,
    ) -> CheckpointResult<Option<CheckpointEntry>> {
        Ok(self.lock()?.slot(task_id, comment_id).cloned())
    }

    fn lock(&self) -> CheckpointResult<MutexGuard<'_, CheckpointIndex>> {
        self.index
            .lock()
            .map_err(|_| CoreError::checkpoint("in-memory checkpoint lock poisoned"))
    }
}

impl CheckpointStore for InMemoryCheckpointStore {
    fn already_done(&self, task_id: &str) -> CheckpointResult<HashSet<String>> {
        Ok(self.lock()?.already_done(task_id))
    }

    fn completed(&self, task_id: &str) -> CheckpointResult<HashMap<String, TaskResult>> {
        Ok(self.lock()?.completed(task_id))
    }

    fn record_batch(&self, task_id: &str, results: &[(String, TaskResult)]) -> CheckpointResult<()> {
        let mut index = self.lock()?;
        for (comment_id, result) in results {
            index.apply(CheckpointEntry::new(task_id, comment_id, result));
        }
        Ok(())
    }

    fn entry_count(&self) -> CheckpointResult<usize> {
        Ok(self.lock()?.len())
    }
}
