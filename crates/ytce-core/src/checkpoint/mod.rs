mod in_memory;
mod index;
mod jsonl;

pub use in_memory::InMemoryCheckpointStore;
pub use index::CheckpointIndex;
pub use jsonl::JsonlCheckpointStore;

use std::collections::{HashMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::models::{CoreError, ResultStatus, ResultValue, TaskResult};

pub type CheckpointResult<T> = Result<T, CoreError>;

/// One persisted `(task, record)` outcome.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CheckpointEntry {
    pub task_id: String,
    pub comment_id: String,
    pub value: Option<ResultValue>,
    pub confidence: f64,
    pub status: ResultStatus,
    pub raw_response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: u64,
}

impl CheckpointEntry {
    pub fn new(task_id: &str, comment_id: &str, result: &TaskResult) -> Self {
        Self {
            task_id: task_id.to_string(),
            comment_id: comment_id.to_string(),
            value: result.value.clone(),
            confidence: result.confidence,
            status: result.status,
            raw_response: result.raw_response.clone(),
            error: result.error.clone(),
            timestamp: unix_now(),
        }
    }

    pub fn result(&self) -> TaskResult {
        TaskResult {
            value: self.value.clone(),
            confidence: self.confidence,
            raw_response: self.raw_response.clone(),
            status: self.status,
            error: self.error.clone(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResultStatus::Ok
    }
}

/// Durable record of completed work, consulted before any model call.
///
/// Writes are idempotent upserts keyed by `(task_id, comment_id)`; an entry
/// already marked ok is never replaced by a failed one.
pub trait CheckpointStore: Send + Sync {
    /// Ids whose latest entry for `task_id` is ok. Failed ids are recomputed.
    fn already_done(&self, task_id: &str) -> CheckpointResult<HashSet<String>>;

    fn completed(&self, task_id: &str) -> CheckpointResult<HashMap<String, TaskResult>>;

    /// Persists every result of one batch before returning.
    fn record_batch(&self, task_id: &str, results: &[(String, TaskResult)])
    -> CheckpointResult<()>;

    fn record(&self, task_id: &str, comment_id: &str, result: &TaskResult) -> CheckpointResult<()> {
        self.record_batch(task_id, &[(comment_id.to_string(), result.clone())])
    }

    /// Number of distinct `(task, record)` keys held.
    fn entry_count(&self) -> CheckpointResult<usize>;
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}
