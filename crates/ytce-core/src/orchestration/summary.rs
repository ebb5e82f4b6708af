use std::fmt;

use serde::Serialize;

use crate::models::{AnalysisResult, CoreError, TokenUsage};

/// Counters for one task of a run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TaskSummary {
    pub task_id: String,
    pub total: usize,
    /// Records served from the checkpoint without a model call.
    pub resumed: usize,
    /// Records with an ok result, resumed ones included.
    pub completed: usize,
    pub failed: usize,
    pub model_calls: u64,
    pub usage: TokenUsage,
}

impl TaskSummary {
    pub fn new(task_id: &str, total: usize) -> Self {
        Self {
            task_id: task_id.to_string(),
            total,
            ..Self::default()
        }
    }

    /// Records that have no result yet, e.g. after cancellation.
    pub fn pending(&self) -> usize {
        self.total.saturating_sub(self.completed + self.failed)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub tasks: Vec<TaskSummary>,
}

impl RunSummary {
    pub fn task(&self, task_id: &str) -> Option<&TaskSummary> {
        self.tasks.iter().find(|task| task.task_id == task_id)
    }

    pub fn model_calls(&self) -> u64 {
        self.tasks.iter().map(|task| task.model_calls).sum()
    }

    pub fn failed(&self) -> usize {
        self.tasks.iter().map(|task| task.failed).sum()
    }

    pub fn usage(&self) -> TokenUsage {
        let mut usage = TokenUsage::default();
        for task in &self.tasks {
            usage += task.usage;
        }
        usage
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for task in &self.tasks {
            writeln!(
                f,
                "{}: {} records, {} ok ({} resumed), {} failed, {} pending, {} model calls, {} tokens",
                task.task_id,
                task.total,
                task.completed,
                task.resumed,
                task.failed,
                task.pending(),
                task.model_calls,
                task.usage.total(),
            )?;
        }
        let usage = self.usage();
        write!(
            f,
            "total: {} model calls, {} prompt tokens, {} completion tokens",
            self.model_calls(),
            usage.prompt_tokens,
            usage.completion_tokens
        )
    }
}

/// Outcome of a run that was not aborted by a fatal error.
#[derive(Clone, Debug, PartialEq)]
pub struct RunReport {
    pub result: AnalysisResult,
    pub summary: RunSummary,
    pub cancelled: bool,
}

/// A run stopped by a fatal error, with the counters it reached. Tasks that
/// never started are listed with everything pending.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("{error}")]
pub struct RunFailure {
    #[source]
    pub error: CoreError,
    pub summary: RunSummary,
}

impl RunFailure {
    pub fn new(error: CoreError, summary: RunSummary) -> Self {
        Self { error, summary }
    }
}

impl From<CoreError> for RunFailure {
    fn from(error: CoreError) -> Self {
        Self::new(error, RunSummary::default())
    }
}
