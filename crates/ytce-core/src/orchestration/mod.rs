pub mod cancellation;
pub mod summary;

pub use cancellation::CancellationToken;
pub use summary::{RunFailure, RunReport, RunSummary, TaskSummary};

use std::collections::HashSet;
use std::sync::Arc;

use tokio::task::JoinSet;

use crate::adapters::ModelAdapter;
use crate::batching::batches;
use crate::checkpoint::CheckpointStore;
use crate::config::RunOptions;
use crate::executor::{BatchOutcome, ExecutorResult, TaskExecutor};
use crate::merge::ResultMerger;
use crate::models::{Comment, CoreError, CoreErrorKind, JobSpec, TaskConfig, TaskResult};
use crate::prompt::PromptCompiler;
use crate::registry;
use crate::retry::RetryPolicy;

pub type OrchestrationResult<T> = Result<T, CoreError>;

/// Runs a job: validation, per-task resume from the checkpoint, bounded
/// concurrent batch dispatch, and merging.
///
/// Tasks run in job order. Within a task at most `max_in_flight` batches
/// are outstanding. This loop is the only checkpoint writer; each batch is
/// recorded as soon as it completes.
pub struct Orchestrator {
    adapter: Arc<dyn ModelAdapter>,
    checkpoint: Arc<dyn CheckpointStore>,
    options: RunOptions,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(
        adapter: Arc<dyn ModelAdapter>,
        checkpoint: Arc<dyn CheckpointStore>,
        options: RunOptions,
    ) -> OrchestrationResult<Self> {
        options.validate()?;
        let retry = RetryPolicy::new(options.max_retries, options.backoff);
        Ok(Self {
            adapter,
            checkpoint,
            options,
            retry,
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Returns `Err` only for configuration, authentication and checkpoint
    /// failures, carrying the counters reached so far. Cancellation yields a
    /// report with `cancelled` set; every batch that finished before it is
    /// checkpointed.
    ///
    /// A fatal error stops only the run it happened in; the orchestrator's
    /// token is left untouched so the orchestrator can run again.
    pub async fn run(&self, job: &JobSpec, comments: Vec<Comment>) -> Result<RunReport, RunFailure> {
        let tasks = registry::validate_job(job, &comments)?;
        let mut comments = comments;
        if let Some(limit) = self.options.max_records
            && comments.len() > limit
        {
            tracing::info!(limit, available = comments.len(), "limiting records processed");
            comments.truncate(limit);
        }

        tracing::info!(
            tasks = tasks.len(),
            records = comments.len(),
            batch_size = self.options.batch_size,
            max_in_flight = self.options.max_in_flight,
            adapter = self.adapter.name(),
            "starting analysis run"
        );

        let run_cancel = self.cancel.child();
        let executor = Arc::new(TaskExecutor::new(
            PromptCompiler::new(self.options.max_comment_chars),
            Arc::clone(&self.adapter),
            self.retry.clone(),
        ));
        let mut merger = ResultMerger::new();
        let mut summary = RunSummary::default();

        for (index, task) in tasks.iter().enumerate() {
            let mut task_summary = TaskSummary::new(&task.id, comments.len());
            if run_cancel.is_cancelled() {
                summary.tasks.push(task_summary);
                continue;
            }
            let outcome = self
                .run_task(&executor, &run_cancel, task, &comments, &mut merger, &mut task_summary)
                .await;
            summary.tasks.push(task_summary);
            if let Err(error) = outcome {
                summary.tasks.extend(
                    tasks[index + 1..]
                        .iter()
                        .map(|rest| TaskSummary::new(&rest.id, comments.len())),
                );
                return Err(RunFailure::new(error.for_task(&task.id), summary));
            }
        }

        let cancelled = self.cancel.is_cancelled();
        if cancelled {
            tracing::warn!("analysis run cancelled; completed batches are checkpointed");
        }
        tracing::info!(
            model_calls = summary.model_calls(),
            failed = summary.failed(),
            cancelled,
            "analysis run finished"
        );

        Ok(RunReport {
            result: merger.finish(comments, tasks),
            summary,
            cancelled,
        })
    }

    async fn run_task(
        &self,
        executor: &Arc<TaskExecutor>,
        cancel: &CancellationToken,
        task: &TaskConfig,
        comments: &[Comment],
        merger: &mut ResultMerger,
        summary: &mut TaskSummary,
    ) -> OrchestrationResult<()> {
        let store = Arc::clone(&self.checkpoint);
        let task_id = task.id.clone();
        let done = blocking("checkpoint load", move || store.completed(&task_id)).await?;

        let wanted: HashSet<&str> = comments.iter().map(|comment| comment.id.as_str()).collect();
        let resumed: Vec<(String, TaskResult)> = done
            .into_iter()
            .filter(|(comment_id, _)| wanted.contains(comment_id.as_str()))
            .collect();
        let remaining: Vec<Comment> = {
            let resumed_ids: HashSet<&str> = resumed.iter().map(|(id, _)| id.as_str()).collect();
            comments
                .iter()
                .filter(|comment| !resumed_ids.contains(comment.id.as_str()))
                .cloned()
                .collect()
        };
        summary.resumed = resumed.len();
        summary.completed = resumed.len();
        merger.extend(&task.id, resumed);

        let mut pending = batches(&remaining, self.options.batch_size)?;
        tracing::info!(
            task_id = %task.id,
            task_type = task.task_type().as_str(),
            total = summary.total,
            resumed = summary.resumed,
            batches = pending.len(),
            "starting task"
        );

        let mut in_flight: JoinSet<ExecutorResult<BatchOutcome>> = JoinSet::new();
        let mut fatal: Option<CoreError> = None;

        loop {
            while fatal.is_none()
                && !cancel.is_cancelled()
                && in_flight.len() < self.options.max_in_flight
            {
                let Some(batch) = pending.next() else {
                    break;
                };
                let batch = batch.to_vec();
                let executor = Arc::clone(executor);
                let task = task.clone();
                let cancel = cancel.clone();
                in_flight.spawn_blocking(move || {
                    executor.execute(&task, &batch, task.custom_prompt.as_deref(), &cancel)
                });
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };
            let outcome = match joined {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(error)) if error.kind == CoreErrorKind::Cancelled => {
                    tracing::warn!(task_id = %task.id, "abandoned batch waiting to retry");
                    continue;
                }
                Ok(Err(error)) => {
                    stop(cancel, &mut fatal, error);
                    continue;
                }
                Err(join_error) => {
                    stop(
                        cancel,
                        &mut fatal,
                        CoreError::new(
                            CoreErrorKind::Internal,
                            format!("batch worker join failure: {join_error}"),
                        ),
                    );
                    continue;
                }
            };
            if fatal.is_some() {
                continue;
            }

            summary.model_calls += u64::from(outcome.model_calls);
            summary.usage += outcome.usage;
            let ok = outcome.ok_count();
            let failed = outcome.failed_count();

            let store = Arc::clone(&self.checkpoint);
            let task_id = task.id.clone();
            let results = outcome.results;
            match blocking("checkpoint write", move || {
                store.record_batch(&task_id, &results).map(|()| results)
            })
            .await
            {
                Ok(results) => {
                    summary.completed += ok;
                    summary.failed += failed;
                    merger.extend(&task.id, results);
                }
                Err(error) => stop(cancel, &mut fatal, error),
            }
        }

        if let Some(error) = fatal {
            tracing::error!(
                task_id = %task.id,
                kind = ?error.kind,
                message = %error.message,
                "aborting analysis run"
            );
            return Err(error);
        }

        tracing::info!(
            task_id = %task.id,
            completed = summary.completed,
            failed = summary.failed,
            pending = summary.pending(),
            model_calls = summary.model_calls,
            "finished task"
        );
        Ok(())
    }
}

/// Keeps the first fatal error and stops further dispatch for this run.
/// Batches still in flight are drained but not recorded.
fn stop(cancel: &CancellationToken, fatal: &mut Option<CoreError>, error: CoreError) {
    if fatal.is_none() {
        cancel.cancel();
        *fatal = Some(error);
    }
}

async fn blocking<T, F>(operation: &str, work: F) -> OrchestrationResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> OrchestrationResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|join_error| {
        CoreError::new(
            CoreErrorKind::Internal,
            format!("{operation} join failure: {join_error}"),
        )
    })?
}
