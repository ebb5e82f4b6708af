mod parse;

use std::sync::Arc;

use serde_json::Value;

use crate::adapters::{GenerateRequest, ModelAdapter};
use crate::models::{
    Comment, CoreError, CoreErrorKind, ModelError, TaskConfig, TaskResult, TokenUsage,
};
use crate::orchestration::CancellationToken;
use crate::prompt::{self, PromptCompiler};
use crate::registry;
use crate::retry::{RetryDecision, RetryPolicy};

pub type ExecutorResult<T> = Result<T, CoreError>;

/// Sampling temperature for every model call; runs must be reproducible.
pub const TEMPERATURE: f32 = 0.0;

/// Per-record results for one batch, in batch order, plus what the batch cost.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchOutcome {
    pub results: Vec<(String, TaskResult)>,
    pub model_calls: u32,
    pub usage: TokenUsage,
}

impl BatchOutcome {
    pub fn ok_count(&self) -> usize {
        self.results.iter().filter(|(_, result)| result.is_ok()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.len() - self.ok_count()
    }
}

/// Drives prompt compilation, the model call under the retry policy, and
/// per-entry validation for one batch of one task.
#[derive(Clone)]
pub struct TaskExecutor {
    compiler: PromptCompiler,
    adapter: Arc<dyn ModelAdapter>,
    retry: RetryPolicy,
}

impl TaskExecutor {
    pub fn new(compiler: PromptCompiler, adapter: Arc<dyn ModelAdapter>, retry: RetryPolicy) -> Self {
        Self {
            compiler,
            adapter,
            retry,
        }
    }

    /// Never fails because of a single record. Returns `Err` only for
    /// configuration problems, authentication failures, or when `cancel`
    /// fires while the batch is waiting to retry.
    pub fn execute(
        &self,
        task: &TaskConfig,
        batch: &[Comment],
        shared_context: Option<&str>,
        cancel: &CancellationToken,
    ) -> ExecutorResult<BatchOutcome> {
        let prompt = self.compiler.compile(task, batch, shared_context)?;
        let comment_ids: Vec<String> = batch.iter().map(|comment| comment.id.clone()).collect();
        let request = GenerateRequest {
            prompt: &prompt,
            temperature: TEMPERATURE,
            max_output_tokens: prompt::max_output_tokens(task, batch),
            task,
            comment_ids: &comment_ids,
        };
        tracing::debug!(
            task_id = %task.id,
            records = batch.len(),
            prompt_chars = prompt.len(),
            first_id = comment_ids.first().map(String::as_str).unwrap_or_default(),
            "dispatching batch"
        );

        let mut outcome = BatchOutcome::default();
        let mut retries = 0u32;
        let mut last_raw = String::new();

        loop {
            outcome.model_calls += 1;
            let error = match self.adapter.generate(&request) {
                Ok(response) => {
                    outcome.usage += response.usage;
                    match parse::parse_entries(&response.text) {
                        Ok(entries) => {
                            outcome.results = validate_entries(task, &comment_ids, entries);
                            return Ok(outcome);
                        }
                        Err(error) => {
                            last_raw = response.text;
                            error
                        }
                    }
                }
                Err(error) => error,
            };

            match self.retry.decide(error.kind, retries) {
                RetryDecision::Abort => {
                    tracing::error!(
                        task_id = %task.id,
                        adapter = self.adapter.name(),
                        error = %error,
                        "model call failed fatally"
                    );
                    return Err(CoreError::from(error).for_task(&task.id));
                }
                RetryDecision::GiveUp => {
                    tracing::warn!(
                        task_id = %task.id,
                        attempts = outcome.model_calls,
                        error = %error,
                        "retries exhausted, marking batch as failed"
                    );
                    outcome.results = fail_all(&comment_ids, &last_raw, &error, outcome.model_calls);
                    return Ok(outcome);
                }
                RetryDecision::Retry(delay) => {
                    if cancel.is_cancelled() {
                        return Err(CoreError::new(
                            CoreErrorKind::Cancelled,
                            "run cancelled while waiting to retry a batch",
                        )
                        .for_task(&task.id));
                    }
                    tracing::warn!(
                        task_id = %task.id,
                        attempt = outcome.model_calls,
                        kind = error.kind.as_str(),
                        delay_ms = delay.as_millis() as u64,
                        "retrying model call"
                    );
                    self.retry.sleep(delay);
                    retries += 1;
                }
            }
        }
    }
}

impl std::fmt::Debug for TaskExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskExecutor")
            .field("compiler", &self.compiler)
            .field("adapter", &self.adapter.name())
            .field("retry", &self.retry)
            .finish()
    }
}

fn validate_entries(
    task: &TaskConfig,
    comment_ids: &[String],
    entries: Vec<parse::ResponseEntry>,
) -> Vec<(String, TaskResult)> {
    let mut assignment = parse::assign(comment_ids, entries);
    for (claimed, corrected) in &assignment.corrected {
        tracing::warn!(
            task_id = %task.id,
            claimed = %claimed,
            comment_id = %corrected,
            "matched misspelled comment id"
        );
    }
    if assignment.ignored > 0 {
        tracing::debug!(
            task_id = %task.id,
            ignored = assignment.ignored,
            "ignored response entries"
        );
    }

    comment_ids
        .iter()
        .map(|id| {
            let result = match assignment.entries.remove(id) {
                Some(entry) => validate_entry(task, &entry),
                None => TaskResult::failed("", "model response did not include this comment"),
            };
            if let Some(error) = &result.error {
                tracing::warn!(task_id = %task.id, comment_id = %id, error = %error, "record failed");
            }
            (id.clone(), result)
        })
        .collect()
}

fn validate_entry(task: &TaskConfig, entry: &parse::ResponseEntry) -> TaskResult {
    let confidence = match &entry.confidence {
        None | Some(Value::Null) => 1.0,
        Some(value) => match value.as_f64() {
            Some(confidence) if (0.0..=1.0).contains(&confidence) => confidence,
            _ => {
                return TaskResult::failed(
                    entry.raw.clone(),
                    format!("confidence {value} is not a number between 0 and 1"),
                );
            }
        },
    };

    match registry::check_value(task, &entry.value) {
        Ok(value) => TaskResult::ok(value, confidence, entry.raw.clone()),
        Err(error) => TaskResult::failed(entry.raw.clone(), error.message),
    }
}

fn fail_all(
    comment_ids: &[String],
    raw: &str,
    error: &ModelError,
    attempts: u32,
) -> Vec<(String, TaskResult)> {
    let message = format!("model call failed after {attempts} attempt(s): {error}");
    comment_ids
        .iter()
        .map(|id| (id.clone(), TaskResult::failed(raw, message.clone())))
        .collect()
}
