use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde_json::{Map, Value};

use crate::models::{AnalysisResult, Comment, EnrichedComment, TaskConfig, TaskResult};

pub const ID_COLUMN: &str = "id";
pub const TEXT_COLUMN: &str = "text";

/// Collects per-task results keyed by comment id; arrival order does not
/// matter.
#[derive(Clone, Debug, Default)]
pub struct ResultMerger {
    by_task: HashMap<String, HashMap<String, TaskResult>>,
}

impl ResultMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, task_id: &str, comment_id: impl Into<String>, result: TaskResult) {
        self.by_task
            .entry(task_id.to_string())
            .or_default()
            .insert(comment_id.into(), result);
    }

    pub fn extend<I>(&mut self, task_id: &str, results: I)
    where
        I: IntoIterator<Item = (String, TaskResult)>,
    {
        self.by_task
            .entry(task_id.to_string())
            .or_default()
            .extend(results);
    }

    /// One enriched record per input record, in input order. Slots no batch
    /// filled are marked failed.
    pub fn finish(mut self, comments: Vec<Comment>, tasks: Vec<TaskConfig>) -> AnalysisResult {
        let records = comments
            .into_iter()
            .map(|comment| {
                let results: BTreeMap<String, TaskResult> = tasks
                    .iter()
                    .map(|task| {
                        let result = self
                            .by_task
                            .get_mut(&task.id)
                            .and_then(|results| results.remove(&comment.id))
                            .unwrap_or_else(TaskResult::missing);
                        (task.id.clone(), result)
                    })
                    .collect();
                EnrichedComment { comment, results }
            })
            .collect();
        AnalysisResult { records, tasks }
    }
}

pub fn value_column(task_id: &str) -> String {
    format!("{task_id}_value")
}

pub fn confidence_column(task_id: &str) -> String {
    format!("{task_id}_confidence")
}

/// Column order for tabular writers: id, text, every metadata key seen,
/// then value and confidence per task in job order.
pub fn tabular_columns(result: &AnalysisResult) -> Vec<String> {
    let metadata: BTreeSet<&str> = result
        .records
        .iter()
        .flat_map(|record| record.comment.metadata.keys())
        .map(String::as_str)
        .filter(|key| !is_reserved(result, key))
        .collect();

    let mut columns = vec![ID_COLUMN.to_string(), TEXT_COLUMN.to_string()];
    columns.extend(metadata.into_iter().map(str::to_string));
    for task in &result.tasks {
        columns.push(value_column(&task.id));
        columns.push(confidence_column(&task.id));
    }
    columns
}

/// Projects every record to a flat row: original fields plus
/// `{task_id}_value` and `{task_id}_confidence` per task. Failed results
/// project a null value.
pub fn tabular_rows(result: &AnalysisResult) -> Vec<Map<String, Value>> {
    result
        .records
        .iter()
        .map(|record| {
            let mut row = Map::new();
            for (key, value) in &record.comment.metadata {
                if !is_reserved(result, key) {
                    row.insert(key.clone(), value.clone());
                }
            }
            row.insert(ID_COLUMN.to_string(), Value::String(record.comment.id.clone()));
            row.insert(TEXT_COLUMN.to_string(), Value::String(record.comment.text.clone()));

            for task in &result.tasks {
                let (value, confidence) = match record.result(&task.id) {
                    Some(task_result) => (
                        task_result
                            .value
                            .as_ref()
                            .map_or(Value::Null, |value| value.to_json()),
                        Value::from(task_result.confidence),
                    ),
                    None => (Value::Null, Value::from(0.0)),
                };
                row.insert(value_column(&task.id), value);
                row.insert(confidence_column(&task.id), confidence);
            }
            row
        })
        .collect()
}

fn is_reserved(result: &AnalysisResult, key: &str) -> bool {
    key == ID_COLUMN
        || key == TEXT_COLUMN
        || result
            .tasks
            .iter()
            .any(|task| key == value_column(&task.id) || key == confidence_column(&task.id))
}
