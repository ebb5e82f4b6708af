use std::collections::HashMap;

use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use crate::adapters::{AdapterResult, GenerateRequest, ModelAdapter, ModelResponse};
use crate::models::TaskKind;

/// Deterministic, cost-free backend. Every value is derived from a hash of
/// `task_id/comment_id`, so repeated runs answer identically.
#[derive(Clone, Debug, Default)]
pub struct OfflineModelAdapter {
    overrides: HashMap<String, Value>,
}

impl OfflineModelAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `value` for `comment_id` regardless of the task, including
    /// values the task contract would reject.
    pub fn with_value(mut self, comment_id: impl Into<String>, value: Value) -> Self {
        self.overrides.insert(comment_id.into(), value);
        self
    }

    fn entry(&self, kind: &TaskKind, task_id: &str, comment_id: &str) -> Value {
        let seed = seed(task_id, comment_id);
        let confidence = 0.5 + (seed % 50) as f64 / 100.0;
        let value = match self.overrides.get(comment_id) {
            Some(value) => value.clone(),
            None => synthesize(kind, comment_id, seed),
        };
        json!({
            "comment_id": comment_id,
            "value": value,
            "confidence": confidence,
        })
    }
}

impl ModelAdapter for OfflineModelAdapter {
    fn name(&self) -> &str {
        "offline"
    }

    fn generate(&self, request: &GenerateRequest<'_>) -> AdapterResult<ModelResponse> {
        let entries: Vec<Value> = request
            .comment_ids
            .iter()
            .map(|id| self.entry(&request.task.kind, &request.task.id, id))
            .collect();
        Ok(ModelResponse::new(Value::Array(entries).to_string()))
    }
}

fn seed(task_id: &str, comment_id: &str) -> u64 {
    let digest = Sha256::digest(format!("{task_id}/{comment_id}").as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

fn pick(labels: &[String], seed: u64) -> Value {
    if labels.is_empty() {
        return Value::Null;
    }
    let index = (seed % labels.len() as u64) as usize;
    Value::String(labels[index].clone())
}

fn synthesize(kind: &TaskKind, comment_id: &str, seed: u64) -> Value {
    match kind {
        TaskKind::BinaryClassification { labels } => pick(labels, seed),
        TaskKind::MultiClass { labels } => pick(labels, seed),
        TaskKind::MultiLabel { labels, .. } => match pick(labels, seed) {
            Value::Null => json!([]),
            label => json!([label]),
        },
        TaskKind::Scoring { scale } => {
            let span = scale.max - scale.min;
            let offset = (seed % 1000) as f64 / 1000.0 - 0.5;
            let score = scale.min + span * (0.5 + offset * 0.5);
            json!((score * 100.0).round() / 100.0)
        }
        TaskKind::Translation { target_language } => {
            json!(format!("[{target_language}] {comment_id}"))
        }
        TaskKind::LanguageDetection => json!("en"),
    }
}
