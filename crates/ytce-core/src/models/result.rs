use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{Comment, TaskConfig};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultValue {
    Text(String),
    Labels(Vec<String>),
    Number(f64),
}

impl ResultValue {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Text(text) => serde_json::Value::String(text.clone()),
            Self::Labels(labels) => serde_json::Value::from(labels.clone()),
            Self::Number(number) => serde_json::Value::from(*number),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Ok,
    Failed,
}

impl ResultStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for ResultStatus {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ok" => Ok(Self::Ok),
            "failed" => Ok(Self::Failed),
            _ => Err(()),
        }
    }
}

/// Outcome of one task for one record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub value: Option<ResultValue>,
    pub confidence: f64,
    pub raw_response: String,
    pub status: ResultStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskResult {
    pub fn ok(value: ResultValue, confidence: f64, raw_response: impl Into<String>) -> Self {
        Self {
            value: Some(value),
            confidence,
            raw_response: raw_response.into(),
            status: ResultStatus::Ok,
            error: None,
        }
    }

    pub fn failed(raw_response: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            value: None,
            confidence: 0.0,
            raw_response: raw_response.into(),
            status: ResultStatus::Failed,
            error: Some(error.into()),
        }
    }

    /// Slot for a record that no batch ever produced a result for.
    pub fn missing() -> Self {
        Self::failed("", "no result was produced for this record")
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResultStatus::Ok
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnrichedComment {
    pub comment: Comment,
    pub results: BTreeMap<String, TaskResult>,
}

impl EnrichedComment {
    pub fn result(&self, task_id: &str) -> Option<&TaskResult> {
        self.results.get(task_id)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisResult {
    pub records: Vec<EnrichedComment>,
    pub tasks: Vec<TaskConfig>,
}

impl AnalysisResult {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, comment_id: &str) -> Option<&EnrichedComment> {
        self.records
            .iter()
            .find(|record| record.comment.id == comment_id)
    }
}
