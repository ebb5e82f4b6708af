use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    BinaryClassification,
    MultiClass,
    MultiLabel,
    Scoring,
    Translation,
    LanguageDetection,
}

impl TaskType {
    pub const ALL: [TaskType; 6] = [
        TaskType::BinaryClassification,
        TaskType::MultiClass,
        TaskType::MultiLabel,
        TaskType::Scoring,
        TaskType::Translation,
        TaskType::LanguageDetection,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::BinaryClassification => "binary_classification",
            Self::MultiClass => "multi_class",
            Self::MultiLabel => "multi_label",
            Self::Scoring => "scoring",
            Self::Translation => "translation",
            Self::LanguageDetection => "language_detection",
        }
    }
}

impl std::str::FromStr for TaskType {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|task_type| task_type.as_str() == value)
            .ok_or(())
    }
}

/// Task entry exactly as written in a job file, before contract validation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub id: String,
    #[serde(rename = "type")]
    pub task_type: String,
    #[serde(default)]
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_labels: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,
}

impl TaskDefinition {
    pub fn new(id: impl Into<String>, task_type: TaskType, question: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            task_type: task_type.as_str().to_string(),
            question: question.into(),
            ..Self::default()
        }
    }

    pub fn labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    pub fn max_labels(mut self, max_labels: i64) -> Self {
        self.max_labels = Some(max_labels);
        self
    }

    pub fn scale(mut self, min: f64, max: f64) -> Self {
        self.scale = Some(vec![min, max]);
        self
    }

    pub fn target_language(mut self, target_language: impl Into<String>) -> Self {
        self.target_language = Some(target_language.into());
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoreScale {
    pub min: f64,
    pub max: f64,
}

impl ScoreScale {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TaskKind {
    BinaryClassification { labels: [String; 2] },
    MultiClass { labels: Vec<String> },
    MultiLabel { labels: Vec<String>, max_labels: Option<usize> },
    Scoring { scale: ScoreScale },
    Translation { target_language: String },
    LanguageDetection,
}

impl TaskKind {
    pub fn task_type(&self) -> TaskType {
        match self {
            Self::BinaryClassification { .. } => TaskType::BinaryClassification,
            Self::MultiClass { .. } => TaskType::MultiClass,
            Self::MultiLabel { .. } => TaskType::MultiLabel,
            Self::Scoring { .. } => TaskType::Scoring,
            Self::Translation { .. } => TaskType::Translation,
            Self::LanguageDetection => TaskType::LanguageDetection,
        }
    }

    pub fn labels(&self) -> &[String] {
        match self {
            Self::BinaryClassification { labels } => labels,
            Self::MultiClass { labels } | Self::MultiLabel { labels, .. } => labels,
            _ => &[],
        }
    }
}

/// A task that passed contract validation. Only produced by the registry.
#[derive(Clone, Debug, PartialEq)]
pub struct TaskConfig {
    pub id: String,
    pub question: String,
    pub kind: TaskKind,
    pub custom_prompt: Option<String>,
}

impl TaskConfig {
    pub fn task_type(&self) -> TaskType {
        self.kind.task_type()
    }
}
