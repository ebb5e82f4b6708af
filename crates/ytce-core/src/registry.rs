use std::collections::HashSet;

use serde_json::Value;

use crate::models::{
    Comment, CoreError, CoreErrorKind, JobSpec, ResultValue, ScoreScale, TaskConfig,
    TaskDefinition, TaskKind, TaskType,
};

pub type RegistryResult<T> = Result<T, CoreError>;

pub type ConfigValidator = fn(&TaskDefinition) -> RegistryResult<TaskKind>;

/// Checks one raw model value against a validated task and normalizes it.
pub type ValueChecker = fn(&TaskKind, &Value) -> RegistryResult<ResultValue>;

pub struct TaskContract {
    pub task_type: TaskType,
    pub required_fields: &'static [&'static str],
    pub value_shape: &'static str,
    pub validate_config: ConfigValidator,
    pub check_value: ValueChecker,
}

const CONTRACTS: [TaskContract; 6] = [
    TaskContract {
        task_type: TaskType::BinaryClassification,
        required_fields: &["labels"],
        value_shape: "one of the 2 labels",
        validate_config: validate_binary,
        check_value: check_single_label,
    },
    TaskContract {
        task_type: TaskType::MultiClass,
        required_fields: &["labels"],
        value_shape: "one label",
        validate_config: validate_multi_class,
        check_value: check_single_label,
    },
    TaskContract {
        task_type: TaskType::MultiLabel,
        required_fields: &["labels"],
        value_shape: "ordered set of labels",
        validate_config: validate_multi_label,
        check_value: check_label_set,
    },
    TaskContract {
        task_type: TaskType::Scoring,
        required_fields: &["scale"],
        value_shape: "number within scale",
        validate_config: validate_scoring,
        check_value: check_score,
    },
    TaskContract {
        task_type: TaskType::Translation,
        required_fields: &["target_language"],
        value_shape: "non-empty string",
        validate_config: validate_translation,
        check_value: check_translation,
    },
    TaskContract {
        task_type: TaskType::LanguageDetection,
        required_fields: &[],
        value_shape: "ISO 639 language code",
        validate_config: validate_language_detection,
        check_value: check_language_code,
    },
];

pub fn contracts() -> &'static [TaskContract] {
    &CONTRACTS
}

pub fn contract(task_type: TaskType) -> &'static TaskContract {
    match task_type {
        TaskType::BinaryClassification => &CONTRACTS[0],
        TaskType::MultiClass => &CONTRACTS[1],
        TaskType::MultiLabel => &CONTRACTS[2],
        TaskType::Scoring => &CONTRACTS[3],
        TaskType::Translation => &CONTRACTS[4],
        TaskType::LanguageDetection => &CONTRACTS[5],
    }
}

pub fn value_validator(task_type: TaskType) -> ValueChecker {
    contract(task_type).check_value
}

/// Validates one raw task definition into a `TaskConfig`.
pub fn validate(definition: &TaskDefinition) -> RegistryResult<TaskConfig> {
    let id = definition.id.trim();
    if id.is_empty() {
        return Err(CoreError::config(None, "each task must have a non-empty 'id'"));
    }

    let task_type: TaskType = definition.task_type.parse().map_err(|_| {
        field_error(
            id,
            "type",
            format!("unknown task type '{}'", definition.task_type),
        )
    })?;

    if definition.question.trim().is_empty() {
        return Err(field_error(id, "question", "must not be empty"));
    }

    let kind = (contract(task_type).validate_config)(definition)?;
    warn_ignored_fields(definition, task_type);

    Ok(TaskConfig {
        id: id.to_string(),
        question: definition.question.trim().to_string(),
        kind,
        custom_prompt: None,
    })
}

/// Validates the whole job against the records it will run over.
///
/// Runs before any model call; every violation is a `Config` error.
pub fn validate_job(job: &JobSpec, comments: &[Comment]) -> RegistryResult<Vec<TaskConfig>> {
    if job.tasks.is_empty() {
        return Err(CoreError::config(None, "job must define at least one task"));
    }

    let mut task_ids = HashSet::new();
    let mut tasks = Vec::with_capacity(job.tasks.len());
    for definition in &job.tasks {
        let mut task = validate(definition)?;
        if !task_ids.insert(task.id.clone()) {
            return Err(CoreError::config(
                Some(&task.id),
                format!("duplicate task id '{}'", task.id),
            ));
        }
        task.custom_prompt = job.shared_context().map(str::to_string);
        tasks.push(task);
    }

    validate_comments(comments)?;
    Ok(tasks)
}

pub fn validate_comments(comments: &[Comment]) -> RegistryResult<()> {
    let mut seen = HashSet::with_capacity(comments.len());
    for comment in comments {
        if comment.id.trim().is_empty() {
            return Err(CoreError::config(None, "record with empty id in input"));
        }
        if !seen.insert(comment.id.as_str()) {
            return Err(CoreError {
                task: None,
                comment: Some(comment.id.clone()),
                kind: CoreErrorKind::Config,
                message: format!("duplicate record id '{}' in input", comment.id),
            });
        }
        if comment.text.trim().is_empty() {
            return Err(CoreError {
                task: None,
                comment: Some(comment.id.clone()),
                kind: CoreErrorKind::Config,
                message: format!("record '{}' has empty text", comment.id),
            });
        }
    }
    Ok(())
}

pub fn check_value(task: &TaskConfig, raw: &Value) -> RegistryResult<ResultValue> {
    value_validator(task.task_type())(&task.kind, raw)
}

fn validate_binary(definition: &TaskDefinition) -> RegistryResult<TaskKind> {
    let labels = required_labels(definition)?;
    match <[String; 2]>::try_from(labels) {
        Ok(labels) => Ok(TaskKind::BinaryClassification { labels }),
        Err(labels) => Err(field_error(
            &definition.id,
            "labels",
            format!(
                "binary_classification requires exactly 2 labels, got {}",
                labels.len()
            ),
        )),
    }
}

fn validate_multi_class(definition: &TaskDefinition) -> RegistryResult<TaskKind> {
    let labels = required_labels(definition)?;
    if labels.len() < 3 {
        return Err(field_error(
            &definition.id,
            "labels",
            format!(
                "multi_class requires at least 3 labels, got {}",
                labels.len()
            ),
        ));
    }
    Ok(TaskKind::MultiClass { labels })
}

fn validate_multi_label(definition: &TaskDefinition) -> RegistryResult<TaskKind> {
    let labels = required_labels(definition)?;
    let max_labels = match definition.max_labels {
        None => None,
        Some(max) if max >= 1 && (max as usize) <= labels.len() => Some(max as usize),
        Some(max) => {
            return Err(field_error(
                &definition.id,
                "max_labels",
                format!(
                    "must be between 1 and {} (number of labels), got {max}",
                    labels.len()
                ),
            ));
        }
    };
    Ok(TaskKind::MultiLabel { labels, max_labels })
}

fn validate_scoring(definition: &TaskDefinition) -> RegistryResult<TaskKind> {
    let Some(scale) = definition.scale.as_deref() else {
        return Err(field_error(
            &definition.id,
            "scale",
            "scoring requires scale: [min, max]",
        ));
    };
    let [min, max] = scale else {
        return Err(field_error(
            &definition.id,
            "scale",
            format!("expected exactly 2 bounds, got {}", scale.len()),
        ));
    };
    if !min.is_finite() || !max.is_finite() {
        return Err(field_error(
            &definition.id,
            "scale",
            "bounds must be finite numbers",
        ));
    }
    if min >= max {
        return Err(field_error(
            &definition.id,
            "scale",
            format!("min must be < max, got [{min}, {max}]"),
        ));
    }
    Ok(TaskKind::Scoring {
        scale: ScoreScale {
            min: *min,
            max: *max,
        },
    })
}

fn validate_translation(definition: &TaskDefinition) -> RegistryResult<TaskKind> {
    match definition.target_language.as_deref().map(str::trim) {
        Some(target) if !target.is_empty() => Ok(TaskKind::Translation {
            target_language: target.to_string(),
        }),
        _ => Err(field_error(
            &definition.id,
            "target_language",
            "translation requires a non-empty target_language (e.g. 'Russian' or 'ru')",
        )),
    }
}

fn validate_language_detection(_definition: &TaskDefinition) -> RegistryResult<TaskKind> {
    Ok(TaskKind::LanguageDetection)
}

fn required_labels(definition: &TaskDefinition) -> RegistryResult<Vec<String>> {
    let Some(raw) = definition.labels.as_ref() else {
        return Err(field_error(
            &definition.id,
            "labels",
            format!("{} requires labels", definition.task_type),
        ));
    };

    let mut seen = HashSet::new();
    let mut labels = Vec::with_capacity(raw.len());
    for label in raw {
        let label = label.trim();
        if label.is_empty() {
            return Err(field_error(
                &definition.id,
                "labels",
                "labels must be non-empty strings",
            ));
        }
        if !seen.insert(label) {
            return Err(field_error(
                &definition.id,
                "labels",
                format!("duplicate label '{label}'"),
            ));
        }
        labels.push(label.to_string());
    }
    Ok(labels)
}

fn warn_ignored_fields(definition: &TaskDefinition, task_type: TaskType) {
    let present = [
        ("labels", definition.labels.is_some()),
        ("max_labels", definition.max_labels.is_some()),
        ("scale", definition.scale.is_some()),
        ("target_language", definition.target_language.is_some()),
    ];
    let used: &[&str] = match task_type {
        TaskType::BinaryClassification | TaskType::MultiClass => &["labels"],
        TaskType::MultiLabel => &["labels", "max_labels"],
        TaskType::Scoring => &["scale"],
        TaskType::Translation => &["target_language"],
        TaskType::LanguageDetection => &[],
    };

    for (field, is_present) in present {
        if is_present && !used.contains(&field) {
            tracing::warn!(
                task_id = %definition.id,
                task_type = task_type.as_str(),
                field,
                "field is not used by this task type and will be ignored"
            );
        }
    }
}

fn check_single_label(kind: &TaskKind, raw: &Value) -> RegistryResult<ResultValue> {
    let Some(value) = raw.as_str() else {
        return Err(validation_error(format!(
            "expected a label string, got {}",
            json_type_name(raw)
        )));
    };
    let value = value.trim();
    if kind.labels().iter().any(|label| label == value) {
        Ok(ResultValue::Text(value.to_string()))
    } else {
        Err(validation_error(format!(
            "value '{value}' not in allowed labels {:?}",
            kind.labels()
        )))
    }
}

fn check_label_set(kind: &TaskKind, raw: &Value) -> RegistryResult<ResultValue> {
    let Some(items) = raw.as_array() else {
        return Err(validation_error(format!(
            "expected an array of labels, got {}",
            json_type_name(raw)
        )));
    };

    let mut selected: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let Some(label) = item.as_str().map(str::trim) else {
            return Err(validation_error("multi-label values must all be strings"));
        };
        if !kind.labels().iter().any(|allowed| allowed == label) {
            return Err(validation_error(format!(
                "value '{label}' not in allowed labels {:?}",
                kind.labels()
            )));
        }
        if !selected.iter().any(|existing| existing == label) {
            selected.push(label.to_string());
        }
    }

    if let TaskKind::MultiLabel {
        max_labels: Some(max),
        ..
    } = kind
        && selected.len() > *max
    {
        return Err(validation_error(format!(
            "too many labels: {} > {max}",
            selected.len()
        )));
    }

    Ok(ResultValue::Labels(selected))
}

fn check_score(kind: &TaskKind, raw: &Value) -> RegistryResult<ResultValue> {
    let Some(score) = raw.as_f64().filter(|score| score.is_finite()) else {
        return Err(validation_error(format!(
            "expected a number, got {}",
            json_type_name(raw)
        )));
    };
    if let TaskKind::Scoring { scale } = kind
        && !scale.contains(score)
    {
        return Err(validation_error(format!(
            "score {score} outside allowed range [{}, {}]",
            scale.min, scale.max
        )));
    }
    Ok(ResultValue::Number(score))
}

fn check_translation(_kind: &TaskKind, raw: &Value) -> RegistryResult<ResultValue> {
    match raw.as_str() {
        Some(text) if !text.trim().is_empty() => Ok(ResultValue::Text(text.to_string())),
        Some(_) => Err(validation_error("translation value must not be empty")),
        None => Err(validation_error(format!(
            "expected translated text, got {}",
            json_type_name(raw)
        ))),
    }
}

fn check_language_code(_kind: &TaskKind, raw: &Value) -> RegistryResult<ResultValue> {
    let Some(code) = raw.as_str() else {
        return Err(validation_error(format!(
            "expected an ISO 639 code string, got {}",
            json_type_name(raw)
        )));
    };
    let code = code.trim().to_ascii_lowercase();
    if (2..=3).contains(&code.len()) && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(ResultValue::Text(code))
    } else {
        Err(validation_error(format!(
            "'{code}' is not an ISO 639-1/639-2 language code"
        )))
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn field_error(task_id: &str, field: &str, message: impl AsRef<str>) -> CoreError {
    CoreError::config(
        Some(task_id),
        format!("task '{task_id}': field '{field}' {}", message.as_ref()),
    )
}

fn validation_error(message: impl Into<String>) -> CoreError {
    CoreError::new(CoreErrorKind::Validation, message)
}
