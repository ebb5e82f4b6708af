use serde_json::json;
use ytce_core::models::{
    Comment, CoreErrorKind, JobSpec, ResultValue, TaskDefinition, TaskKind, TaskType,
};
use ytce_core::registry::{self, check_value, validate, validate_job};

fn assert_config_error(definition: TaskDefinition, field_hint: &str) {
    let error = validate(&definition).unwrap_err();
    assert_eq!(error.kind, CoreErrorKind::Config, "{definition:?}");
    assert!(
        error.message.contains(field_hint),
        "expected '{field_hint}' in '{}'",
        error.message
    );
}

fn sentiment() -> TaskDefinition {
    TaskDefinition::new("sentiment", TaskType::MultiClass, "What is the sentiment?")
        .labels(["positive", "neutral", "negative"])
}

#[test]
fn every_task_type_has_a_contract() {
    for task_type in TaskType::ALL {
        assert_eq!(registry::contract(task_type).task_type, task_type);
    }
    assert_eq!(registry::contracts().len(), TaskType::ALL.len());
}

#[test]
fn well_formed_definitions_validate() {
    let definitions = vec![
        TaskDefinition::new("spam", TaskType::BinaryClassification, "Spam?").labels(["yes", "no"]),
        sentiment(),
        TaskDefinition::new("topics", TaskType::MultiLabel, "Topics?")
            .labels(["price", "quality", "delivery"])
            .max_labels(2),
        TaskDefinition::new("toxicity", TaskType::Scoring, "How toxic?").scale(0.0, 1.0),
        TaskDefinition::new("ru", TaskType::Translation, "Translate").target_language("Russian"),
        TaskDefinition::new("lang", TaskType::LanguageDetection, "Which language?"),
    ];

    for definition in definitions {
        let task = validate(&definition).unwrap();
        assert_eq!(task.id, definition.id);
        assert_eq!(task.task_type().as_str(), definition.task_type);
    }
}

#[test]
fn binary_classification_requires_exactly_two_labels() {
    assert_config_error(
        TaskDefinition::new("spam", TaskType::BinaryClassification, "Spam?")
            .labels(["yes", "no", "maybe"]),
        "exactly 2 labels",
    );
    assert_config_error(
        TaskDefinition::new("spam", TaskType::BinaryClassification, "Spam?").labels(["yes"]),
        "exactly 2 labels",
    );
    assert_config_error(
        TaskDefinition::new("spam", TaskType::BinaryClassification, "Spam?"),
        "requires labels",
    );
}

#[test]
fn multi_class_requires_at_least_three_labels() {
    assert_config_error(
        TaskDefinition::new("sentiment", TaskType::MultiClass, "Sentiment?")
            .labels(["positive", "negative"]),
        "at least 3 labels",
    );
}

#[test]
fn multi_label_max_labels_must_fit_label_count() {
    let base = || {
        TaskDefinition::new("topics", TaskType::MultiLabel, "Topics?")
            .labels(["price", "quality", "delivery"])
    };
    assert_config_error(base().max_labels(0), "max_labels");
    assert_config_error(base().max_labels(4), "max_labels");
    assert_config_error(
        TaskDefinition::new("topics", TaskType::MultiLabel, "Topics?"),
        "requires labels",
    );

    let task = validate(&base().max_labels(3)).unwrap();
    assert_eq!(
        task.kind,
        TaskKind::MultiLabel {
            labels: vec!["price".into(), "quality".into(), "delivery".into()],
            max_labels: Some(3),
        }
    );
}

#[test]
fn scoring_requires_ordered_finite_scale() {
    assert_config_error(
        TaskDefinition::new("score", TaskType::Scoring, "Score?").scale(5.0, 5.0),
        "min must be < max",
    );
    assert_config_error(
        TaskDefinition::new("score", TaskType::Scoring, "Score?").scale(10.0, 1.0),
        "min must be < max",
    );
    assert_config_error(
        TaskDefinition::new("score", TaskType::Scoring, "Score?").scale(0.0, f64::INFINITY),
        "finite",
    );
    assert_config_error(
        TaskDefinition::new("score", TaskType::Scoring, "Score?"),
        "scale",
    );

    let mut three_bounds = TaskDefinition::new("score", TaskType::Scoring, "Score?");
    three_bounds.scale = Some(vec![1.0, 2.0, 3.0]);
    assert_config_error(three_bounds, "exactly 2 bounds");
}

#[test]
fn translation_requires_target_language() {
    assert_config_error(
        TaskDefinition::new("tr", TaskType::Translation, "Translate"),
        "target_language",
    );
    assert_config_error(
        TaskDefinition::new("tr", TaskType::Translation, "Translate").target_language("   "),
        "target_language",
    );
}

#[test]
fn labels_must_be_unique_and_non_empty() {
    assert_config_error(
        TaskDefinition::new("sentiment", TaskType::MultiClass, "Sentiment?")
            .labels(["positive", "neutral", " positive "]),
        "duplicate label",
    );
    assert_config_error(
        TaskDefinition::new("sentiment", TaskType::MultiClass, "Sentiment?")
            .labels(["positive", "", "negative"]),
        "non-empty",
    );
}

#[test]
fn common_fields_are_required() {
    assert_config_error(
        TaskDefinition::new("", TaskType::LanguageDetection, "Which language?"),
        "id",
    );
    assert_config_error(
        TaskDefinition::new("lang", TaskType::LanguageDetection, "   "),
        "question",
    );

    let mut unknown = TaskDefinition::new("lang", TaskType::LanguageDetection, "Which language?");
    unknown.task_type = "summarization".to_string();
    assert_config_error(unknown, "unknown task type");
}

#[test]
fn fields_irrelevant_to_the_type_are_ignored() {
    let definition = TaskDefinition::new("lang", TaskType::LanguageDetection, "Which language?")
        .labels(["a", "b"])
        .scale(1.0, 2.0);
    let task = validate(&definition).unwrap();
    assert_eq!(task.kind, TaskKind::LanguageDetection);
}

#[test]
fn job_validation_rejects_duplicates_and_empty_records() {
    let comments = vec![Comment::new("1", "great"), Comment::new("2", "bad")];

    let empty_job = JobSpec::default();
    assert_eq!(
        validate_job(&empty_job, &comments).unwrap_err().kind,
        CoreErrorKind::Config
    );

    let duplicate_tasks = JobSpec {
        tasks: vec![sentiment(), sentiment()],
        ..JobSpec::default()
    };
    assert!(
        validate_job(&duplicate_tasks, &comments)
            .unwrap_err()
            .message
            .contains("duplicate task id")
    );

    let job = JobSpec {
        tasks: vec![sentiment()],
        ..JobSpec::default()
    };
    let duplicate_records = vec![Comment::new("1", "great"), Comment::new("1", "again")];
    let error = validate_job(&job, &duplicate_records).unwrap_err();
    assert_eq!(error.kind, CoreErrorKind::Config);
    assert_eq!(error.comment.as_deref(), Some("1"));

    let blank_text = vec![Comment::new("1", "  ")];
    assert_eq!(
        validate_job(&job, &blank_text).unwrap_err().kind,
        CoreErrorKind::Config
    );
}

#[test]
fn job_context_is_attached_to_every_task() {
    let job = JobSpec {
        tasks: vec![
            sentiment(),
            TaskDefinition::new("lang", TaskType::LanguageDetection, "Which language?"),
        ],
        custom_prompt: Some("  Comments under a product launch video.\n".to_string()),
        input: None,
    };
    let tasks = validate_job(&job, &[Comment::new("1", "hi")]).unwrap();
    for task in tasks {
        assert_eq!(
            task.custom_prompt.as_deref(),
            Some("  Comments under a product launch video.\n")
        );
    }
}

#[test]
fn blank_job_context_is_dropped() {
    let job = JobSpec {
        tasks: vec![sentiment()],
        custom_prompt: Some(" \n\t".to_string()),
        input: None,
    };
    let tasks = validate_job(&job, &[Comment::new("1", "hi")]).unwrap();
    assert!(tasks[0].custom_prompt.is_none());
}

#[test]
fn value_checks_follow_the_task_contract() {
    let sentiment = validate(&sentiment()).unwrap();
    assert_eq!(
        check_value(&sentiment, &json!(" neutral ")).unwrap(),
        ResultValue::Text("neutral".to_string())
    );
    assert_eq!(
        check_value(&sentiment, &json!("mixed")).unwrap_err().kind,
        CoreErrorKind::Validation
    );

    let topics = validate(
        &TaskDefinition::new("topics", TaskType::MultiLabel, "Topics?")
            .labels(["price", "quality", "delivery"])
            .max_labels(2),
    )
    .unwrap();
    assert!(check_value(&topics, &json!(["price", "quality", "delivery"])).is_err());
    assert_eq!(
        check_value(&topics, &json!([])).unwrap(),
        ResultValue::Labels(Vec::new())
    );

    let score = validate(&TaskDefinition::new("score", TaskType::Scoring, "Score?").scale(1.0, 5.0))
        .unwrap();
    assert_eq!(check_value(&score, &json!(3)).unwrap(), ResultValue::Number(3.0));
    assert!(check_value(&score, &json!(5.5)).is_err());
    assert!(check_value(&score, &json!("4")).is_err());

    let translation = validate(
        &TaskDefinition::new("tr", TaskType::Translation, "Translate").target_language("de"),
    )
    .unwrap();
    assert!(check_value(&translation, &json!("")).is_err());

    let language = validate(&TaskDefinition::new(
        "lang",
        TaskType::LanguageDetection,
        "Which language?",
    ))
    .unwrap();
    assert_eq!(
        check_value(&language, &json!("EN")).unwrap(),
        ResultValue::Text("en".to_string())
    );
    assert!(check_value(&language, &json!("english")).is_err());
}
