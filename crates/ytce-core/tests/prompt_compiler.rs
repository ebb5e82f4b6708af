use ytce_core::models::{Comment, CoreErrorKind, TaskConfig, TaskDefinition, TaskType};
use ytce_core::prompt::{MAX_BATCH_RECORDS, PROMPT_VERSION, PromptCompiler, compile};
use ytce_core::registry::validate;

fn task(definition: TaskDefinition) -> TaskConfig {
    validate(&definition).unwrap()
}

fn batch(count: usize) -> Vec<Comment> {
    (1..=count)
        .map(|n| Comment::new(format!("c{n}"), format!("comment number {n}")))
        .collect()
}

fn all_tasks() -> Vec<TaskConfig> {
    vec![
        task(
            TaskDefinition::new("spam", TaskType::BinaryClassification, "Is this spam?")
                .labels(["spam", "not_spam"]),
        ),
        task(
            TaskDefinition::new("sentiment", TaskType::MultiClass, "What is the sentiment?")
                .labels(["positive", "neutral", "negative"]),
        ),
        task(
            TaskDefinition::new("topics", TaskType::MultiLabel, "Which topics are discussed?")
                .labels(["price", "quality", "delivery"])
                .max_labels(2),
        ),
        task(TaskDefinition::new("toxicity", TaskType::Scoring, "How toxic is it?").scale(1.0, 10.0)),
        task(
            TaskDefinition::new("to_ru", TaskType::Translation, "Keep slang natural")
                .target_language("Russian"),
        ),
        task(TaskDefinition::new("lang", TaskType::LanguageDetection, "Which language?")),
    ]
}

#[test]
fn compiling_twice_is_byte_identical() {
    let records = batch(7);
    for task in all_tasks() {
        let first = compile(&task, &records, Some("Shared context")).unwrap();
        let second = compile(&task, &records, Some("Shared context")).unwrap();
        assert_eq!(first, second, "task {}", task.id);
    }
}

#[test]
fn prompt_embeds_question_ids_schema_and_context() {
    let records = batch(3);
    for task in all_tasks() {
        let prompt = compile(&task, &records, Some("Video about budget phones.")).unwrap();

        assert!(prompt.contains(&format!("prompt version {PROMPT_VERSION}")));
        assert!(prompt.contains(&task.question), "task {}", task.id);
        assert!(prompt.contains("## Context\nVideo about budget phones."));
        assert!(prompt.contains("## Output Format"));
        assert!(prompt.contains("\"comment_id\""));
        for record in &records {
            assert!(prompt.contains(&format!("ID: {}", record.id)));
            assert!(prompt.contains(&record.text));
        }
        for label in task.kind.labels() {
            assert!(prompt.contains(&format!("\"{label}\"")));
        }
    }
}

#[test]
fn sections_appear_in_order() {
    let task = &all_tasks()[1];
    let prompt = compile(task, &batch(2), Some("context")).unwrap();
    let positions: Vec<usize> = [
        "## Context",
        "## Task",
        "## Comments to Analyze",
        "## Output Format",
        "## Instructions",
    ]
    .iter()
    .map(|heading| prompt.find(heading).unwrap())
    .collect();
    assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn different_batches_produce_different_prompts() {
    let task = &all_tasks()[0];
    let first = compile(task, &batch(2), None).unwrap();
    let second = compile(task, &batch(3), None).unwrap();
    assert_ne!(first, second);
}

#[test]
fn oversized_batch_is_a_config_error() {
    let task = &all_tasks()[0];
    assert!(compile(task, &batch(MAX_BATCH_RECORDS), None).is_ok());

    let error = compile(task, &batch(MAX_BATCH_RECORDS + 1), None).unwrap_err();
    assert_eq!(error.kind, CoreErrorKind::Config);
    assert_eq!(error.task.as_deref(), Some("spam"));
}

#[test]
fn empty_batch_is_rejected() {
    let task = &all_tasks()[0];
    assert_eq!(
        compile(task, &[], None).unwrap_err().kind,
        CoreErrorKind::Config
    );
}

#[test]
fn long_records_are_truncated_with_a_note() {
    let task = &all_tasks()[5];
    let long_text = "lorem ipsum ".repeat(50);
    let records = vec![
        Comment::new("short", "fine as is"),
        Comment::new("long", long_text.clone()),
    ];
    let prompt = PromptCompiler::new(Some(100)).compile(task, &records, None).unwrap();

    assert!(prompt.contains("1 comment(s) exceeded 100 characters"));
    assert!(prompt.contains("fine as is"));
    assert!(!prompt.contains(long_text.trim_end()));
    assert!(prompt.contains("lorem ipsum..."));

    let untouched = PromptCompiler::new(None).compile(task, &records, None).unwrap();
    assert!(untouched.contains(long_text.trim_end()));
}

#[test]
fn context_is_embedded_verbatim() {
    let task = &all_tasks()[1];
    let context = "  Indented note\n  - keep this bullet  ";
    let prompt = compile(task, &batch(1), Some(context)).unwrap();
    assert!(prompt.contains(&format!("## Context\n{context}\n\n## Task")));
}
