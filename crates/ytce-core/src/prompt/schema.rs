use crate::models::{TaskConfig, TaskKind};
use crate::prompt::templates::quoted_list;

const ENTRY_HEADER: &str = "The output must be a JSON array where each element is an object with:\n\
- \"comment_id\": string (the ID of the comment, copied exactly)";
const CONFIDENCE_LINE: &str = "- \"confidence\": number (optional, between 0.0 and 1.0)";

/// Describes the JSON array the model must return for `task`.
pub(crate) fn output_format(task: &TaskConfig) -> String {
    let (value_line, example) = match &task.kind {
        TaskKind::BinaryClassification { labels: [first, second] } => (
            format!("- \"value\": string (must be exactly one of: \"{first}\" or \"{second}\")"),
            example_rows(&[format!("\"{first}\""), format!("\"{second}\"")]),
        ),
        TaskKind::MultiClass { labels } => (
            format!(
                "- \"value\": string (must be exactly one of: {})",
                quoted_list(labels)
            ),
            example_rows(&[
                format!("\"{}\"", label_at(labels, 0)),
                format!("\"{}\"", label_at(labels, 1)),
            ]),
        ),
        TaskKind::MultiLabel { labels, max_labels } => {
            let limit = max_labels
                .map(|max| format!(" (maximum {max} labels)"))
                .unwrap_or_default();
            let (first, second) = (label_at(labels, 0), label_at(labels, 1));
            (
                format!(
                    "- \"value\": array of strings (each string must be one of: {}){limit}",
                    quoted_list(labels)
                ),
                example_rows(&[
                    format!("[\"{first}\"]"),
                    format!("[\"{first}\", \"{second}\"]"),
                ]),
            )
        }
        TaskKind::Scoring { scale } => {
            let span = scale.max - scale.min;
            (
                format!(
                    "- \"value\": number (must be between {} and {}, inclusive)",
                    scale.min, scale.max
                ),
                example_rows(&[
                    format!("{:.2}", scale.min + span * 0.7),
                    format!("{:.2}", scale.min + span * 0.3),
                ]),
            )
        }
        TaskKind::Translation { target_language } => (
            format!("- \"value\": string (the comment text translated into \"{target_language}\")"),
            example_rows(&[
                "\"<translation of comment_1>\"".to_string(),
                "\"<translation of comment_2>\"".to_string(),
            ]),
        ),
        TaskKind::LanguageDetection => (
            "- \"value\": string (ISO 639-1 or ISO 639-2 language code, or \"und\" if undetermined)"
                .to_string(),
            example_rows(&["\"en\"".to_string(), "\"und\"".to_string()]),
        ),
    };

    format!("{ENTRY_HEADER}\n{value_line}\n{CONFIDENCE_LINE}\n\nExample:\n{example}")
}

fn label_at(labels: &[String], index: usize) -> &str {
    labels
        .get(index)
        .or_else(|| labels.first())
        .map_or("label", String::as_str)
}

fn example_rows(values: &[String]) -> String {
    let rows: Vec<String> = values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            format!(
                "  {{\"comment_id\": \"comment_{}\", \"value\": {value}, \"confidence\": 0.9}}",
                index + 1
            )
        })
        .collect();
    format!("[\n{}\n]", rows.join(",\n"))
}
