use crate::models::{TaskConfig, TaskKind};

pub(crate) fn task_instruction(task: &TaskConfig) -> String {
    match &task.kind {
        TaskKind::BinaryClassification { labels: [first, second] } => format!(
            "You are analyzing comments and need to classify each one into exactly one of two categories: \"{first}\" or \"{second}\".\n\n\
             For each comment, determine which category it belongs to based on the question: \"{question}\"\n\n\
             You must choose exactly one label for each comment.",
            question = task.question,
        ),
        TaskKind::MultiClass { labels } => format!(
            "You are analyzing comments and need to classify each one into exactly one category.\n\n\
             Question: {question}\n\n\
             Available categories: {labels}\n\n\
             For each comment, determine which single category it belongs to. You must choose exactly one label for each comment.",
            question = task.question,
            labels = quoted_list(labels),
        ),
        TaskKind::MultiLabel { labels, max_labels } => {
            let limit = max_labels
                .map(|max| format!(" You can select up to {max} labels per comment."))
                .unwrap_or_default();
            format!(
                "You are analyzing comments and need to identify which topics/categories apply to each comment.\n\n\
                 Question: {question}\n\n\
                 Available labels: {labels}\n\n\
                 For each comment, select all labels that apply.{limit} A comment can have zero, one, or multiple labels.",
                question = task.question,
                labels = quoted_list(labels),
            )
        }
        TaskKind::Scoring { scale } => format!(
            "You are analyzing comments and need to assign a numeric score to each one.\n\n\
             Question: {question}\n\n\
             Score range: {min} to {max} (inclusive)\n\n\
             For each comment, assign a score between {min} and {max} that reflects your assessment. Use the full range appropriately.",
            question = task.question,
            min = scale.min,
            max = scale.max,
        ),
        TaskKind::Translation { target_language } => format!(
            "You are translating comments into the target language: \"{target_language}\".\n\n\
             For each comment:\n\
             - Preserve meaning, tone, and intent.\n\
             - Preserve emojis, punctuation, and formatting where reasonable.\n\
             - Preserve proper nouns, product names, and usernames.\n\
             - Do not add explanations or commentary; output ONLY the translation text.\n\
             - If the comment is already in \"{target_language}\", return it unchanged.\n\
             - If the comment contains multiple languages, translate all content into \"{target_language}\" (keep names/handles as-is).\n\n\
             Additional guidance: \"{question}\"",
            question = task.question,
        ),
        TaskKind::LanguageDetection => format!(
            "You are analyzing comments to detect the primary language of each comment.\n\n\
             Question: {question}\n\n\
             For each comment, identify the primary language and return its ISO 639-1 or ISO 639-2 language code \
             (e.g., \"en\" for English, \"ru\" for Russian, \"es\" for Spanish).\n\n\
             Important:\n\
             - Use standard ISO 639 language codes (2-letter codes preferred, 3-letter codes acceptable)\n\
             - If a comment contains multiple languages, identify the primary/dominant language\n\
             - If a comment has no clear language (emojis, symbols), use \"und\" (undetermined)\n\
             - Return the language code in lowercase (e.g., \"en\", not \"EN\")",
            question = task.question,
        ),
    }
}

pub(crate) fn quoted_list(labels: &[String]) -> String {
    labels
        .iter()
        .map(|label| format!("\"{label}\""))
        .collect::<Vec<_>>()
        .join(", ")
}
