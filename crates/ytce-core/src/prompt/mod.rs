mod records;
mod schema;
mod templates;

use crate::config::DEFAULT_MAX_COMMENT_CHARS;
use crate::models::{Comment, CoreError, TaskConfig, TaskKind};

pub const PROMPT_VERSION: &str = "1.0";

/// Largest batch a single prompt may carry.
pub const MAX_BATCH_RECORDS: usize = 100;

pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2000;

const TRANSLATION_TOKENS_PER_WORD: u64 = 3;
const TRANSLATION_TOKENS_PER_RECORD: u64 = 50;
const TRANSLATION_TOKENS_BASE: u64 = 500;
const TRANSLATION_MIN_TOKENS: u64 = 4000;
const TRANSLATION_MAX_TOKENS: u64 = 16000;

pub type PromptResult<T> = Result<T, CoreError>;

/// Builds the request text for one task over one batch. Output depends only
/// on the arguments, so the same inputs always produce the same string.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PromptCompiler {
    max_comment_chars: Option<usize>,
}

impl Default for PromptCompiler {
    fn default() -> Self {
        Self::new(Some(DEFAULT_MAX_COMMENT_CHARS))
    }
}

impl PromptCompiler {
    pub fn new(max_comment_chars: Option<usize>) -> Self {
        Self { max_comment_chars }
    }

    pub fn compile(
        &self,
        task: &TaskConfig,
        batch: &[Comment],
        shared_context: Option<&str>,
    ) -> PromptResult<String> {
        if batch.is_empty() {
            return Err(CoreError::config(
                Some(&task.id),
                "cannot compile a prompt for an empty batch",
            ));
        }
        if batch.len() > MAX_BATCH_RECORDS {
            return Err(CoreError::config(
                Some(&task.id),
                format!(
                    "batch of {} records exceeds the per-prompt maximum of {MAX_BATCH_RECORDS}",
                    batch.len()
                ),
            ));
        }

        let mut sections = vec![format!(
            "# Comment Analysis Task (prompt version {PROMPT_VERSION})"
        )];
        if let Some(context) = shared_context
            && !context.trim().is_empty()
        {
            sections.push(format!("## Context\n{context}"));
        }
        sections.push(format!("## Task\n{}", templates::task_instruction(task)));
        sections.push(format!(
            "## Comments to Analyze\n{}",
            records::render(batch, self.max_comment_chars).trim_end()
        ));
        sections.push(format!("## Output Format\n{}", schema::output_format(task)));
        sections.push(format!("## Instructions\n{}", instructions(batch.len())));

        let mut prompt = sections.join("\n\n");
        prompt.push('\n');
        Ok(prompt)
    }
}

/// Compiles with the default record truncation.
pub fn compile(
    task: &TaskConfig,
    batch: &[Comment],
    shared_context: Option<&str>,
) -> PromptResult<String> {
    PromptCompiler::default().compile(task, batch, shared_context)
}

/// Output budget for one call. Translations grow with the batch's word count.
pub fn max_output_tokens(task: &TaskConfig, batch: &[Comment]) -> u32 {
    if !matches!(task.kind, TaskKind::Translation { .. }) {
        return DEFAULT_MAX_OUTPUT_TOKENS;
    }
    let words: u64 = batch
        .iter()
        .map(|comment| comment.text.split_whitespace().count() as u64)
        .sum();
    let estimate = words * TRANSLATION_TOKENS_PER_WORD
        + batch.len() as u64 * TRANSLATION_TOKENS_PER_RECORD
        + TRANSLATION_TOKENS_BASE;
    let clamped = estimate.clamp(TRANSLATION_MIN_TOKENS, TRANSLATION_MAX_TOKENS);
    u32::try_from(clamped).unwrap_or(u32::MAX)
}

fn instructions(count: usize) -> String {
    format!(
        "- Return exactly one result for each of the {count} comments above.\n\
         - Copy every \"comment_id\" exactly as shown in the ID field.\n\
         - Every \"value\" must follow the output format above; do not invent labels.\n\
         - Return ONLY the JSON array. Do not wrap it in markdown or add commentary."
    )
}
