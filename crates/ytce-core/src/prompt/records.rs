use std::fmt::Write as _;

use crate::models::Comment;

/// Share of the window, measured from its end, in which a word boundary
/// may be used as the cut point.
const WORD_BOUNDARY_WINDOW: f64 = 0.2;
const ELLIPSIS: &str = "...";

/// Cuts `text` to at most `max_chars` characters, preferring a word boundary
/// near the end of the window. Returns `None` when no cut is needed.
pub(crate) fn truncate(text: &str, max_chars: usize) -> Option<String> {
    let (cut_byte, _) = text.char_indices().nth(max_chars)?;
    let window = &text[..cut_byte];

    let earliest = ((max_chars as f64) * (1.0 - WORD_BOUNDARY_WINDOW)).floor() as usize;
    let boundary = window
        .char_indices()
        .enumerate()
        .filter(|(position, (_, ch))| *position >= earliest && ch.is_whitespace())
        .map(|(_, (byte, _))| byte)
        .last();

    let kept = match boundary {
        Some(byte) => window[..byte].trim_end(),
        None => window,
    };
    Some(format!("{kept}{ELLIPSIS}"))
}

pub(crate) fn render(batch: &[Comment], max_chars: Option<usize>) -> String {
    let mut truncated = 0usize;
    let mut body = String::new();

    for (index, comment) in batch.iter().enumerate() {
        let text = match max_chars.and_then(|limit| truncate(&comment.text, limit)) {
            Some(short) => {
                truncated += 1;
                short
            }
            None => comment.text.clone(),
        };
        let text = text.replace('\n', "\n   ");
        let _ = writeln!(body, "{}. ID: {}\n   Text: {text}\n", index + 1, comment.id);
    }

    if truncated == 0 {
        return body;
    }
    let limit = max_chars.unwrap_or_default();
    format!(
        "Note: {truncated} comment(s) exceeded {limit} characters and were truncated (marked with \"{ELLIPSIS}\").\n\n{body}"
    )
}
