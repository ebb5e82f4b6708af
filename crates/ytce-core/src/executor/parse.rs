use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::models::{ModelError, ModelErrorKind};

/// Largest edit distance at which an unknown id is matched to a missing one.
const MAX_ID_EDIT_DISTANCE: usize = 2;

/// One element of the model's answer array, keyed by the id it claims.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ResponseEntry {
    pub comment_id: String,
    pub value: Value,
    pub confidence: Option<Value>,
    pub raw: String,
}

/// Entries assigned to batch ids, plus the corrections made on the way.
#[derive(Debug, Default)]
pub(crate) struct Assignment {
    pub entries: HashMap<String, ResponseEntry>,
    pub corrected: Vec<(String, String)>,
    pub ignored: usize,
}

/// Extracts the array of result objects from raw model text.
pub(crate) fn parse_entries(text: &str) -> Result<Vec<ResponseEntry>, ModelError> {
    let body = strip_code_fence(text.trim());
    let document = parse_lenient(body)
        .or_else(|| outermost_array(body).and_then(parse_lenient))
        .ok_or_else(|| invalid("response is not valid JSON"))?;

    let items = match document {
        Value::Array(items) => items,
        Value::Object(mut object) => match object.remove("results") {
            Some(Value::Array(items)) => items,
            _ => return Err(invalid("response object has no \"results\" array")),
        },
        _ => return Err(invalid("response is neither a JSON array nor an object")),
    };

    Ok(items.into_iter().filter_map(entry_from_value).collect())
}

/// Maps entries onto `expected` ids. The first entry for an id wins; entries
/// naming unknown ids are matched to the closest still-missing id within a
/// small edit distance, unless two candidates tie for closest.
pub(crate) fn assign(expected: &[String], parsed: Vec<ResponseEntry>) -> Assignment {
    let expected_set: HashSet<&str> = expected.iter().map(String::as_str).collect();
    let mut assignment = Assignment::default();
    let mut unknown = Vec::new();

    for entry in parsed {
        if !expected_set.contains(entry.comment_id.as_str()) {
            unknown.push(entry);
        } else if assignment.entries.contains_key(&entry.comment_id) {
            assignment.ignored += 1;
        } else {
            assignment.entries.insert(entry.comment_id.clone(), entry);
        }
    }

    for entry in unknown {
        match closest_missing(&entry.comment_id, expected, &assignment.entries) {
            Some(id) => {
                assignment
                    .corrected
                    .push((entry.comment_id.clone(), id.clone()));
                assignment.entries.insert(id, entry);
            }
            None => assignment.ignored += 1,
        }
    }

    assignment
}

fn closest_missing(
    claimed: &str,
    expected: &[String],
    assigned: &HashMap<String, ResponseEntry>,
) -> Option<String> {
    let mut best: Option<(&String, usize)> = None;
    let mut tied = false;
    for id in expected.iter().filter(|id| !assigned.contains_key(*id)) {
        let distance = strsim::levenshtein(claimed, id);
        if distance > MAX_ID_EDIT_DISTANCE {
            continue;
        }
        match best {
            Some((_, best_distance)) if distance > best_distance => {}
            Some((_, best_distance)) if distance == best_distance => tied = true,
            _ => {
                best = Some((id, distance));
                tied = false;
            }
        }
    }
    best.filter(|_| !tied).map(|(id, _)| id.clone())
}

fn entry_from_value(item: Value) -> Option<ResponseEntry> {
    let raw = item.to_string();
    let Value::Object(mut object) = item else {
        return None;
    };
    let comment_id = match object.remove("comment_id")? {
        Value::String(id) => id.trim().to_string(),
        Value::Number(number) => number.to_string(),
        _ => return None,
    };
    Some(ResponseEntry {
        comment_id,
        value: object.remove("value").unwrap_or(Value::Null),
        confidence: object.remove("confidence"),
        raw,
    })
}

fn parse_lenient(body: &str) -> Option<Value> {
    serde_json::from_str(body)
        .ok()
        .or_else(|| serde_json::from_str(&remove_trailing_commas(body)).ok())
}

fn invalid(message: &str) -> ModelError {
    ModelError::new(ModelErrorKind::InvalidResponse, message)
}

/// Unwraps a single ```json ... ``` block when the whole answer is fenced.
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    rest.trim_end()
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}

fn outermost_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (start < end).then(|| &text[start..=end])
}

/// Drops commas that directly precede `]` or `}` outside string literals.
pub(crate) fn remove_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut output = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (index, &ch) in chars.iter().enumerate() {
        if in_string {
            output.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        if ch == '"' {
            in_string = true;
        } else if ch == ',' {
            let next = chars[index + 1..].iter().find(|next| !next.is_whitespace());
            if matches!(next, Some(']') | Some('}')) {
                continue;
            }
        }
        output.push(ch);
    }
    output
}
