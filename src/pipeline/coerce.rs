//! Reply coercion: turn the model's free text into an [`ExtractionResult`].
//!
//! The prompt asks for a bare JSON object, but models routinely wrap it in a
//! ```` ```json ```` fence, prepend a sentence, or append an explanation.
//! Coercion runs in three passes, stopping at the first that yields an
//! object:
//!
//! 1. strip an outer code fence and parse what is left;
//! 2. scan the reply for balanced `{…}` spans (string- and escape-aware) and
//!    take the first that parses and carries at least one extraction key; a
//!    rejected span is skipped whole, so an object nested inside a broken
//!    reply is never mistaken for the reply;
//! 3. give up with [`StageError::ResponseParse`].
//!
//! Once an object is found, missing or `null` keys fall back to `""` /
//! `false`, so the record is always complete.

use crate::error::StageError;
use crate::output::ExtractionResult;
use crate::prompts::EXTRACTION_KEYS;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static RE_FENCE_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^```[A-Za-z0-9_+-]*").unwrap());
static RE_FENCE_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```\s*$").unwrap());

/// Longest reply excerpt quoted in a parse error.
const PREVIEW_CHARS: usize = 80;

/// Coerce a raw model reply into a complete extraction record.
pub fn coerce_reply(reply: &str) -> Result<ExtractionResult, StageError> {
    let object = find_json_object(reply).ok_or_else(|| StageError::ResponseParse {
        detail: format!("no JSON object in model reply: {:?}", preview(reply)),
    })?;
    Ok(fields_from_object(&object))
}

/// Locate the first JSON object in `reply`.
pub fn find_json_object(reply: &str) -> Option<Map<String, Value>> {
    let unfenced = strip_code_fence(reply);
    if let Some(obj) = parse_object(unfenced) {
        return Some(obj);
    }
    scan_for_object(reply)
}

fn strip_code_fence(input: &str) -> &str {
    let s = input.trim();
    let s = match RE_FENCE_OPEN.find(s) {
        Some(m) => &s[m.end()..],
        None => s,
    };
    let s = match RE_FENCE_CLOSE.find(s) {
        Some(m) => &s[..m.start()],
        None => s,
    };
    s.trim()
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// First balanced `{…}` span in `text` that parses to an object with at
/// least one of [`EXTRACTION_KEYS`].
///
/// Braces inside JSON string literals are ignored. A balanced span that is
/// rejected is skipped up to its closing brace; an unclosed `{` is skipped
/// on its own.
fn scan_for_object(text: &str) -> Option<Map<String, Value>> {
    let mut rest = text;
    while let Some(start) = rest.find('{') {
        let candidate = &rest[start..];
        match closing_brace(candidate) {
            Some(end) => {
                let found = parse_object(&candidate[..end]).filter(has_extraction_key);
                if found.is_some() {
                    return found;
                }
                rest = &candidate[end..];
            }
            None => rest = &candidate[1..],
        }
    }
    None
}

fn has_extraction_key(obj: &Map<String, Value>) -> bool {
    EXTRACTION_KEYS.iter().any(|k| obj.contains_key(*k))
}

/// Byte length of the balanced object starting at `text[0] == '{'`.
fn closing_brace(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn fields_from_object(obj: &Map<String, Value>) -> ExtractionResult {
    let [bank_key, name_key, address_key, date_key] = EXTRACTION_KEYS;
    ExtractionResult::from_fields(
        flag(obj.get(bank_key)),
        text(obj.get(name_key)),
        text(obj.get(address_key)),
        text(obj.get(date_key)),
    )
}

fn flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes"),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    }
}

fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn preview(reply: &str) -> String {
    let trimmed = reply.trim();
    if trimmed.chars().count() > PREVIEW_CHARS {
        let head: String = trimmed.chars().take(PREVIEW_CHARS).collect();
        format!("{head}…")
    } else {
        trimmed.to_string()
    }
}
