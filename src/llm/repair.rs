//! Tolerant parsing of model summary responses.
//!
//! Models wrap JSON in prose or code fences, truncate mid-string, and
//! leave values unquoted. Parsing escalates through repair stages and
//! stops at the first success; only when every stage fails does the
//! caller count the generation as failed.

use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::models::SummaryPayload;

static FENCE_PATTERN: OnceLock<Regex> = OnceLock::new();
static KEY_PATTERN: OnceLock<Regex> = OnceLock::new();
static BARE_VALUE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn fence_pattern() -> &'static Regex {
    FENCE_PATTERN.get_or_init(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").unwrap())
}

fn key_pattern() -> &'static Regex {
    KEY_PATTERN.get_or_init(|| Regex::new(r#""(\w+)":"#).unwrap())
}

fn bare_value_pattern() -> &'static Regex {
    BARE_VALUE_PATTERN
        .get_or_init(|| Regex::new(r#""([^"]+)":\s*([A-Za-z\p{Han}][^",}\]]*)"#).unwrap())
}

/// Parse a model response into a summary payload, repairing as needed.
pub fn parse_summary_response(raw: &str) -> Option<SummaryPayload> {
    let candidate = extract_candidate(raw)?;

    // Stage 1: direct parse.
    if let Ok(payload) = serde_json::from_str(&candidate) {
        return Some(payload);
    }

    // Stage 2: truncation repair.
    let repaired = repair_truncation(&candidate);
    if let Ok(payload) = serde_json::from_str(&repaired) {
        debug!("summary response parsed after truncation repair");
        return Some(payload);
    }

    // Stage 3: quote bare values.
    let quoted = quote_bare_values(&candidate);
    if let Ok(payload) = serde_json::from_str(&quoted) {
        debug!("summary response parsed after quoting bare values");
        return Some(payload);
    }

    // Stage 4: both repairs combined, most permissive.
    let combined = repair_truncation(&quoted);
    match serde_json::from_str(&combined) {
        Ok(payload) => {
            debug!("summary response parsed after combined repair");
            Some(payload)
        }
        Err(e) => {
            debug!(error = %e, "summary response unparseable after all repairs");
            None
        }
    }
}

/// Pull the JSON candidate out of the response: a fenced ```json block
/// if present, else the outermost braced substring.
fn extract_candidate(raw: &str) -> Option<String> {
    if let Some(cap) = fence_pattern().captures(raw) {
        return Some(cap[1].trim().to_string());
    }

    let start = raw.find('{')?;
    let end = raw.rfind('}');
    match end {
        Some(end) if end > start => Some(raw[start..=end].trim().to_string()),
        // No closing brace at all: take from the first brace and let the
        // truncation repair close it.
        _ => Some(raw[start..].trim().to_string()),
    }
}

/// Quote/escape-aware bracket balance of a JSON fragment.
fn scan_balance(input: &str) -> (i32, i32, bool) {
    let mut open_braces: i32 = 0;
    let mut open_brackets: i32 = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for ch in input.chars() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => open_braces += 1,
            '}' if !in_string => open_braces -= 1,
            '[' if !in_string => open_brackets += 1,
            ']' if !in_string => open_brackets -= 1,
            _ => {}
        }
    }

    (open_braces, open_brackets, in_string)
}

fn push_field(fixed: &mut String, field: &str) {
    if !fixed.trim_end().ends_with('{') {
        fixed.push(',');
    }
    fixed.push_str(field);
}

/// Close open strings, drop dangling fields, balance brackets, and
/// backfill required keys.
fn repair_truncation(input: &str) -> String {
    let mut fixed = input.trim_end().to_string();

    let (_, _, in_string) = scan_balance(&fixed);

    // Truncated inside a string: cut back to the opening quote.
    if in_string {
        if let Some(pos) = fixed.rfind('"') {
            fixed.truncate(pos);
        }
    }

    // Drop a dangling key or trailing comma left by the cut.
    while fixed.ends_with(char::is_whitespace) {
        fixed.pop();
    }
    if fixed.ends_with(':') {
        match fixed.rfind(',') {
            Some(pos) => fixed.truncate(pos),
            None => {
                if let Some(pos) = fixed.find('{') {
                    fixed.truncate(pos + 1);
                }
            }
        }
    }
    if fixed.ends_with(',') {
        fixed.pop();
    }

    let (mut open_braces, mut open_brackets, _) = scan_balance(&fixed);

    while open_brackets > 0 {
        fixed.push(']');
        open_brackets -= 1;
    }

    // Only a cut-off object needs closing; backfill the required keys
    // the model never got to emit.
    if open_braces > 0 {
        let present: Vec<String> = key_pattern()
            .captures_iter(&fixed)
            .map(|cap| cap[1].to_string())
            .collect();

        if !present.iter().any(|k| k == "factors") {
            push_field(&mut fixed, r#""factors":[]"#);
        }
        if !present.iter().any(|k| k == "key_concepts") {
            push_field(&mut fixed, r#""key_concepts":[]"#);
        }
        if !present.iter().any(|k| k == "summary") {
            push_field(&mut fixed, r#""summary":"""#);
        }

        while open_braces > 0 {
            fixed.push('}');
            open_braces -= 1;
        }
    }

    fixed
}

/// Quote bare word values the model left unquoted.
fn quote_bare_values(input: &str) -> String {
    bare_value_pattern()
        .replace_all(input, r#""$1": "$2""#)
        .into_owned()
}
