//! Tolerant parsing of oracle output into findings.
//!
//! Models wrap JSON in markdown fences, add prose before or after it, or nest
//! the array under an object key. Prose may itself contain bracketed text
//! such as `[p-1]` or `[1, 2]`. Candidates are gathered from:
//!
//! 1. the whole text
//! 2. the first fenced code block
//! 3. every complete top-level JSON value embedded in the text
//!
//! Each candidate that reads as a findings array is validated element by
//! element, and the one yielding the most conformant findings wins. Ties go
//! to the earlier candidate.

use billscope_core::{ImpactDirection, ImpactFinding, Severity};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

/// Keys under which an object may wrap the findings array.
const WRAPPER_KEYS: &[&str] = &["findings", "impacts", "results", "items"];

const IMPACT_KEYS: &[&str] = &["impact", "impactDirection", "impact_direction", "direction"];
const CHUNK_ID_KEYS: &[&str] = &["source_chunk_id", "sourceChunkId", "chunk_id", "chunkId"];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("response was empty")]
    Empty,
    #[error("no JSON array of findings found in response (starts with: {0:?})")]
    NoFindingsArray(String),
}

/// Conformant findings plus a count of dropped elements.
#[derive(Debug)]
pub struct ParsedFindings {
    pub findings: Vec<ImpactFinding>,
    pub dropped: usize,
}

/// One candidate array after per-element validation.
struct Attempt {
    findings: Vec<ImpactFinding>,
    rejected: Vec<(usize, String)>,
}

/// Parse a raw oracle response into findings.
pub fn parse_findings(text: &str) -> Result<ParsedFindings, ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut best: Option<Attempt> = None;
    for candidate in candidates(trimmed) {
        let Some(elements) = serde_json::from_str::<Value>(candidate)
            .ok()
            .and_then(findings_array)
        else {
            continue;
        };
        let attempt = validate(elements);
        if best
            .as_ref()
            .is_none_or(|b| attempt.findings.len() > b.findings.len())
        {
            best = Some(attempt);
        }
    }

    let best = best.ok_or_else(|| {
        ParseError::NoFindingsArray(trimmed.chars().take(80).collect())
    })?;
    for (index, reason) in &best.rejected {
        warn!(index, %reason, "dropping non-conformant oracle finding");
    }

    Ok(ParsedFindings {
        dropped: best.rejected.len(),
        findings: best.findings,
    })
}

fn candidates(text: &str) -> Vec<&str> {
    let mut out = vec![text];
    out.extend(fenced_block(text));
    out.extend(embedded_values(text));
    out
}

/// Contents of the first ``` fenced block, skipping an optional language tag.
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    let content_start = after_fence.find('\n').map(|nl| nl + 1).unwrap_or(0);
    let content = &after_fence[content_start..];
    let end = content.find("```")?;
    Some(content[..end].trim())
}

/// Every complete JSON array or object in `text`, in order of appearance.
///
/// Scanning resumes after the end of each value found, so values nested in
/// an earlier match are not reported separately.
fn embedded_values(text: &str) -> Vec<&str> {
    let mut values = Vec::new();
    let mut pos = 0;
    while let Some(offset) = text[pos..].find(['[', '{']) {
        let start = pos + offset;
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(_)) => {
                let end = start + stream.byte_offset();
                values.push(&text[start..end]);
                pos = end;
            }
            _ => pos = start + 1,
        }
    }
    debug!(count = values.len(), "embedded JSON values");
    values
}

/// Interpret a JSON value as an array of finding candidates.
fn findings_array(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => {
            for key in WRAPPER_KEYS {
                if let Some(Value::Array(items)) = map.remove(*key) {
                    return Some(items);
                }
            }
            if map.contains_key("title") && map.contains_key("category") {
                return Some(vec![Value::Object(map)]);
            }
            let mut arrays = map.into_iter().filter_map(|(_, v)| match v {
                Value::Array(items) => Some(items),
                _ => None,
            });
            match (arrays.next(), arrays.next()) {
                (Some(items), None) => Some(items),
                _ => None,
            }
        }
        _ => None,
    }
}

fn validate(elements: Vec<Value>) -> Attempt {
    let mut attempt = Attempt {
        findings: Vec::with_capacity(elements.len()),
        rejected: Vec::new(),
    };
    for (index, element) in elements.into_iter().enumerate() {
        match convert_element(element) {
            Ok(finding) => attempt.findings.push(finding),
            Err(reason) => attempt.rejected.push((index, reason)),
        }
    }
    attempt
}

fn convert_element(element: Value) -> Result<ImpactFinding, String> {
    let mut map = match element {
        Value::Object(map) => map,
        other => return Err(format!("expected an object, got {other}")),
    };

    let category = required(&mut map, &["category"])?;
    let title = required(&mut map, &["title"])?;
    let impact: ImpactDirection = required(&mut map, IMPACT_KEYS)?
        .parse()
        .map_err(|e| format!("{e}"))?;
    let severity: Severity = required(&mut map, &["severity"])?
        .parse()
        .map_err(|e| format!("{e}"))?;
    let description = match map.remove("description") {
        Some(Value::String(s)) => s.trim().to_string(),
        _ => return Err("missing field `description`".to_string()),
    };
    let source_chunk_id = CHUNK_ID_KEYS
        .iter()
        .find_map(|key| map.remove(*key).and_then(normalize_chunk_id));

    Ok(ImpactFinding {
        category,
        impact,
        severity,
        title,
        description,
        details: normalize_details(map.remove("details")),
        source_chunk_id,
        citation: None,
    })
}

/// First non-blank string stored under any of `keys`, trimmed.
fn required(map: &mut Map<String, Value>, keys: &[&str]) -> Result<String, String> {
    keys.iter()
        .find_map(|key| match map.remove(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        })
        .ok_or_else(|| format!("missing or blank field `{}`", keys[0]))
}

fn normalize_details(details: Option<Value>) -> Vec<String> {
    match details {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

/// Chunk ids arrive as `"p-3"`, `"[p-3]"`, or occasionally a bare number.
fn normalize_chunk_id(id: Value) -> Option<String> {
    let id = match id {
        Value::String(s) => s,
        Value::Number(n) => format!("p-{n}"),
        _ => return None,
    };
    let id = id.trim().trim_start_matches('[').trim_end_matches(']').trim();
    (!id.is_empty()).then(|| id.to_string())
}
