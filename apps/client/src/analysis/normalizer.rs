use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;

use super::fences::strip_json_fences;
use super::record::AnalysisRecord;

/// Keys that mark an object as the score object, in score precedence order.
pub const SCORE_KEYS: [&str; 4] = ["final_ats_score", "ATS_Score", "ats_score", "ATS_score"];

/// Resume sections reported as present unless the payload says otherwise.
pub const KNOWN_SECTIONS: [&str; 6] = [
    "contact",
    "education",
    "experience",
    "skills",
    "projects",
    "certifications",
];

const MAX_DEPTH: usize = 32;
const MAX_VISITED: usize = 10_000;

const SKILL_GROUPS: [&str; 2] = ["skills", "keywords"];
const EXPERIENCE_FEEDBACK_KEYS: [&str; 3] = ["feedback", "suggestions", "experience_suggestion"];
const FORMATTING_FEEDBACK_KEYS: [&str; 2] = ["feedback", "suggestions"];
const SUGGESTION_KEYS: [&str; 2] = ["suggestions", "recommendations"];

/// Locates the score object anywhere inside `payload` and extracts a fully
/// defaulted record from it. `None` when no score object exists.
pub fn normalize(payload: &Value) -> Option<AnalysisRecord> {
    let mut walker = Walker::default();
    let node = walker.find(payload, 0);
    if node.is_none() {
        debug!(visited = walker.visited, "no score object in payload");
    }
    node.map(|node| extract(&node))
}

#[derive(Default)]
struct Walker {
    visited: usize,
}

impl Walker {
    /// Depth-first, document order, first match wins. Strings are unwrapped
    /// (fences stripped, parsed) and searched like any other node.
    fn find(&mut self, value: &Value, depth: usize) -> Option<Map<String, Value>> {
        if depth > MAX_DEPTH || self.visited >= MAX_VISITED {
            return None;
        }
        self.visited += 1;

        match value {
            Value::Object(map) if is_score_object(map) => Some(map.clone()),
            Value::Object(map) => map.values().find_map(|v| self.find(v, depth + 1)),
            Value::Array(items) => items.iter().find_map(|v| self.find(v, depth + 1)),
            Value::String(text) => {
                let inner = strip_json_fences(text);
                if !inner.starts_with(['{', '[', '"']) {
                    return None;
                }
                let parsed: Value = serde_json::from_str(inner).ok()?;
                self.find(&parsed, depth + 1)
            }
            _ => None,
        }
    }
}

fn is_score_object(map: &Map<String, Value>) -> bool {
    SCORE_KEYS.iter().any(|key| map.contains_key(*key))
}

fn extract(node: &Map<String, Value>) -> AnalysisRecord {
    let score = SCORE_KEYS
        .iter()
        .find_map(|key| node.get(*key).and_then(as_number))
        .unwrap_or(0.0)
        .clamp(0.0, 100.0);

    let breakdown: BTreeMap<String, f64> = node
        .get("score_breakdown")
        .and_then(Value::as_object)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|(k, v)| as_number(v).map(|n| (k.clone(), n)))
                .collect()
        })
        .unwrap_or_default();

    AnalysisRecord {
        score,
        breakdown,
        matched_skills: merged_list(node, "matched"),
        weak_skills: merged_list(node, "weak"),
        missing_skills: merged_list(node, "missing"),
        sections: extract_sections(node.get("sections")),
        experience_feedback: first_populated_in(node.get("experience"), &EXPERIENCE_FEEDBACK_KEYS),
        formatting_feedback: first_populated_in(node.get("formatting"), &FORMATTING_FEEDBACK_KEYS),
        suggestions: first_populated(node, &SUGGESTION_KEYS),
    }
}

/// Finite number, or a string holding one.
fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Union of `bucket` across every skill group, first occurrence order kept.
fn merged_list(node: &Map<String, Value>, bucket: &str) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    for group in SKILL_GROUPS {
        let Some(items) = node
            .get(group)
            .and_then(Value::as_object)
            .and_then(|g| g.get(bucket))
        else {
            continue;
        };
        for item in string_items(items) {
            if !merged.contains(&item) {
                merged.push(item);
            }
        }
    }
    merged
}

fn string_items(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(item_text).collect(),
        other => item_text(other).into_iter().collect(),
    }
}

fn item_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Object(map) => map.get("name")?.as_str()?.trim().to_string(),
        Value::Null | Value::Array(_) => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn first_populated(node: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .filter_map(|key| node.get(*key))
        .map(string_items)
        .find(|items| !items.is_empty())
        .unwrap_or_default()
}

fn first_populated_in(group: Option<&Value>, keys: &[&str]) -> Vec<String> {
    group
        .and_then(Value::as_object)
        .map(|group| first_populated(group, keys))
        .unwrap_or_default()
}

fn extract_sections(sections: Option<&Value>) -> BTreeMap<String, bool> {
    let mut out: BTreeMap<String, bool> = KNOWN_SECTIONS
        .iter()
        .map(|name| (name.to_string(), true))
        .collect();

    if let Some(reported) = sections.and_then(Value::as_object) {
        for (name, value) in reported {
            if !value.is_null() {
                out.insert(name.clone(), truthy(value));
            }
        }
    }
    out
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => {
            let s = s.trim();
            !(s.is_empty()
                || s.eq_ignore_ascii_case("false")
                || s.eq_ignore_ascii_case("no")
                || s == "0")
        }
        Value::Array(_) | Value::Object(_) => true,
    }
}
