//! Exhaustive coercions from loose JSON values to the scalar and list shapes
//! the canonical schema uses. Every function returns `None` instead of
//! guessing when the value has no sensible reading.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Keys that carry a human label when a list item is an object.
const LABEL_KEYS: &[&str] = &["label", "title", "name", "text", "value"];

/// Non-empty trimmed text from a scalar.
pub fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Like [`text`] but only for JSON strings.
pub fn string_text(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// The first key of `keys` whose value reads as text.
pub fn first_text(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| map.get(*key).and_then(text))
}

/// The first key of `keys` holding an array.
pub fn first_array<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Vec<Value>> {
    keys.iter().find_map(|key| map.get(*key).and_then(Value::as_array))
}

/// Any list element rendered as a string. Objects prefer a label key and
/// otherwise fall back to their compact JSON form.
pub fn item_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(_) | Value::Number(_) | Value::Bool(_) => text(value),
        Value::Object(map) => first_text(map, LABEL_KEYS).or_else(|| {
            (!map.is_empty()).then(|| value.to_string())
        }),
        Value::Array(items) => (!items.is_empty()).then(|| value.to_string()),
    }
}

/// Arrays map element-wise; a lone string becomes a one-element list.
pub fn string_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(items.iter().filter_map(item_text).collect()),
        Value::String(_) => text(value).map(|s| vec![s]),
        Value::Null | Value::Number(_) | Value::Bool(_) | Value::Object(_) => None,
    }
}

/// Rows of string cells. Non-object rows are dropped; nested cell values are
/// kept as compact JSON.
pub fn dataset(value: &Value) -> Option<Vec<BTreeMap<String, String>>> {
    let rows = value.as_array()?;
    Some(
        rows.iter()
            .filter_map(Value::as_object)
            .map(|row| {
                row.iter()
                    .filter_map(|(key, cell)| {
                        let cell = match cell {
                            Value::Null => return None,
                            Value::String(s) => s.clone(),
                            other => text(other).unwrap_or_else(|| other.to_string()),
                        };
                        Some((key.clone(), cell))
                    })
                    .collect()
            })
            .collect(),
    )
}

/// Truncates on a character boundary, appending an ellipsis when cut.
pub fn truncate(raw: &str, max_chars: usize) -> String {
    let trimmed = raw.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(max_chars).collect();
    format!("{}…", cut.trim_end())
}

pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
