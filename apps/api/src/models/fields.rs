//! Lenient field decoders shared by the parser boundary and the store boundary.
//!
//! Model output and legacy documents carry loosely-typed values (numbers as
//! strings, keyword lists as comma-separated text, notes that are not a list).
//! Each decoder accepts any JSON value and maps it onto the documented shape.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::models::complaint::Note;

/// Text value: strings verbatim, null as absent, other scalars stringified.
pub fn text_from_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Keyword list: an array (non-string items stringified) or a comma-separated string.
pub fn keywords_from_value(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(text_from_value)
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
        ),
        Value::String(s) => Some(
            s.split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(String::from)
                .collect(),
        ),
        _ => None,
    }
}

/// Confidence: a number or numeric string. Not clamped here.
pub fn confidence_from_value(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|c| c.is_finite())
}

pub fn clamp_confidence(confidence: f64) -> f64 {
    confidence.clamp(0.0, 1.0)
}

/// Notes: only an array is a valid shape; anything else normalizes to empty.
pub fn notes_from_value(value: &Value) -> Vec<Note> {
    let Value::Array(items) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(Note {
                timestamp: map.get("timestamp").and_then(text_from_value).unwrap_or_default(),
                note: map.get("note").and_then(text_from_value).unwrap_or_default(),
            }),
            Value::String(s) => Some(Note {
                timestamp: String::new(),
                note: s.clone(),
            }),
            _ => None,
        })
        .collect()
}

// serde adapters

pub fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(text_from_value(&value).unwrap_or_default())
}

pub fn lenient_text_opt<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(text_from_value(&value))
}

pub fn lenient_keywords<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(keywords_from_value(&value).unwrap_or_default())
}

pub fn lenient_keywords_opt<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<Vec<String>>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(keywords_from_value(&value))
}

pub fn lenient_confidence<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(confidence_from_value(&value)
        .map(clamp_confidence)
        .unwrap_or(0.0))
}

pub fn lenient_confidence_opt<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<f64>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(confidence_from_value(&value))
}

pub fn lenient_notes<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Note>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(notes_from_value(&value))
}
