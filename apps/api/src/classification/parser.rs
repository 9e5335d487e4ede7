//! Response parser: turns a raw model reply into a `Classification`.
//!
//! The reply may wrap the payload in prose or markdown fences. The payload is
//! the span from the first `{` to the last `}`. No defaults are invented for
//! missing keys and enum values are passed through verbatim.

use serde_json::Value;

use crate::classification::error::ClassificationError;
use crate::models::Classification;

/// Greedy `{ ... }` span: first opening brace to last closing brace.
pub fn extract_json_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (start < end).then(|| &raw[start..=end])
}

pub fn parse_response(raw: &str) -> Result<Classification, ClassificationError> {
    let raw = raw.trim();

    let span = extract_json_span(raw).ok_or_else(|| ClassificationError::NoJson {
        raw_response: raw.to_string(),
    })?;

    let decode_error = |e: serde_json::Error| ClassificationError::Decode {
        detail: e.to_string(),
        raw_response: raw.to_string(),
    };

    // The span starts with '{', so a successful decode is always an object.
    let value: Value = serde_json::from_str(span).map_err(decode_error)?;
    serde_json::from_value(value).map_err(decode_error)
}
