use serde::Serialize;
use thiserror::Error;

/// The single failure contract of classification. Input, upstream and parse
/// failures all arrive in this shape; none of them is fatal to the caller.
#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("Complaint text cannot be empty")]
    EmptyText,

    #[error("An unexpected error occurred: {0}")]
    Upstream(String),

    #[error("Failed to parse model's response.")]
    NoJson { raw_response: String },

    #[error("JSON decoding failed.")]
    Decode {
        detail: String,
        raw_response: String,
    },
}

impl ClassificationError {
    pub fn kind(&self) -> &'static str {
        match self {
            ClassificationError::EmptyText => "empty_text",
            ClassificationError::Upstream(_) => "upstream",
            ClassificationError::NoJson { .. } => "no_json",
            ClassificationError::Decode { .. } => "decode",
        }
    }

    /// The offending model reply, when there was one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            ClassificationError::NoJson { raw_response }
            | ClassificationError::Decode { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            error: self.to_string(),
            kind: self.kind(),
            detail: match self {
                ClassificationError::Decode { detail, .. } => Some(detail.clone()),
                _ => None,
            },
            raw_response: self.raw_response().map(String::from),
        }
    }
}

/// Serializable error result, e.g. `{"error": "JSON decoding failed.", "kind": "decode", ...}`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub error: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}
