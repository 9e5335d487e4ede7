use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::models::fields::{
    clamp_confidence, lenient_confidence, lenient_confidence_opt, lenient_keywords,
    lenient_keywords_opt, lenient_notes, lenient_text, lenient_text_opt,
};

/// Keys owned by the store. Classification input can never override them.
pub const STORE_OWNED_KEYS: &[&str] = &["id", "timestamp", "status", "notes"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    Electricity,
    Water,
    Roads,
    Waste,
    Health,
    Security,
    #[default]
    Other,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Electricity,
        Category::Water,
        Category::Roads,
        Category::Waste,
        Category::Health,
        Category::Security,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Electricity => "Electricity",
            Category::Water => "Water",
            Category::Roads => "Roads",
            Category::Waste => "Waste",
            Category::Health => "Health",
            Category::Security => "Security",
            Category::Other => "Other",
        }
    }

    /// Case-insensitive match on the fixed names. Anything else buckets into `Other`.
    pub fn normalize(raw: &str) -> Self {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(raw))
            .unwrap_or_default()
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(value.as_str().map(Category::normalize).unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }

    /// Unknown priorities default to `Medium`.
    pub fn normalize(raw: &str) -> Self {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(raw))
            .unwrap_or_default()
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(value.as_str().map(Priority::normalize).unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Status {
    #[default]
    New,
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
    Closed,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::New,
        Status::InProgress,
        Status::Resolved,
        Status::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::New => "New",
            Status::InProgress => "In Progress",
            Status::Resolved => "Resolved",
            Status::Closed => "Closed",
        }
    }

    /// Strict parse for staff input. Accepts "In Progress", "in_progress", "in progress".
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().replace(['_', '-'], " ");
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(&normalized))
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(value.as_str().and_then(Status::parse).unwrap_or_default())
    }
}

/// A single staff note. Notes are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub timestamp: String,
    pub note: String,
}

/// One persisted complaint. Every field decodes leniently so a legacy or
/// hand-edited document never breaks readers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Complaint {
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub timestamp: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub complaint_text: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, deserialize_with = "lenient_text")]
    pub summary: String,
    #[serde(default, deserialize_with = "lenient_keywords")]
    pub keywords: Vec<String>,
    #[serde(default, deserialize_with = "lenient_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub status: Status,
    #[serde(default, deserialize_with = "lenient_notes")]
    pub notes: Vec<Note>,
    /// Extra keys supplied by the model, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Complaint {
    /// Builds a fresh record. `id`, `timestamp`, `status` and `notes` always
    /// come from the store; everything else comes from the classification.
    pub fn from_classification(
        classification: &Classification,
        id: String,
        timestamp: String,
    ) -> Self {
        let mut extra = classification.extra.clone();
        for key in STORE_OWNED_KEYS {
            extra.remove(*key);
        }

        Self {
            id,
            timestamp,
            complaint_text: classification.complaint_text.clone().unwrap_or_default(),
            category: classification.normalized_category(),
            priority: classification.normalized_priority(),
            summary: classification.summary.clone().unwrap_or_default(),
            keywords: classification.keywords.clone().unwrap_or_default(),
            confidence: classification
                .confidence
                .map(clamp_confidence)
                .unwrap_or(0.0),
            status: Status::New,
            notes: Vec::new(),
            extra,
        }
    }
}

/// Structured output of the classifier. Keys the model omitted stay `None`;
/// category and priority are carried verbatim until a record is built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_text_opt"
    )]
    pub category: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_text_opt"
    )]
    pub priority: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_text_opt"
    )]
    pub summary: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_keywords_opt"
    )]
    pub keywords: Option<Vec<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_confidence_opt"
    )]
    pub confidence: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_text_opt"
    )]
    pub complaint_text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Classification {
    pub fn normalized_category(&self) -> Category {
        self.category
            .as_deref()
            .map(Category::normalize)
            .unwrap_or_default()
    }

    pub fn normalized_priority(&self) -> Priority {
        self.priority
            .as_deref()
            .map(Priority::normalize)
            .unwrap_or_default()
    }
}
