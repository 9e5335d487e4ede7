use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::classification::error::ClassificationError;
use crate::classification::parser::parse_response;
use crate::classification::prompts::build_classify_prompt;
use crate::models::Classification;

/// The model boundary: prompt in, raw reply text out. The transport is opaque.
#[async_trait]
pub trait RawClassifier: Send + Sync {
    async fn classify_raw(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Classifies one complaint end to end. Performs no retries and no persistence;
/// storing the result is a separate step for the caller.
#[derive(Clone)]
pub struct ClassificationService {
    classifier: Arc<dyn RawClassifier>,
}

impl ClassificationService {
    pub fn new(classifier: Arc<dyn RawClassifier>) -> Self {
        Self { classifier }
    }

    pub async fn classify(
        &self,
        complaint_text: &str,
    ) -> Result<Classification, ClassificationError> {
        if complaint_text.trim().is_empty() {
            return Err(ClassificationError::EmptyText);
        }

        let prompt = build_classify_prompt(complaint_text);
        let raw = self.classifier.classify_raw(&prompt).await.map_err(|e| {
            warn!("Classification call failed: {e:#}");
            ClassificationError::Upstream(format!("{e:#}"))
        })?;

        let mut classification = parse_response(&raw).map_err(|e| {
            warn!(kind = e.kind(), "Could not parse classification reply: {raw}");
            e
        })?;

        classification.complaint_text = Some(complaint_text.to_string());
        debug!(
            category = ?classification.category,
            priority = ?classification.priority,
            "Complaint classified"
        );
        Ok(classification)
    }
}
