//! Complaint classification: prompt, model call, and reply parsing.
//! The model transport is reached only through the `RawClassifier` seam.

pub mod error;
pub mod parser;
pub mod prompts;
pub mod service;

pub use error::{ClassificationError, ErrorReport};
pub use service::{ClassificationService, RawClassifier};
