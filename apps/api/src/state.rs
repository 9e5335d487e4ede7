use std::sync::Arc;

use tokio::sync::Mutex;

use crate::classification::ClassificationService;
use crate::store::ComplaintStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: ComplaintStore,
    pub classifier: ClassificationService,
    /// Serializes load-modify-save cycles within this process. Other processes
    /// writing the same document still race (last save wins).
    pub write_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(store: ComplaintStore, classifier: ClassificationService) -> Self {
        Self {
            store,
            classifier,
            write_lock: Arc::new(Mutex::new(())),
        }
    }
}
