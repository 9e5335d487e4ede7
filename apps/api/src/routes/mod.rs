pub mod analytics;
pub mod complaints;
pub mod health;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::errors::AppError;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/complaints",
            get(complaints::handle_list).post(complaints::handle_file_complaint),
        )
        .route(
            "/api/v1/complaints/classify",
            post(complaints::handle_classify),
        )
        .route(
            "/api/v1/complaints/confirm",
            post(complaints::handle_confirm),
        )
        .route("/api/v1/complaints/:id", get(complaints::handle_get))
        .route(
            "/api/v1/complaints/:id/status",
            patch(complaints::handle_update_status),
        )
        .route("/api/v1/exports", post(complaints::handle_export))
        .route("/api/v1/analytics", get(analytics::handle_analytics))
        .with_state(state)
}

/// Store I/O is blocking; keep it off the async executor.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed: {e}")))
}
