use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::analytics::{summarize, AnalyticsSummary};
use crate::errors::AppError;
use crate::routes::run_blocking;
use crate::state::AppState;

const DEFAULT_LATEST: usize = 10;

#[derive(Deserialize)]
pub struct AnalyticsQuery {
    pub latest: Option<usize>,
}

/// GET /api/v1/analytics
pub async fn handle_analytics(
    State(state): State<AppState>,
    Query(params): Query<AnalyticsQuery>,
) -> Result<Json<AnalyticsSummary>, AppError> {
    let latest = params.latest.unwrap_or(DEFAULT_LATEST);
    let store = state.store.clone();
    let records = run_blocking(move || store.load()).await?;
    Ok(Json(summarize(&records, latest)))
}
