use std::path::PathBuf;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{Category, Classification, Complaint, Priority, Status};
use crate::routes::run_blocking;
use crate::state::AppState;
use crate::store::{StoreError, UpdateOutcome};

const EXPORTS_DIR: &str = "exports";

#[derive(Debug, Deserialize)]
pub struct ComplaintRequest {
    pub complaint_text: String,
}

#[derive(Debug, Serialize)]
pub struct ClassificationPreview {
    pub classification: Classification,
    pub category: Category,
    pub priority: Priority,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub classification: Classification,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub format: ExportFormat,
    pub file_name: String,
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub exported: bool,
    pub path: String,
}

/// POST /api/v1/complaints/classify
/// Classifies without storing, so the caller can review before filing.
pub async fn handle_classify(
    State(state): State<AppState>,
    Json(req): Json<ComplaintRequest>,
) -> Result<Json<ClassificationPreview>, AppError> {
    let classification = state.classifier.classify(&req.complaint_text).await?;
    Ok(Json(ClassificationPreview {
        category: classification.normalized_category(),
        priority: classification.normalized_priority(),
        classification,
    }))
}

/// POST /api/v1/complaints
pub async fn handle_file_complaint(
    State(state): State<AppState>,
    Json(req): Json<ComplaintRequest>,
) -> Result<(StatusCode, Json<Complaint>), AppError> {
    let classification = state.classifier.classify(&req.complaint_text).await?;
    let complaint = append(&state, classification).await?;
    Ok((StatusCode::CREATED, Json(complaint)))
}

/// POST /api/v1/complaints/confirm
/// Files a classification previously returned by the classify endpoint.
pub async fn handle_confirm(
    State(state): State<AppState>,
    Json(req): Json<ConfirmRequest>,
) -> Result<(StatusCode, Json<Complaint>), AppError> {
    let has_text = req
        .classification
        .complaint_text
        .as_deref()
        .is_some_and(|t| !t.trim().is_empty());
    if !has_text {
        return Err(AppError::Validation(
            "Complaint text cannot be empty".to_string(),
        ));
    }
    let complaint = append(&state, req.classification).await?;
    Ok((StatusCode::CREATED, Json(complaint)))
}

async fn append(state: &AppState, classification: Classification) -> Result<Complaint, AppError> {
    let _guard = state.write_lock.lock().await;
    let store = state.store.clone();
    Ok(run_blocking(move || store.append(&classification)).await??)
}

/// GET /api/v1/complaints?q=
pub async fn handle_list(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<Complaint>>, AppError> {
    let query = params.q.unwrap_or_default();
    let store = state.store.clone();
    let results = run_blocking(move || store.search(&query)).await?;
    Ok(Json(results))
}

/// GET /api/v1/complaints/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Complaint>, AppError> {
    let store = state.store.clone();
    let lookup = id.clone();
    run_blocking(move || store.get(&lookup))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Complaint {id} not found")))
}

/// PATCH /api/v1/complaints/:id/status
pub async fn handle_update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<Complaint>, AppError> {
    let status = Status::parse(&req.status).ok_or_else(|| {
        AppError::Validation(format!(
            "Unknown status '{}'; expected one of New, In Progress, Resolved, Closed",
            req.status
        ))
    })?;

    let _guard = state.write_lock.lock().await;
    let store = state.store.clone();
    let lookup = id.clone();
    let updated = run_blocking(move || -> Result<Option<Complaint>, StoreError> {
        match store.update_status(&lookup, status, &req.note)? {
            UpdateOutcome::Updated => Ok(store.get(&lookup)),
            UpdateOutcome::NotFound => Ok(None),
        }
    })
    .await??;

    updated
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Complaint {id} not found")))
}

/// POST /api/v1/exports
/// Writes under `<data dir>/exports/`. Returns `exported: false` on an empty
/// collection or a write failure.
pub async fn handle_export(
    State(state): State<AppState>,
    Json(req): Json<ExportRequest>,
) -> Result<Json<ExportResponse>, AppError> {
    let file_name = export_file_name(&req.file_name, req.format)?;
    let dir = state.store.data_dir().join(EXPORTS_DIR);
    let path: PathBuf = dir.join(file_name);

    let store = state.store.clone();
    let target = path.clone();
    let exported = run_blocking(move || {
        if let Err(e) = std::fs::create_dir_all(&dir) {
            tracing::warn!("Cannot create export directory {}: {e}", dir.display());
            return false;
        }
        match req.format {
            ExportFormat::Csv => store.export_csv(&target),
            ExportFormat::Json => store.export_json(&target),
        }
    })
    .await?;

    Ok(Json(ExportResponse {
        exported,
        path: path.display().to_string(),
    }))
}

/// Plain file names only; the format's extension is appended when missing.
fn export_file_name(raw: &str, format: ExportFormat) -> Result<String, AppError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Filename cannot be empty".to_string()));
    }
    if name.contains(['/', '\\']) || name.starts_with('.') {
        return Err(AppError::Validation(format!(
            "'{name}' is not a plain file name"
        )));
    }
    let extension = format.extension();
    if name.ends_with(&format!(".{extension}")) {
        Ok(name.to_string())
    } else {
        Ok(format!("{name}.{extension}"))
    }
}
