//! Conversion API handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use coldpress_core::{
    reorganize_folder, scan_folder, JobError, ReorganizeError, ReorganizeResult, ScanError,
    ScanResult,
};

use crate::metrics::JOBS_STARTED_TOTAL;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body naming a library folder
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderRequest {
    pub folder_path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub ffmpeg: bool,
    pub converting: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_files: Option<usize>,
    /// Included on the no-op path so callers see why nothing started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ScanResult>,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub converting: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn scan_error(e: ScanError) -> ApiError {
    let status = match e {
        ScanError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
    };
    error_response(status, e.to_string())
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check, reporting tool availability and job activity
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        ffmpeg: state.transcoder().validate().await.is_ok(),
        converting: state.runner().is_active().await,
    })
}

/// Scan a folder for files needing conversion
pub async fn scan(Json(body): Json<FolderRequest>) -> Result<Json<ScanResult>, ApiError> {
    let result = scan_folder(&body.folder_path).await.map_err(scan_error)?;
    Ok(Json(result))
}

/// Scan a folder and start converting whatever needs it
pub async fn convert(
    State(state): State<Arc<AppState>>,
    Json(body): Json<FolderRequest>,
) -> Result<Json<ConvertResponse>, ApiError> {
    if state.runner().is_active().await {
        return Err(error_response(
            StatusCode::CONFLICT,
            "Conversion already in progress",
        ));
    }

    let scan_result = scan_folder(&body.folder_path).await.map_err(scan_error)?;

    if scan_result.needs_conversion.is_empty() {
        return Ok(Json(ConvertResponse {
            message: "No files need conversion".to_string(),
            total_files: None,
            result: Some(scan_result),
        }));
    }

    let ScanResult {
        source_root,
        target_root,
        needs_conversion,
        ..
    } = scan_result;

    let total_files = state
        .runner()
        .start(needs_conversion, source_root, target_root)
        .await
        .map_err(|e| match e {
            JobError::Conflict => {
                error_response(StatusCode::CONFLICT, "Conversion already in progress")
            }
        })?;

    JOBS_STARTED_TOTAL.inc();

    Ok(Json(ConvertResponse {
        message: "Conversion started".to_string(),
        total_files: Some(total_files),
        result: None,
    }))
}

/// Request cancellation of the running job
pub async fn cancel(State(state): State<Arc<AppState>>) -> Json<CancelResponse> {
    Json(CancelResponse {
        cancelled: state.runner().cancel().await,
    })
}

/// Current job activity
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        converting: state.runner().is_active().await,
    })
}

/// Move flat top-level files into the reserved subfolder
pub async fn reorganize(
    State(state): State<Arc<AppState>>,
    Json(body): Json<FolderRequest>,
) -> Result<Json<ReorganizeResult>, ApiError> {
    if state.runner().is_active().await {
        return Err(error_response(
            StatusCode::CONFLICT,
            "Cannot reorganize while conversion is in progress",
        ));
    }

    let result = reorganize_folder(&body.folder_path).await.map_err(|e| {
        let status = match e {
            ReorganizeError::InvalidInput { .. }
            | ReorganizeError::AlreadyOrganized
            | ReorganizeError::NothingToMove => StatusCode::BAD_REQUEST,
            ReorganizeError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error_response(status, e.to_string())
    })?;

    Ok(Json(result))
}

/// Prometheus metrics in text format
pub async fn metrics(State(state): State<Arc<AppState>>) -> String {
    crate::metrics::collect_dynamic_metrics(&state).await;
    crate::metrics::encode_metrics()
}
