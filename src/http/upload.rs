//! `POST /upload`: store the uploaded HTML, render it, answer with the PDF path.
//!
//! # Stages
//! ```text
//! Validating → Storing → Rendering → Responding → CleaningUp → Done
//!      │          │          │
//!      └──────────┴──────────┴──→ Failed
//! ```
//!
//! The uploaded input is deleted after a successful conversion. After a
//! failed one it is kept for the reaper when `retain_failed_inputs` is set,
//! otherwise deleted as well.

use std::fmt;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::State;
use axum::Json;

use crate::http::response::{ApiError, ApiResponse};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::render::RenderJob;
use crate::storage::names::FALLBACK_NAME;
use crate::storage::{ConversionResult, StoredUpload};

/// Multipart field carrying the document.
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Validating,
    Storing,
    Rendering,
    Responding,
    CleaningUp,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validating => "validating",
            Stage::Storing => "storing",
            Stage::Rendering => "rendering",
            Stage::Responding => "responding",
            Stage::CleaningUp => "cleaning_up",
        };
        f.write_str(name)
    }
}

fn enter(stage: Stage) {
    tracing::debug!(stage = %stage, "Upload stage");
}

struct UploadPayload {
    file_name: String,
    bytes: Bytes,
}

/// Find the `file` field, skipping any others.
async fn read_file_field(multipart: &mut Multipart) -> Result<Option<UploadPayload>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_NAME.to_string());
        let bytes = field.bytes().await?;

        return Ok(Some(UploadPayload { file_name, bytes }));
    }
    Ok(None)
}

pub async fn upload_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ApiResponse>, ApiError> {
    let start = Instant::now();

    enter(Stage::Validating);
    // A body that is not multipart at all carries no file either.
    let mut multipart = multipart.map_err(|rejection| {
        tracing::info!(reason = %rejection, "Upload rejected: not a multipart body");
        ApiError::MissingFile
    })?;
    let payload = match read_file_field(&mut multipart).await {
        Ok(Some(payload)) => payload,
        Ok(None) => {
            tracing::info!("Upload rejected: no file field");
            return Err(ApiError::MissingFile);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Upload rejected: unreadable multipart body");
            return Err(ApiError::InvalidForm(e));
        }
    };

    enter(Stage::Storing);
    let upload = state
        .store
        .save_upload(&payload.file_name, &payload.bytes)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to store upload");
            metrics::record_conversion("storage_error", start);
            ApiError::Storage(e)
        })?;
    drop(payload);
    metrics::record_upload_size(upload.size());

    enter(Stage::Rendering);
    match convert(&state, &upload).await {
        Ok(result) => {
            enter(Stage::Responding);
            let pdf_file = result.path.display().to_string();
            metrics::record_conversion("success", start);
            tracing::info!(
                stored_name = %upload.stored_name(),
                pdf_file = %pdf_file,
                bytes = result.size,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "HTML converted to PDF"
            );

            enter(Stage::CleaningUp);
            let input = upload.path().to_path_buf();
            if let Err(e) = upload.discard().await {
                tracing::warn!(path = %input.display(), error = %e, "Error deleting HTML file");
            }

            Ok(Json(ApiResponse::converted(&pdf_file)))
        }
        Err(err) => {
            metrics::record_conversion(err.outcome(), start);
            tracing::error!(
                stored_name = %upload.stored_name(),
                error = %err,
                "Error during HTML to PDF conversion"
            );

            enter(Stage::CleaningUp);
            if state.retain_failed_inputs && !err.is_busy() {
                let kept = upload.keep();
                tracing::info!(path = %kept.display(), "Retaining failed input");
                state.retained.track(kept);
            } else {
                let input = upload.path().to_path_buf();
                if let Err(e) = upload.discard().await {
                    tracing::warn!(path = %input.display(), error = %e, "Error deleting HTML file");
                }
            }

            Err(err)
        }
    }
}

async fn convert(state: &AppState, upload: &StoredUpload) -> Result<ConversionResult, ApiError> {
    let input = tokio::fs::canonicalize(upload.path())
        .await
        .map_err(ApiError::Resolve)?;

    let pdf = state.pool.render(RenderJob::a4(input)).await?;
    state
        .store
        .save_output(upload.original_name(), &pdf)
        .await
        .map_err(ApiError::Output)
}
