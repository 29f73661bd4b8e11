//! Response envelope and error mapping.
//!
//! # Responsibilities
//! - Wrap every JSON reply in `{ status, message, data }`
//! - Map failures to HTTP status codes
//!
//! # Design Decisions
//! - Client input problems are 4xx with the reason in the message
//! - Conversion failures expose the underlying error text in `data.error`
//! - A saturated render pool is 503 so clients can back off

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::render::RenderError;
use crate::storage::StorageError;

pub const CONVERTED_MESSAGE: &str = "HTML converted to PDF successfully";
pub const MISSING_FILE_MESSAGE: &str = "No file uploaded";
pub const CONVERSION_FAILED_MESSAGE: &str = "Error converting HTML to PDF";

/// JSON body shared by every upload reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: bool,
    pub message: String,
    pub data: Value,
}

impl ApiResponse {
    pub fn converted(pdf_file: &str) -> Self {
        Self {
            status: true,
            message: CONVERTED_MESSAGE.to_string(),
            data: json!({ "pdfFile": pdf_file }),
        }
    }

    pub fn failure(message: impl Into<String>, data: Value) -> Self {
        Self {
            status: false,
            message: message.into(),
            data,
        }
    }
}

/// Everything that can end an upload request early.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No file uploaded")]
    MissingFile,

    #[error("invalid multipart body: {0}")]
    InvalidForm(#[from] MultipartError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("failed to resolve upload path: {0}")]
    Resolve(#[source] std::io::Error),

    #[error("failed to store PDF: {0}")]
    Output(#[source] StorageError),

    #[error(transparent)]
    Conversion(#[from] RenderError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFile => StatusCode::BAD_REQUEST,
            ApiError::InvalidForm(e) => e.status(),
            ApiError::Storage(_) | ApiError::Resolve(_) | ApiError::Output(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Conversion(RenderError::Busy) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Conversion(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            ApiError::MissingFile => MISSING_FILE_MESSAGE,
            ApiError::InvalidForm(_) => "Invalid upload",
            ApiError::Storage(_) | ApiError::Resolve(_) => "Error storing uploaded file",
            ApiError::Conversion(RenderError::Busy) => "Renderer busy, retry later",
            ApiError::Conversion(_) | ApiError::Output(_) => CONVERSION_FAILED_MESSAGE,
        }
    }

    /// Metric label for a failed conversion.
    pub fn outcome(&self) -> &'static str {
        match self {
            ApiError::MissingFile | ApiError::InvalidForm(_) => "rejected",
            ApiError::Storage(_) | ApiError::Resolve(_) | ApiError::Output(_) => "storage_error",
            ApiError::Conversion(RenderError::Busy) => "busy",
            ApiError::Conversion(RenderError::Timeout(_)) => "timeout",
            ApiError::Conversion(_) => "render_error",
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, ApiError::Conversion(RenderError::Busy))
    }

    pub fn body(&self) -> ApiResponse {
        let data = match self {
            ApiError::MissingFile => json!({}),
            other => json!({ "error": other.to_string() }),
        };
        ApiResponse::failure(self.message(), data)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_missing_file_payload() {
        let err = ApiError::MissingFile;
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            serde_json::to_value(err.body()).unwrap(),
            json!({ "status": false, "message": "No file uploaded", "data": {} })
        );
    }

    #[test]
    fn test_conversion_failure_exposes_error() {
        let err = ApiError::from(RenderError::Navigation("net::ERR_FILE_NOT_FOUND".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            serde_json::to_value(err.body()).unwrap(),
            json!({
                "status": false,
                "message": "Error converting HTML to PDF",
                "data": { "error": "failed to load document: net::ERR_FILE_NOT_FOUND" }
            })
        );
    }

    #[test]
    fn test_output_write_failure_is_conversion_failure() {
        let err = ApiError::Output(StorageError::NamesExhausted("a.pdf".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.outcome(), "storage_error");
        assert_eq!(
            serde_json::to_value(err.body()).unwrap(),
            json!({
                "status": false,
                "message": "Error converting HTML to PDF",
                "data": { "error": "failed to store PDF: no free stored name for 'a.pdf'" }
            })
        );
    }

    #[test]
    fn test_busy_and_timeout_mapping() {
        let busy = ApiError::from(RenderError::Busy);
        assert_eq!(busy.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(busy.is_busy());
        assert_eq!(busy.outcome(), "busy");

        let timeout = ApiError::from(RenderError::Timeout(Duration::from_secs(60)));
        assert_eq!(timeout.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(timeout.outcome(), "timeout");
    }

    #[test]
    fn test_converted_payload() {
        assert_eq!(
            serde_json::to_value(ApiResponse::converted("uploads/1-a.pdf")).unwrap(),
            json!({
                "status": true,
                "message": "HTML converted to PDF successfully",
                "data": { "pdfFile": "uploads/1-a.pdf" }
            })
        );
    }
}
