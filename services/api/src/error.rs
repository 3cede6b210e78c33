//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service, including the
//! HTTP status mapping for pipeline failures.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

use crate::config::ConfigError;
use studyforge_core::ports::PortError;
use studyforge_core::ProcessError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// A failure from the processing pipeline.
    #[error("Processing error: {0}")]
    Process(#[from] ProcessError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A malformed request from the client (bad header, missing file part).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Process(e) => (process_status(e), user_message(e)),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Config(_) | ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred while processing your file.".to_string(),
            ),
            _ => {
                tracing::error!(error = %self, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred while processing your file.".to_string(),
                )
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

fn process_status(e: &ProcessError) -> StatusCode {
    match e {
        ProcessError::QuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
        ProcessError::UnsupportedFileType(_) => StatusCode::BAD_REQUEST,
        ProcessError::CorruptFile => StatusCode::UNPROCESSABLE_ENTITY,
        ProcessError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        ProcessError::ModelAuth => StatusCode::UNAUTHORIZED,
        ProcessError::ModelRateLimited => StatusCode::TOO_MANY_REQUESTS,
        ProcessError::ModelTimeout => StatusCode::GATEWAY_TIMEOUT,
        ProcessError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// What the end user sees. Diagnostics stay in the logs; configuration-level
/// failures are never presented as user-fixable.
fn user_message(e: &ProcessError) -> String {
    match e {
        ProcessError::QuotaExceeded(reasons) => reasons.join(" "),
        ProcessError::UnsupportedFileType(_) => {
            "Unsupported file type. Please upload a PDF or DOCX file.".to_string()
        }
        ProcessError::CorruptFile => {
            "Could not extract text from the file. If this is a scanned document, \
             please ensure it has been OCR processed."
                .to_string()
        }
        ProcessError::FileTooLarge { limit_mb, .. } => format!(
            "File size exceeds the {}MB limit. Please upgrade your plan or use a smaller file.",
            limit_mb
        ),
        ProcessError::ModelAuth => {
            tracing::error!("model API credential rejected; check configuration");
            "AI processing is temporarily unavailable. Please contact support.".to_string()
        }
        ProcessError::ModelRateLimited => {
            "AI service is busy. Please try again in a few moments.".to_string()
        }
        ProcessError::ModelTimeout => {
            "Processing took too long and was stopped. Please try a smaller file.".to_string()
        }
        ProcessError::Internal(msg) => {
            tracing::error!(error = %msg, "processing failed");
            "An unexpected error occurred. Please try again or contact support.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_matches_the_error_taxonomy() {
        assert_eq!(
            process_status(&ProcessError::QuotaExceeded(vec![])),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            process_status(&ProcessError::FileTooLarge {
                size_mb: 12.0,
                limit_mb: 10.0
            }),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            process_status(&ProcessError::ModelAuth),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            process_status(&ProcessError::ModelRateLimited),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            process_status(&ProcessError::CorruptFile),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
