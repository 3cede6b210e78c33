//! crates/studyforge_core/src/error.rs
//!
//! The error taxonomy for a processing request. Quota and file-validation
//! failures are produced before any expensive work; model failures are
//! classified by the adapter and mapped here; parse failures never surface
//! (the validator degrades instead).

use crate::ports::{ModelError, PortError};

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// One or more of the daily/monthly file or page caps is exhausted.
    /// Recoverable by the user (wait or upgrade); never retried automatically.
    #[error("quota exceeded: {}", .0.join(" "))]
    QuotaExceeded(Vec<String>),

    /// The declared MIME type / filename is neither PDF nor DOCX.
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Extraction could not produce usable text even via the salvage path.
    #[error("could not extract readable text from the file")]
    CorruptFile,

    /// Declared size exceeds the plan's ceiling. Checked before any
    /// extraction work starts.
    #[error("file size {size_mb:.2}MB exceeds the {limit_mb}MB plan limit")]
    FileTooLarge { size_mb: f64, limit_mb: f64 },

    /// Invalid or missing model API credential. Operator-facing, never
    /// presented as a user-fixable problem.
    #[error("model API authentication failed")]
    ModelAuth,

    /// Transient upstream rate limit. The caller may retry after a delay.
    #[error("model API rate limit exceeded")]
    ModelRateLimited,

    /// The model call exceeded the request's wall-clock budget.
    #[error("document processing timed out")]
    ModelTimeout,

    /// Anything unclassified. The upstream message is preserved for
    /// diagnostics; callers present a generic message.
    #[error("processing failed: {0}")]
    Internal(String),
}

impl From<ModelError> for ProcessError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::Auth => ProcessError::ModelAuth,
            ModelError::RateLimited => ProcessError::ModelRateLimited,
            ModelError::Other(msg) => ProcessError::Internal(msg),
        }
    }
}

impl From<PortError> for ProcessError {
    fn from(e: PortError) -> Self {
        ProcessError::Internal(e.to_string())
    }
}
