// src/error.rs

use std::fmt;

/// Global application error enum.
/// Centralizes the failure kinds every portal operation can produce.
#[derive(Debug)]
pub enum AppError {
    /// The hosted data service could not be reached (fetch or subscribe).
    SourceUnavailable(String),

    /// A required field was missing or malformed. Caught locally;
    /// the write is never issued.
    ValidationFailed(String),

    /// The remote service refused an insert/update/delete.
    WriteRejected(String),

    /// The target of an update/delete does not exist.
    /// Swallowed during feed reconciliation, surfaced for direct
    /// user-initiated mutations.
    NotFound(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::SourceUnavailable(msg) => write!(f, "source unavailable: {}", msg),
            AppError::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            AppError::WriteRejected(msg) => write!(f, "write rejected: {}", msg),
            AppError::NotFound(msg) => write!(f, "not found: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

/// Converts transport errors from the REST binding.
/// Connectivity failures map to `SourceUnavailable`; responses the server
/// actively produced are mapped at the call site instead.
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::SourceUnavailable(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationFailed(err.to_string())
    }
}
