//! Audit store errors

use thiserror::Error;

/// Errors that can occur during audit storage operations
#[derive(Error, Debug)]
pub enum AuditError {
    /// Filesystem error
    #[error("Audit I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Entry could not be serialized
    #[error("Audit serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Background task running the store call did not complete
    #[error("Audit task failed: {0}")]
    Task(String),
}
