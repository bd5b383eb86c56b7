//! Inference error types

use thiserror::Error;

/// Errors that can occur during inference
#[derive(Error, Debug)]
pub enum InferenceError {
    /// No API key configured
    #[error("Inference credential not configured; set NILLION_API_KEY or inference.api_key")]
    MissingCredential,

    /// Upstream answered with a non-success status
    #[error("Inference API returned HTTP {status}")]
    Upstream {
        /// HTTP status code
        status: u16,
        /// Response body, verbatim
        body: String,
    },

    /// Network or transport failure
    #[error("Communication error: {0}")]
    Communication(String),

    /// Response could not be interpreted
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
