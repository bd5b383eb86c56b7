//! Error types for the Extractor

use thiserror::Error;

/// Errors that can occur while building the extractor
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// A vocabulary pattern failed to compile
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
