//! Configuration for the Extractor

use serde::{Deserialize, Serialize};

/// Configuration for keyword extraction and prompt assembly
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Maximum distance (characters) between a lab marker and its direction word
    #[serde(default = "default_finding_window")]
    pub finding_window: usize,

    /// Number of question words used when no pattern matches
    #[serde(default = "default_fallback_keywords")]
    pub fallback_keywords: usize,

    /// Document text beyond this many characters is cut from the prompt
    #[serde(default = "default_max_document_chars")]
    pub max_document_chars: usize,
}

fn default_finding_window() -> usize {
    40
}

fn default_fallback_keywords() -> usize {
    3
}

fn default_max_document_chars() -> usize {
    8_000
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            finding_window: default_finding_window(),
            fallback_keywords: default_fallback_keywords(),
            max_document_chars: default_max_document_chars(),
        }
    }
}

impl ExtractorConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.finding_window == 0 {
            return Err("finding_window must be greater than 0".to_string());
        }
        if self.fallback_keywords == 0 {
            return Err("fallback_keywords must be greater than 0".to_string());
        }
        if self.max_document_chars == 0 {
            return Err("max_document_chars must be greater than 0".to_string());
        }
        Ok(())
    }
}
