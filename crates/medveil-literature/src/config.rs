//! Literature source configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// NCBI E-utilities base URL
pub const DEFAULT_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// Configuration for the PubMed client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiteratureConfig {
    /// E-utilities base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Identifiers requested per keyword
    #[serde(default = "default_per_keyword")]
    pub per_keyword: usize,

    /// Request timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// NCBI API key (raises the rate limit)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Tool name reported to NCBI
    #[serde(default = "default_tool")]
    pub tool: Option<String>,

    /// Contact address reported to NCBI
    #[serde(default)]
    pub email: Option<String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_per_keyword() -> usize {
    3
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_tool() -> Option<String> {
    Some("medveil".to_string())
}

impl Default for LiteratureConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            per_keyword: default_per_keyword(),
            timeout_secs: default_timeout_secs(),
            api_key: None,
            tool: default_tool(),
            email: None,
        }
    }
}

impl LiteratureConfig {
    /// Request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.trim().is_empty() {
            return Err("literature.base_url must not be empty".to_string());
        }
        if self.per_keyword == 0 {
            return Err("literature.per_keyword must be greater than 0".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("literature.timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}
