//! Audit configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Storage backend for audit entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditBackend {
    /// Daily JSON-lines files; survives restarts
    #[default]
    Jsonl,
    /// Process memory; lost on restart
    Memory,
}

/// Audit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Storage backend
    #[serde(default)]
    pub backend: AuditBackend,

    /// Directory for JSON-lines files
    #[serde(default = "default_dir")]
    pub dir: PathBuf,

    /// Characters of query text kept as a preview
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,

    /// Record every HTTP request as an `api_request` entry
    #[serde(default)]
    pub log_requests: bool,
}

fn default_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_preview_chars() -> usize {
    32
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            backend: AuditBackend::default(),
            dir: default_dir(),
            preview_chars: default_preview_chars(),
            log_requests: false,
        }
    }
}

impl AuditConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.backend == AuditBackend::Jsonl && self.dir.as_os_str().is_empty() {
            return Err("audit.dir must be set for the jsonl backend".to_string());
        }
        if self.preview_chars > 200 {
            return Err("audit.preview_chars must not exceed 200".to_string());
        }
        Ok(())
    }
}
