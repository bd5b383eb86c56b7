//! Configuration file parsing for the server.
//!
//! Loads settings from a TOML file, then applies environment overrides. Every
//! section has defaults, so an empty file (or no file) is a valid starting
//! point; `validate()` catches inconsistent values before startup.

use medveil_audit::{AuditBackend, AuditConfig};
use medveil_crypto::{AttestationConfig, CipherContext};
use medveil_extractor::ExtractorConfig;
use medveil_llm::{InferenceConfig, ProviderKind};
use medveil_literature::LiteratureConfig;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Server configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Inconsistent or out-of-range value
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Server configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Bind port
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,

    /// Intake limits
    #[serde(default)]
    pub query: QueryLimits,

    /// Inference provider
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Literature retrieval
    #[serde(default)]
    pub literature: LiteratureConfig,

    /// Keyword extraction and prompt assembly
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// Audit log
    #[serde(default)]
    pub audit: AuditConfig,

    /// Attestation source and expectations
    #[serde(default)]
    pub attestation: AttestationConfig,

    /// Encryption key
    #[serde(default)]
    pub encryption: EncryptionConfig,
}

/// Size limits applied when a query is received
#[derive(Debug, Clone, Deserialize)]
pub struct QueryLimits {
    /// Maximum question length in characters
    #[serde(default = "default_max_query_chars")]
    pub max_query_chars: usize,

    /// Maximum attached document length in characters
    #[serde(default = "default_max_document_chars")]
    pub max_document_chars: usize,
}

/// Encryption key configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EncryptionConfig {
    /// Base64-encoded 32-byte key; a fresh key is generated when absent
    #[serde(default)]
    pub key: Option<String>,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_bind_port() -> u16 {
    8000
}

fn default_max_query_chars() -> usize {
    4_000
}

fn default_max_document_chars() -> usize {
    100_000
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            max_query_chars: default_max_query_chars(),
            max_document_chars: default_max_document_chars(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
            query: QueryLimits::default(),
            inference: InferenceConfig::default(),
            literature: LiteratureConfig::default(),
            extractor: ExtractorConfig::default(),
            audit: AuditConfig::default(),
            attestation: AttestationConfig::default(),
            encryption: EncryptionConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: ServerConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides from a variable lookup
    ///
    /// `NILLION_API_KEY` takes precedence over `NILAI_API_TOKEN`. Blank values
    /// are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = var("NILLION_API_KEY").or_else(|| var("NILAI_API_TOKEN")) {
            self.inference.api_key = Some(key);
        }
        if let Some(url) = var("NILAI_API_URL") {
            self.inference.base_url = url;
        }
        if let Some(key) = var("MEDVEIL_ENCRYPTION_KEY") {
            self.encryption.key = Some(key);
        }
        if let Some(dir) = var("MEDVEIL_AUDIT_DIR") {
            self.audit.dir = dir.into();
        }
        if let Some(url) = var("ATTESTATION_URL") {
            self.attestation.remote_url = Some(url);
        }
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_address.trim().is_empty() {
            return Err(ConfigError::Invalid("bind_address must not be empty".to_string()));
        }
        if self.query.max_query_chars == 0 || self.query.max_document_chars == 0 {
            return Err(ConfigError::Invalid(
                "query limits must be greater than 0".to_string(),
            ));
        }
        if self.attestation.max_age_secs == 0 {
            return Err(ConfigError::Invalid(
                "attestation.max_age_secs must be greater than 0".to_string(),
            ));
        }

        self.inference.validate().map_err(ConfigError::Invalid)?;
        self.literature.validate().map_err(ConfigError::Invalid)?;
        self.extractor.validate().map_err(ConfigError::Invalid)?;
        self.audit.validate().map_err(ConfigError::Invalid)?;

        if let Some(key) = &self.encryption.key {
            CipherContext::from_base64_key(key)
                .map_err(|e| ConfigError::Invalid(format!("encryption.key: {}", e)))?;
        }
        Ok(())
    }

    /// Create a configuration for tests: mock inference, in-memory audit
    pub fn default_test_config() -> Self {
        ServerConfig {
            bind_address: "127.0.0.1".to_string(),
            inference: InferenceConfig {
                provider: ProviderKind::Mock,
                api_key: Some("test-key".to_string()),
                ..InferenceConfig::default()
            },
            audit: AuditConfig {
                backend: AuditBackend::Memory,
                ..AuditConfig::default()
            },
            ..ServerConfig::default()
        }
    }

    /// Get the full bind address (address:port)
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.bind_port)
    }
}
