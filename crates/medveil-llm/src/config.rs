//! Inference provider configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default OpenAI-compatible endpoint of the private-inference service
pub const DEFAULT_BASE_URL: &str = "https://nilai-a779.nillion.network/v1";

/// Default model
pub const DEFAULT_MODEL: &str = "google/gemma-3-27b-it";

/// Which provider implementation to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Hosted chat-completion API
    #[default]
    Nilai,
    /// Canned responses, no network
    Mock,
}

/// Configuration for the inference provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Provider implementation
    #[serde(default)]
    pub provider: ProviderKind,

    /// API base URL (without `/chat/completions`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Completion token limit
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Bearer credential
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_max_tokens() -> u32 {
    500
}

fn default_temperature() -> f32 {
    0.7
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            base_url: default_base_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            api_key: None,
        }
    }
}

impl InferenceConfig {
    /// Request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Credential, ignoring blank values and the sample placeholder
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && *key != "your_nillion_api_key_here")
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.trim().is_empty() {
            return Err("inference.base_url must not be empty".to_string());
        }
        if self.model.trim().is_empty() {
            return Err("inference.model must not be empty".to_string());
        }
        if self.max_tokens == 0 {
            return Err("inference.max_tokens must be greater than 0".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err("inference.temperature must be between 0.0 and 2.0".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("inference.timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = InferenceConfig::default();
        assert_eq!(config.provider, ProviderKind::Nilai);
        assert_eq!(config.max_tokens, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_placeholder_key_is_not_a_credential() {
        let mut config = InferenceConfig::default();
        config.api_key = Some("your_nillion_api_key_here".to_string());
        assert!(config.credential().is_none());
        config.api_key = Some("   ".to_string());
        assert!(config.credential().is_none());
        config.api_key = Some("nk-123".to_string());
        assert_eq!(config.credential(), Some("nk-123"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: InferenceConfig =
            toml::from_str("provider = \"mock\"\nmax_tokens = 64\n").unwrap();
        assert_eq!(config.provider, ProviderKind::Mock);
        assert_eq!(config.max_tokens, 64);
        assert_eq!(config.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_invalid_temperature() {
        let config = InferenceConfig {
            temperature: 3.5,
            ..InferenceConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
