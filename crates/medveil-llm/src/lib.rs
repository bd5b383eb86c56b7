//! MedVeil Inference Layer
//!
//! Pluggable chat-completion providers behind the [`InferenceProvider`] trait.
//!
//! # Providers
//!
//! - `ChatCompletionProvider`: OpenAI-compatible `/chat/completions` API with
//!   a Bearer credential (the hosted private-inference service)
//! - `MockProvider`: deterministic mock for testing and offline demos
//!
//! Callers check [`InferenceProvider::ensure_ready`] before doing anything
//! else, so a missing credential is reported without touching the network.
//!
//! # Examples
//!
//! ```
//! use medveil_domain::ChatMessage;
//! use medveil_llm::{InferenceProvider, MockProvider};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let provider = MockProvider::new("Please see a clinician.");
//! provider.ensure_ready().unwrap();
//! let completion = provider
//!     .complete(&[ChatMessage::user("I have a headache")])
//!     .await
//!     .unwrap();
//! assert_eq!(completion.text, "Please see a clinician.");
//! # }
//! ```

#![warn(missing_docs)]

pub mod chat;
pub mod config;
mod error;
pub mod mock;

use async_trait::async_trait;
use medveil_domain::ChatMessage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use chat::ChatCompletionProvider;
pub use config::{InferenceConfig, ProviderKind};
pub use error::InferenceError;
pub use mock::MockProvider;

/// Token accounting reported by the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt
    #[serde(default)]
    pub prompt_tokens: u32,
    /// Tokens generated
    #[serde(default)]
    pub completion_tokens: u32,
    /// Sum of both
    #[serde(default)]
    pub total_tokens: u32,
}

/// Result of a chat completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    /// Generated text
    pub text: String,
    /// Model that produced it
    pub model: String,
    /// Token accounting, when reported
    pub usage: Option<Usage>,
}

/// A chat-completion backend
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    /// Model identifier requests are sent to
    fn model(&self) -> &str;

    /// Whether a credential is configured
    fn has_credential(&self) -> bool;

    /// Fail fast when the provider cannot serve requests
    ///
    /// # Errors
    /// Returns [`InferenceError::MissingCredential`] when no API key is set.
    fn ensure_ready(&self) -> Result<(), InferenceError> {
        if self.has_credential() {
            Ok(())
        } else {
            Err(InferenceError::MissingCredential)
        }
    }

    /// Run one chat completion. No retries.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, InferenceError>;
}

/// Build the provider named in configuration
pub fn provider_from_config(
    config: &InferenceConfig,
) -> Result<Arc<dyn InferenceProvider>, InferenceError> {
    match config.provider {
        ProviderKind::Nilai => Ok(Arc::new(ChatCompletionProvider::new(config.clone())?)),
        ProviderKind::Mock => Ok(Arc::new(MockProvider::default().with_model(&config.model))),
    }
}
