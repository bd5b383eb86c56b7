//! Deterministic provider for tests and offline demos

use crate::config::DEFAULT_MODEL;
use crate::{Completion, InferenceError, InferenceProvider};
use async_trait::async_trait;
use medveil_domain::ChatMessage;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Mock inference provider
///
/// Returns a fixed response without network calls. Clones share their call
/// counter, so a test can keep a handle after moving the provider into state.
///
/// # Examples
///
/// ```
/// use medveil_llm::{InferenceProvider, MockProvider};
///
/// let provider = MockProvider::new("ok").without_credential();
/// assert!(provider.ensure_ready().is_err());
/// assert_eq!(provider.call_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    response: String,
    model: String,
    credential: bool,
    upstream_error: Option<(u16, String)>,
    call_count: Arc<AtomicUsize>,
    last_messages: Arc<Mutex<Vec<ChatMessage>>>,
}

impl MockProvider {
    /// Create a mock that answers every request with `response`
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            model: DEFAULT_MODEL.to_string(),
            credential: true,
            upstream_error: None,
            call_count: Arc::new(AtomicUsize::new(0)),
            last_messages: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Report a different model name
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Behave as if no credential were configured
    pub fn without_credential(mut self) -> Self {
        self.credential = false;
        self
    }

    /// Fail every completion with an upstream status
    pub fn with_upstream_error(mut self, status: u16, body: impl Into<String>) -> Self {
        self.upstream_error = Some((status, body.into()));
        self
    }

    /// Number of `complete` calls so far
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Messages of the most recent call
    pub fn last_messages(&self) -> Vec<ChatMessage> {
        self.last_messages
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new(
            "Based on what you describe, please seek evaluation from a licensed \
             healthcare provider. If symptoms are severe or sudden, contact \
             emergency services.",
        )
    }
}

#[async_trait]
impl InferenceProvider for MockProvider {
    fn model(&self) -> &str {
        &self.model
    }

    fn has_credential(&self) -> bool {
        self.credential
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, InferenceError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_messages.lock() {
            *last = messages.to_vec();
        }

        if !self.credential {
            return Err(InferenceError::MissingCredential);
        }
        if let Some((status, body)) = &self.upstream_error {
            return Err(InferenceError::Upstream {
                status: *status,
                body: body.clone(),
            });
        }

        Ok(Completion {
            text: self.response.clone(),
            model: self.model.clone(),
            usage: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_response_and_count() {
        let provider = MockProvider::new("fixed");
        let handle = provider.clone();
        let completion = provider.complete(&[ChatMessage::user("a")]).await.unwrap();
        assert_eq!(completion.text, "fixed");
        provider.complete(&[ChatMessage::user("b")]).await.unwrap();
        assert_eq!(handle.call_count(), 2);
        assert_eq!(handle.last_messages()[0].content, "b");
    }

    #[tokio::test]
    async fn test_scripted_upstream_error() {
        let provider = MockProvider::default().with_upstream_error(429, "slow down");
        match provider.complete(&[]).await {
            Err(InferenceError::Upstream { status, body }) => {
                assert_eq!(status, 429);
                assert_eq!(body, "slow down");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
