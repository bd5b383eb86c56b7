//! OpenAI-compatible chat completion provider
//!
//! Posts to `{base_url}/chat/completions` with a Bearer credential. A
//! non-success status is returned as [`InferenceError::Upstream`] carrying the
//! status and body so callers can surface both. There is no retry loop.

use crate::config::InferenceConfig;
use crate::{Completion, InferenceError, InferenceProvider, Usage};
use async_trait::async_trait;
use medveil_domain::ChatMessage;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Hosted chat-completion provider
pub struct ChatCompletionProvider {
    config: InferenceConfig,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionProvider {
    /// Create a provider from configuration
    ///
    /// A missing credential is not an error here; it is reported by
    /// [`InferenceProvider::ensure_ready`].
    pub fn new(config: InferenceConfig) -> Result<Self, InferenceError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| InferenceError::Communication(format!("Failed to build client: {}", e)))?;

        if config.credential().is_none() {
            warn!("No inference credential configured; queries will be refused");
        }

        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl InferenceProvider for ChatCompletionProvider {
    fn model(&self) -> &str {
        &self.config.model
    }

    fn has_credential(&self) -> bool {
        self.config.credential().is_some()
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, InferenceError> {
        let token = self
            .config
            .credential()
            .ok_or(InferenceError::MissingCredential)?;

        let request = ChatRequest {
            model: &self.config.model,
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        debug!(model = %self.config.model, messages = messages.len(), "Sending chat completion");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(|e| InferenceError::Communication(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Inference API returned an error status");
            return Err(InferenceError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| InferenceError::InvalidResponse("response has no choices".to_string()))?;

        Ok(Completion {
            text,
            model: parsed.model.unwrap_or_else(|| self.config.model.clone()),
            usage: parsed.usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let provider = ChatCompletionProvider::new(InferenceConfig {
            base_url: "http://localhost:9000/v1/".to_string(),
            ..InferenceConfig::default()
        })
        .unwrap();
        assert_eq!(provider.endpoint(), "http://localhost:9000/v1/chat/completions");
    }

    #[test]
    fn test_request_serialization() {
        let messages = vec![ChatMessage::system("sys"), ChatMessage::user("hi")];
        let request = ChatRequest {
            model: "m",
            messages: &messages,
            max_tokens: 10,
            temperature: 0.5,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["max_tokens"], 10);
    }
}
