//! Chat completion backend and the primary/fallback reasoner.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::LlmError;

/// One chat message.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

/// Requested completion shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Text,
    JsonObject,
}

/// A transport capable of one chat completion call against one model.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        format: ResponseFormat,
        max_tokens: u32,
    ) -> Result<String, LlmError>;
}

/// OpenAI-compatible chat completions over HTTP (OpenRouter).
pub struct OpenRouterBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    referer: String,
    title: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

impl OpenRouterBackend {
    pub const DEFAULT_BASE_URL: &'static str = "https://openrouter.ai/api/v1";

    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(Self::DEFAULT_BASE_URL.to_string(), api_key)
    }

    pub fn with_base_url(base_url: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            referer: "http://localhost:3000".to_string(),
            title: "FormAutomation".to_string(),
        }
    }
}

#[async_trait]
impl ChatBackend for OpenRouterBackend {
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        format: ResponseFormat,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingKey)?;

        let mut body = serde_json::json!({
            "model": model,
            "messages": messages,
            "max_tokens": max_tokens,
        });
        if format == ResponseFormat::JsonObject {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Malformed(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::Malformed("empty choices".to_string()))
    }
}

/// Primary/fallback model pair over one backend.
///
/// A quota/credit-type failure from the primary slot is transparently
/// retried once against the fallback slot with identical inputs; any
/// other failure propagates unchanged.
pub struct Reasoner {
    backend: Box<dyn ChatBackend>,
    primary_model: String,
    fallback_model: String,
}

impl Reasoner {
    pub fn new(
        backend: Box<dyn ChatBackend>,
        primary_model: impl Into<String>,
        fallback_model: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            primary_model: primary_model.into(),
            fallback_model: fallback_model.into(),
        }
    }

    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        format: ResponseFormat,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        match self
            .backend
            .complete(&self.primary_model, messages, format, max_tokens)
            .await
        {
            Ok(text) => Ok(text),
            Err(e) if e.is_quota_error() => {
                tracing::warn!(
                    primary = %self.primary_model,
                    fallback = %self.fallback_model,
                    error = %e,
                    "Primary model out of quota, retrying on fallback",
                );
                self.backend
                    .complete(&self.fallback_model, messages, format, max_tokens)
                    .await
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records the models called and fails the primary slot on demand.
    struct ScriptedBackend {
        calls: Arc<Mutex<Vec<String>>>,
        fail_primary_with: Option<(u16, &'static str)>,
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn complete(
            &self,
            model: &str,
            _messages: &[ChatMessage],
            _format: ResponseFormat,
            _max_tokens: u32,
        ) -> Result<String, LlmError> {
            self.calls.lock().unwrap().push(model.to_string());
            if model == "primary" {
                if let Some((status, body)) = self.fail_primary_with {
                    return Err(LlmError::Api {
                        status,
                        body: body.to_string(),
                    });
                }
            }
            Ok(format!("answer from {model}"))
        }
    }

    fn reasoner(
        fail_primary_with: Option<(u16, &'static str)>,
    ) -> (Reasoner, Arc<Mutex<Vec<String>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let backend = Box::new(ScriptedBackend {
            calls: Arc::clone(&calls),
            fail_primary_with,
        });
        (Reasoner::new(backend, "primary", "fallback"), calls)
    }

    #[tokio::test]
    async fn primary_success_never_touches_fallback() {
        let (r, calls) = reasoner(None);
        let out = r
            .complete(&[ChatMessage::user("hi")], ResponseFormat::Text, 100)
            .await
            .unwrap();
        assert_eq!(out, "answer from primary");
        assert_eq!(*calls.lock().unwrap(), vec!["primary"]);
    }

    #[tokio::test]
    async fn quota_failure_falls_back_once() {
        let (r, calls) = reasoner(Some((402, "Insufficient credits")));
        let out = r
            .complete(&[ChatMessage::user("hi")], ResponseFormat::Text, 100)
            .await
            .unwrap();
        assert_eq!(out, "answer from fallback");
        assert_eq!(*calls.lock().unwrap(), vec!["primary", "fallback"]);
    }

    #[tokio::test]
    async fn non_quota_failure_propagates() {
        let (r, calls) = reasoner(Some((500, "boom")));
        let err = r
            .complete(&[ChatMessage::user("hi")], ResponseFormat::Text, 100)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 500, .. }));
        assert_eq!(*calls.lock().unwrap(), vec!["primary"]);
    }
}
