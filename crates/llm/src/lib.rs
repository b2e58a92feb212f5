//! Reasoning capability client.
//!
//! The automation core consumes [`Reasoner`], which pairs a primary and
//! a fallback model slot over a [`ChatBackend`]. The shipped backend
//! speaks the OpenAI-compatible chat completions API (OpenRouter).

pub mod client;

pub use client::{ChatBackend, ChatMessage, OpenRouterBackend, Reasoner, ResponseFormat};

/// Errors from the reasoning layer.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("Reasoning API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The response body did not contain a completion.
    #[error("Malformed completion response: {0}")]
    Malformed(String),

    /// No API key is configured.
    #[error("Reasoning API key is not configured")]
    MissingKey,
}

impl LlmError {
    /// True for quota/credit-type failures that warrant one retry
    /// against the fallback model slot.
    pub fn is_quota_error(&self) -> bool {
        match self {
            Self::Api { status, body } => {
                matches!(status, 402 | 429) || {
                    let lower = body.to_lowercase();
                    lower.contains("credit")
                        || lower.contains("quota")
                        || lower.contains("rate limit")
                }
            }
            _ => false,
        }
    }
}
