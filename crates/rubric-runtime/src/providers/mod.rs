//! LLM provider adapters for Rubric.
//!
//! This module defines the capability trait grading callers program
//! against, plus the three backends: an OpenAI-compatible chat-completions
//! adapter, an Anthropic Messages adapter, and a raw-HTTP Zhipu adapter.
//! Each adapter makes exactly one network call per grading invocation and
//! funnels the response text through `rubric_core`'s parser and normalizer,
//! so the result invariants hold regardless of backend.
//!
//! ## Security
//!
//! All providers use the [`secrets`] module for credential handling. See
//! [`ApiCredential`] for the patterns.

use async_trait::async_trait;
use thiserror::Error;

use rubric_core::{GradingRequest, GradingResult};

mod anthropic;
mod factory;
mod openai;
pub mod secrets;
mod zhipu;

pub use anthropic::{AnthropicProvider, AnthropicProviderFactory};
pub use factory::{ProviderFactory, ProviderRegistry};
pub use openai::{OpenAiProvider, OpenAiProviderFactory};
pub use secrets::{ApiCredential, CredentialSource};
pub use zhipu::{ZhipuProvider, ZhipuProviderFactory};

/// Errors from grading providers.
///
/// Only transport- and protocol-level failures surface here. Malformed LLM
/// *text* is never an error: the repair parser absorbs it and the
/// normalizer produces a defaulted, still-valid result.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The HTTP request itself failed (connect, send, TLS).
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The backend answered non-2xx; carries the upstream message when the
    /// error payload could be decoded, else a generic status-coded one.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The provider's response envelope did not match its own wire
    /// contract.
    #[error("malformed response envelope: {0}")]
    Envelope(String),

    /// The backend returned a content block that is not text.
    #[error("expected a text response, got {0}")]
    InvalidResponseKind(String),

    /// The backend returned no content at all.
    #[error("provider returned empty content")]
    EmptyResponse,

    /// Missing credential, unknown provider tag, or invalid configuration.
    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

/// Provider abstraction allows swapping LLM backends.
///
/// One implementation per backend, selected by tag through the
/// [`ProviderRegistry`]. Exactly one network call per invocation; retry,
/// caching, and timeout policy belong to the caller.
#[async_trait]
pub trait GradingProvider: Send + Sync {
    /// Grade one submission with a single LLM call.
    async fn grade(&self, request: &GradingRequest) -> Result<GradingResult, ProviderError>;

    /// Provider tag for selection and metrics.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_message_carries_status_and_payload() {
        let err = ProviderError::Api {
            status: 429,
            message: "rate limit reached for requests".to_string(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("429"));
        assert!(rendered.contains("rate limit reached"));
    }

    #[test]
    fn test_named_protocol_errors_render() {
        assert!(ProviderError::EmptyResponse.to_string().contains("empty content"));
        assert!(ProviderError::InvalidResponseKind("image".to_string())
            .to_string()
            .contains("image"));
    }
}
