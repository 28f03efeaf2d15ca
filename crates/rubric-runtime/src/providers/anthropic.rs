//! Anthropic Claude provider over the Messages API.
//!
//! The system prompt travels in a dedicated field rather than a message
//! turn, and the reply arrives as typed content blocks. A non-text first
//! block is a protocol violation surfaced as a named error; the block's
//! text still goes through the shared repair parser afterwards.
//!
//! ## Security
//!
//! The API key is held in an [`ApiCredential`]; see the
//! [`secrets`](super::secrets) module.

use super::{
    factory::ProviderFactory,
    secrets::{ApiCredential, CredentialSource},
    GradingProvider, ProviderError,
};
use async_trait::async_trait;
use rubric_core::{build_grading_prompt, interpret_response, Encouragement, GradingRequest,
    GradingResult, GRADER_SYSTEM_PROMPT_JSON};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Environment variable name for the Anthropic API key.
pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 2048;

/// Anthropic Claude grading provider.
pub struct AnthropicProvider {
    credential: ApiCredential,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("credential", &self.credential)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl AnthropicProvider {
    /// Create a provider with the default model and endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            credential: ApiCredential::new(
                api_key,
                CredentialSource::Programmatic,
                "Anthropic API key",
            ),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Create from the `ANTHROPIC_API_KEY` environment variable.
    pub fn from_env() -> Result<Self, ProviderError> {
        let credential = ApiCredential::from_env(ANTHROPIC_API_KEY_ENV, "Anthropic API key")?;
        Ok(Self {
            credential,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        })
    }

    /// Create from JSON configuration with environment fallback for the key.
    pub fn from_config(config: &JsonValue) -> Result<Self, ProviderError> {
        let credential = ApiCredential::from_config_or_env(
            config,
            "api_key",
            ANTHROPIC_API_KEY_ENV,
            "Anthropic API key",
        )?;

        Ok(Self {
            credential,
            model: config["model"].as_str().unwrap_or(DEFAULT_MODEL).to_string(),
            base_url: config["base_url"].as_str().unwrap_or(DEFAULT_BASE_URL).to_string(),
            client: reqwest::Client::new(),
        })
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Override the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<MessageTurn>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct MessageTurn {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Map a non-2xx reply to an API error, preferring the upstream message.
fn upstream_error(status: u16, body: &str) -> ProviderError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error)
        .map(|detail| detail.message)
        .unwrap_or_else(|| format!("request failed: status {}", status));

    ProviderError::Api { status, message }
}

/// Pull the text out of the first content block.
///
/// A non-text block is a transport-contract violation, not a
/// content-quality issue, so it surfaces as a named hard error rather
/// than falling through to the repair parser.
fn first_text_block(mut blocks: Vec<ContentBlock>) -> Result<String, ProviderError> {
    if blocks.is_empty() {
        return Err(ProviderError::Envelope(
            "response contained no content blocks".to_string(),
        ));
    }
    let block = blocks.remove(0);
    if block.kind != "text" {
        return Err(ProviderError::InvalidResponseKind(block.kind));
    }
    block
        .text
        .ok_or_else(|| ProviderError::Envelope("text block had no text".to_string()))
}

#[async_trait]
impl GradingProvider for AnthropicProvider {
    async fn grade(&self, request: &GradingRequest) -> Result<GradingResult, ProviderError> {
        let prompt = build_grading_prompt(request);

        let body = MessagesRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            system: GRADER_SYSTEM_PROMPT_JSON.to_string(),
            messages: vec![MessageTurn {
                role: "user",
                content: prompt,
            }],
            temperature: 0.3,
        };

        tracing::debug!(model = %self.model, "dispatching grading request to Anthropic");

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", self.credential.expose())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(upstream_error(status.as_u16(), &body));
        }

        let envelope: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Envelope(e.to_string()))?;

        let text = first_text_block(envelope.content)?;

        let mut result = interpret_response(&text);
        // This adapter promises the encouragement extension.
        result
            .encouragement
            .get_or_insert_with(Encouragement::placeholder);
        Ok(result)
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}

/// Factory for creating Anthropic providers from configuration.
///
/// ## Configuration Format
/// ```json
/// {
///   "api_key": "sk-ant-...",              // Optional, falls back to ANTHROPIC_API_KEY env
///   "base_url": "https://...",             // Optional, custom API endpoint
///   "model": "claude-3-5-sonnet-20241022"  // Optional
/// }
/// ```
pub struct AnthropicProviderFactory;

impl ProviderFactory for AnthropicProviderFactory {
    fn provider_type(&self) -> &'static str {
        "anthropic"
    }

    fn create(&self, config: &JsonValue) -> Result<Arc<dyn GradingProvider>, ProviderError> {
        Ok(Arc::new(AnthropicProvider::from_config(config)?))
    }

    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError> {
        if !ApiCredential::is_available(config, "api_key", ANTHROPIC_API_KEY_ENV) {
            return Err(ProviderError::NotConfigured(format!(
                "Anthropic API key required: set 'api_key' in config or {} env",
                ANTHROPIC_API_KEY_ENV
            )));
        }

        if let Some(url) = config["base_url"].as_str() {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ProviderError::NotConfigured(
                    "base_url must start with http:// or https://".to_string(),
                ));
            }
        }

        Ok(())
    }

    fn default_config(&self) -> JsonValue {
        serde_json::json!({
            "model": DEFAULT_MODEL,
        })
    }

    fn description(&self) -> &'static str {
        "Anthropic Claude provider over the Messages API"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_defaults() {
        let provider = AnthropicProvider::new("test-key");
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.model, DEFAULT_MODEL);
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_from_config_with_custom_base_url() {
        let config = serde_json::json!({
            "api_key": "config-api-key",
            "base_url": "https://custom.api.com/v1"
        });

        let provider = AnthropicProvider::from_config(&config).unwrap();
        assert_eq!(provider.base_url, "https://custom.api.com/v1");
        assert_eq!(provider.credential.source(), CredentialSource::Config);
    }

    #[test]
    fn test_first_text_block_extracts_text() {
        let blocks = vec![ContentBlock {
            kind: "text".to_string(),
            text: Some("{\"score\": 5}".to_string()),
        }];
        assert_eq!(first_text_block(blocks).unwrap(), "{\"score\": 5}");
    }

    #[test]
    fn test_non_text_block_is_invalid_response_kind() {
        let blocks = vec![ContentBlock {
            kind: "tool_use".to_string(),
            text: None,
        }];

        match first_text_block(blocks) {
            Err(ProviderError::InvalidResponseKind(kind)) => assert_eq!(kind, "tool_use"),
            other => panic!("expected InvalidResponseKind, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_content_is_envelope_error() {
        assert!(matches!(
            first_text_block(Vec::new()),
            Err(ProviderError::Envelope(_))
        ));
    }

    #[test]
    fn test_upstream_error_decodes_anthropic_payload() {
        let body = r#"{"error": {"type": "overloaded_error", "message": "Overloaded"}}"#;
        let err = upstream_error(529, body);
        assert!(err.to_string().contains("Overloaded"));
    }

    #[test]
    fn test_factory_create_with_api_key() {
        let factory = AnthropicProviderFactory;
        let config = serde_json::json!({"api_key": "test-api-key"});
        assert_eq!(factory.create(&config).unwrap().name(), "anthropic");
    }

    #[test]
    fn test_factory_default_config() {
        let factory = AnthropicProviderFactory;
        assert_eq!(factory.default_config()["model"], DEFAULT_MODEL);
    }

    #[test]
    fn test_api_key_not_in_debug_output() {
        let secret = "sk-ant-REDACTED";
        let provider = AnthropicProvider::new(secret);

        let debug = format!("{:?}", provider);
        assert!(!debug.contains(secret), "API key exposed in Debug output");
        assert!(debug.contains("[REDACTED]"));
    }
}
