//! OpenAI-compatible chat-completions provider.
//!
//! Works against api.openai.com and any compatible gateway via the
//! `base_url` override. Requests JSON mode from the backend
//! (`response_format: json_object`); the repair parser still runs on the
//! reply, since JSON mode narrows but does not eliminate malformed output.

use super::{
    factory::ProviderFactory,
    secrets::{ApiCredential, CredentialSource},
    GradingProvider, ProviderError,
};
use async_trait::async_trait;
use rubric_core::{build_grading_prompt, interpret_response, GradingRequest, GradingResult,
    GRADER_SYSTEM_PROMPT};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Environment variable name for the OpenAI API key.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// OpenAI-compatible grading provider.
pub struct OpenAiProvider {
    credential: ApiCredential,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("credential", &self.credential)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl OpenAiProvider {
    /// Create a provider with the default model and endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            credential: ApiCredential::new(api_key, CredentialSource::Programmatic, "OpenAI API key"),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Create from the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self, ProviderError> {
        let credential = ApiCredential::from_env(OPENAI_API_KEY_ENV, "OpenAI API key")?;
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
            OPENAI_API_KEY_ENV,
            "OpenAI API key",
        )?;

        Ok(Self {
            credential,
            model: config["model"].as_str().unwrap_or(DEFAULT_MODEL).to_string(),
            base_url: config["base_url"].as_str().unwrap_or(DEFAULT_BASE_URL).to_string(),
            client: reqwest::Client::new(),
        })
    }

    /// Point the provider at a compatible gateway.
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
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatTurn>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatTurn {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
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

#[async_trait]
impl GradingProvider for OpenAiProvider {
    async fn grade(&self, request: &GradingRequest) -> Result<GradingResult, ProviderError> {
        let prompt = build_grading_prompt(request);

        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatTurn {
                    role: "system",
                    content: GRADER_SYSTEM_PROMPT.to_string(),
                },
                ChatTurn {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.5,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        tracing::debug!(model = %self.model, "dispatching grading request to OpenAI");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(upstream_error(status.as_u16(), &body));
        }

        let envelope: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Envelope(e.to_string()))?;

        let content = envelope
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Envelope("response contained no choices".to_string()))?
            .message
            .content
            .unwrap_or_else(|| "{}".to_string());

        Ok(interpret_response(&content))
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// Factory for creating OpenAI providers from configuration.
///
/// ## Configuration Format
/// ```json
/// {
///   "api_key": "sk-...",          // Optional, falls back to OPENAI_API_KEY env
///   "base_url": "https://...",     // Optional, compatible gateway endpoint
///   "model": "gpt-4o-mini"         // Optional
/// }
/// ```
pub struct OpenAiProviderFactory;

impl ProviderFactory for OpenAiProviderFactory {
    fn provider_type(&self) -> &'static str {
        "openai"
    }

    fn create(&self, config: &JsonValue) -> Result<Arc<dyn GradingProvider>, ProviderError> {
        Ok(Arc::new(OpenAiProvider::from_config(config)?))
    }

    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError> {
        if !ApiCredential::is_available(config, "api_key", OPENAI_API_KEY_ENV) {
            return Err(ProviderError::NotConfigured(format!(
                "OpenAI API key required: set 'api_key' in config or {} env",
                OPENAI_API_KEY_ENV
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
        "OpenAI-compatible chat-completions provider with JSON mode"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_defaults() {
        let provider = OpenAiProvider::new("test-key");
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.model, DEFAULT_MODEL);
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_from_config_overrides() {
        let config = serde_json::json!({
            "api_key": "config-key",
            "model": "gpt-4o",
            "base_url": "https://gateway.internal/v1"
        });

        let provider = OpenAiProvider::from_config(&config).unwrap();
        assert_eq!(provider.model, "gpt-4o");
        assert_eq!(provider.base_url, "https://gateway.internal/v1");
        assert_eq!(provider.credential.source(), CredentialSource::Config);
    }

    #[test]
    fn test_upstream_error_prefers_payload_message() {
        let body = r#"{"error": {"message": "insufficient quota", "type": "insufficient_quota"}}"#;
        let err = upstream_error(429, body);

        match err {
            ProviderError::Api { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "insufficient quota");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn test_upstream_error_falls_back_to_status() {
        let err = upstream_error(503, "<html>bad gateway</html>");
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_envelope_decodes_content() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "{\"score\": 4}"}}]}"#;
        let envelope: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            envelope.choices[0].message.content.as_deref(),
            Some("{\"score\": 4}")
        );
    }

    #[test]
    fn test_factory_create_and_validate() {
        let factory = OpenAiProviderFactory;
        assert_eq!(factory.provider_type(), "openai");

        let config = serde_json::json!({"api_key": "test-api-key"});
        assert!(factory.validate_config(&config).is_ok());
        assert_eq!(factory.create(&config).unwrap().name(), "openai");
    }

    #[test]
    fn test_factory_rejects_bad_base_url() {
        let factory = OpenAiProviderFactory;
        let config = serde_json::json!({"api_key": "k", "base_url": "ftp://nope"});
        assert!(factory.validate_config(&config).is_err());
    }

    #[test]
    fn test_api_key_not_in_debug_output() {
        let secret = "sk-super-secret-key-12345";
        let provider = OpenAiProvider::new(secret);

        let debug = format!("{:?}", provider);
        assert!(!debug.contains(secret), "API key exposed in Debug output");
        assert!(debug.contains("[REDACTED]"));
    }
}
