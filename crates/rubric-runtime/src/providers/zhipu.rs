//! Zhipu AI (GLM) provider over its raw chat-completions endpoint.
//!
//! The plainest of the three transports: one bearer-authenticated POST to a
//! fixed endpoint. Non-2xx replies surface the upstream error message when
//! the payload can be decoded, and empty message content is a named hard
//! error; only a non-empty reply reaches the repair parser.

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

/// Environment variable name for the Zhipu API key.
pub const ZHIPU_API_KEY_ENV: &str = "ZHIPU_API_KEY";

const ENDPOINT: &str = "https://open.bigmodel.cn/api/paas/v4/chat/completions";
const DEFAULT_MODEL: &str = "glm-4-flash";

/// Zhipu AI grading provider.
pub struct ZhipuProvider {
    credential: ApiCredential,
    model: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for ZhipuProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZhipuProvider")
            .field("credential", &self.credential)
            .field("model", &self.model)
            .finish()
    }
}

impl ZhipuProvider {
    /// Create a provider with the default model.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            credential: ApiCredential::new(api_key, CredentialSource::Programmatic, "Zhipu API key"),
            model: DEFAULT_MODEL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Create from the `ZHIPU_API_KEY` environment variable.
    pub fn from_env() -> Result<Self, ProviderError> {
        let credential = ApiCredential::from_env(ZHIPU_API_KEY_ENV, "Zhipu API key")?;
        Ok(Self {
            credential,
            model: DEFAULT_MODEL.to_string(),
            client: reqwest::Client::new(),
        })
    }

    /// Create from JSON configuration with environment fallback for the key.
    pub fn from_config(config: &JsonValue) -> Result<Self, ProviderError> {
        let credential =
            ApiCredential::from_config_or_env(config, "api_key", ZHIPU_API_KEY_ENV, "Zhipu API key")?;

        Ok(Self {
            credential,
            model: config["model"].as_str().unwrap_or(DEFAULT_MODEL).to_string(),
            client: reqwest::Client::new(),
        })
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
}

#[derive(Debug, Serialize)]
struct ChatTurn {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Option<Vec<Choice>>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
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

/// Extract the message content, requiring it to be non-empty.
fn require_content(envelope: ChatCompletionResponse) -> Result<String, ProviderError> {
    envelope
        .choices
        .and_then(|mut choices| {
            if choices.is_empty() {
                None
            } else {
                choices.remove(0).message
            }
        })
        .and_then(|message| message.content)
        .filter(|content| !content.is_empty())
        .ok_or(ProviderError::EmptyResponse)
}

#[async_trait]
impl GradingProvider for ZhipuProvider {
    async fn grade(&self, request: &GradingRequest) -> Result<GradingResult, ProviderError> {
        let prompt = build_grading_prompt(request);

        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatTurn {
                    role: "system",
                    content: GRADER_SYSTEM_PROMPT_JSON.to_string(),
                },
                ChatTurn {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.3,
        };

        tracing::debug!(model = %self.model, "dispatching grading request to Zhipu");

        let response = self
            .client
            .post(ENDPOINT)
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

        let content = require_content(envelope)?;

        let mut result = interpret_response(&content);
        // This adapter promises the encouragement extension.
        result
            .encouragement
            .get_or_insert_with(Encouragement::placeholder);
        Ok(result)
    }

    fn name(&self) -> &str {
        "zhipu"
    }
}

/// Factory for creating Zhipu providers from configuration.
///
/// ## Configuration Format
/// ```json
/// {
///   "api_key": "...",        // Optional, falls back to ZHIPU_API_KEY env
///   "model": "glm-4-flash"   // Optional
/// }
/// ```
pub struct ZhipuProviderFactory;

impl ProviderFactory for ZhipuProviderFactory {
    fn provider_type(&self) -> &'static str {
        "zhipu"
    }

    fn create(&self, config: &JsonValue) -> Result<Arc<dyn GradingProvider>, ProviderError> {
        Ok(Arc::new(ZhipuProvider::from_config(config)?))
    }

    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError> {
        if !ApiCredential::is_available(config, "api_key", ZHIPU_API_KEY_ENV) {
            return Err(ProviderError::NotConfigured(format!(
                "Zhipu API key required: set 'api_key' in config or {} env",
                ZHIPU_API_KEY_ENV
            )));
        }
        Ok(())
    }

    fn default_config(&self) -> JsonValue {
        serde_json::json!({
            "model": DEFAULT_MODEL,
        })
    }

    fn description(&self) -> &'static str {
        "Zhipu AI (GLM) provider over raw chat completions"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_provider_defaults() {
        let provider = ZhipuProvider::new("test-key");
        assert_eq!(provider.name(), "zhipu");
        assert_eq!(provider.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_rate_limit_surfaces_upstream_message() {
        let body = r#"{"error": {"code": "1302", "message": "concurrency limit reached"}}"#;
        let err = upstream_error(429, body);

        match &err {
            ProviderError::Api { status, message } => {
                assert_eq!(*status, 429);
                assert_eq!(message, "concurrency limit reached");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
        assert!(err.to_string().contains("429"));
    }

    #[test]
    fn test_undecodable_error_body_falls_back_to_status() {
        let err = upstream_error(429, "not json");
        match err {
            ProviderError::Api { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "request failed: status 429");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_content_is_named_error() {
        let envelope: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": ""}}]}"#).unwrap();
        assert!(matches!(require_content(envelope), Err(ProviderError::EmptyResponse)));

        let envelope: ChatCompletionResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(require_content(envelope), Err(ProviderError::EmptyResponse)));

        let envelope: ChatCompletionResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(require_content(envelope), Err(ProviderError::EmptyResponse)));
    }

    #[test]
    fn test_content_extracted_from_first_choice() {
        let envelope: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": "{\"score\": 2}"}}]}"#,
        )
        .unwrap();
        assert_eq!(require_content(envelope).unwrap(), "{\"score\": 2}");
    }

    #[test]
    fn test_factory_create_and_validate() {
        let factory = ZhipuProviderFactory;
        assert_eq!(factory.provider_type(), "zhipu");

        let config = serde_json::json!({"api_key": "test-api-key"});
        assert!(factory.validate_config(&config).is_ok());
        assert_eq!(factory.create(&config).unwrap().name(), "zhipu");
    }

    #[test]
    fn test_api_key_not_in_debug_output() {
        let secret = "zhipu-super-secret-key-12345";
        let provider = ZhipuProvider::new(secret);

        let debug = format!("{:?}", provider);
        assert!(!debug.contains(secret), "API key exposed in Debug output");
        assert!(debug.contains("[REDACTED]"));
    }

    proptest! {
        #[test]
        fn prop_upstream_error_always_names_status_when_body_undecodable(
            status in 400u16..600,
            body in "[a-z <>/]{0,40}",
        ) {
            let err = upstream_error(status, &body);
            prop_assert!(err.to_string().contains(&status.to_string()));
        }
    }
}
