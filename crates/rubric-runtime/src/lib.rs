//! # rubric-runtime
//!
//! LLM provider adapters for Rubric.
//!
//! `rubric-core` is fully deterministic and never makes network calls; this
//! crate supplies the other half: three interchangeable backends behind one
//! [`GradingProvider`] trait, selected by tag through the
//! [`ProviderRegistry`].
//!
//! Each grading call is independent and stateless: one network request, no
//! retries, no caching, no cross-call shared state. Callers that want
//! timeouts or retry policy layer them around the call.
//!
//! ## Example
//!
//! ```rust,ignore
//! use rubric_core::GradingRequest;
//! use rubric_runtime::ProviderRegistry;
//!
//! let registry = ProviderRegistry::with_defaults();
//! let provider = registry.create("zhipu", &serde_json::json!({ "api_key": "..." }))?;
//!
//! let request = GradingRequest::new(question, reference_answer, student_answer);
//! let result = provider.grade(&request).await?;
//! println!("{}: {}", result.score, result.score_label);
//! ```

pub mod providers;

pub use providers::{
    AnthropicProvider, AnthropicProviderFactory, ApiCredential, CredentialSource, GradingProvider,
    OpenAiProvider, OpenAiProviderFactory, ProviderError, ProviderFactory, ProviderRegistry,
    ZhipuProvider, ZhipuProviderFactory,
};
