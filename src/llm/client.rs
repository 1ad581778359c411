//! LLM Client abstractions and provider management
//!
//! Answers are generated by Groq, which serves an OpenAI-compatible chat
//! completions API. The [`LLMClient`] trait is the seam between the pipeline
//! and the provider:
//!
//! - [`OpenAIClient`](super::openai::OpenAIClient) drives the real endpoint
//! - test doubles implement the trait directly
//!
//! Provider selection happens once, when the pipeline is built, through
//! [`Provider::create_client`].

use crate::types::{AppError, Result};
use async_trait::async_trait;

/// Generic LLM client trait for provider abstraction
///
/// All LLM providers implement this trait, allowing for easy swapping
/// between providers without changing application code.
///
/// Implementations must be cheap to share: the pipeline holds one client
/// behind an `Arc` and calls it from every concurrent request.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate a completion from a system message and a user message
    ///
    /// The system message carries the instructions and the retrieved
    /// context; the user message is the caller's question, unmodified.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::LLM`] if the provider is unreachable, rejects the
    /// request, or replies without any message content.
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Sampling settings applied to every completion request.
///
/// The defaults give deterministic, short answers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    /// Sampling temperature (`0.0` = greedy decoding)
    pub temperature: f32,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: 200,
        }
    }
}

/// Provider enum for runtime selection
///
/// # Supported Providers
///
/// | Provider | Endpoint | Notes |
/// |----------|----------|-------|
/// | Groq | `https://api.groq.com/openai/v1` | OpenAI-compatible chat completions |
#[derive(Debug, Clone)]
pub enum Provider {
    /// Groq's OpenAI-compatible endpoint
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::Groq {
    ///     api_key: "gsk_...".to_string(),
    ///     api_base: "https://api.groq.com/openai/v1".to_string(),
    ///     model: "openai/gpt-oss-20b".to_string(),
    /// };
    /// ```
    Groq {
        /// API key sent as a bearer token
        api_key: String,
        /// Base URL, without the `/chat/completions` suffix
        api_base: String,
        /// Model identifier, e.g. `openai/gpt-oss-20b`
        model: String,
    },
}

impl Provider {
    /// Create a client instance for this provider
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is empty.
    pub fn create_client(&self, params: GenerationParams) -> Result<Box<dyn LLMClient>> {
        match self {
            Provider::Groq {
                api_key,
                api_base,
                model,
            } => {
                if api_key.trim().is_empty() {
                    return Err(AppError::LLM(format!("{} API key is empty", self.name())));
                }
                Ok(Box::new(
                    super::openai::OpenAIClient::new(
                        api_key.clone(),
                        api_base.clone(),
                        model.clone(),
                    )
                    .with_params(params),
                ))
            }
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Groq { .. } => "Groq",
        }
    }
}
