//! LLM Provider Clients and Abstractions
//!
//! - [`LLMClient`] - The core trait that all providers implement
//! - [`Provider`] - Runtime provider selection (Groq)
//! - [`AnswerGenerator`] - Turns an assembled prompt into an answer
//!
//! # Example
//!
//! ```ignore
//! use medirag::llm::{GenerationParams, Provider};
//!
//! let provider = Provider::Groq {
//!     api_key: std::env::var("GROQ_API_KEY")?,
//!     api_base: "https://api.groq.com/openai/v1".to_string(),
//!     model: "openai/gpt-oss-20b".to_string(),
//! };
//! let client = provider.create_client(GenerationParams::default())?;
//! let reply = client.generate_with_system("Be brief.", "What is 2+2?").await?;
//! ```

/// Core LLM client trait and provider selection.
pub mod client;
/// Answer generation with empty-completion checks.
pub mod generator;
pub mod openai;

pub use client::{GenerationParams, LLMClient, Provider};
pub use generator::AnswerGenerator;
pub use openai::OpenAIClient;
