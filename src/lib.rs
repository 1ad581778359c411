//! # MediRAG - Medical Retrieval Augmented Generation Server
//!
//! An HTTP service that answers medical questions from an indexed corpus of
//! reference PDFs. Each question is embedded locally, the nearest passages
//! are fetched from a Pinecone index, and a Groq-hosted language model
//! answers from those passages only.
//!
//! ## Overview
//!
//! MediRAG can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `medirag-server` binary
//! 2. **As a library** - Embed [`RagPipeline`] in your own service
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use medirag::{Config, ConfigComponentFactory, PipelineSettings, RagPipeline};
//! use medirag::types::Question;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(Config::from_env()?);
//!     let pipeline = RagPipeline::new(
//!         ConfigComponentFactory::new(config.clone()),
//!         PipelineSettings::from_config(&config),
//!     );
//!
//!     let answer = pipeline
//!         .answer_question(&Question::parse("What is hypertension?")?)
//!         .await?;
//!     println!("{}", answer.into_inner());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `local-embeddings` | fastembed ONNX sentence embeddings (default) |
//! | `swagger-ui` | Interactive API documentation at `/swagger-ui/` |
//!
//! ## Architecture
//!
//! ```text
//! POST /api/ask ──► Question ──► Retriever ──► PromptTemplate ──► AnswerGenerator
//!                                  │   │                               │
//!                           Embedder   VectorStore (Pinecone)     LLMClient (Groq)
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// HTTP API handlers and routes.
pub mod api;
/// Command-line interface and terminal output.
pub mod cli;
/// Vector index clients (Pinecone, in-memory).
pub mod db;
/// LLM provider clients and answer generation.
pub mod llm;
/// Retrieval Augmented Generation (RAG) components.
pub mod rag;
/// Core types (requests, responses, errors).
pub mod types;
/// Configuration and logging setup.
pub mod utils;

// Re-export commonly used types
pub use db::{IndexSpec, InMemoryVectorStore, PineconeStore, VectorStore};
pub use llm::{AnswerGenerator, LLMClient, Provider};
pub use rag::{
    ComponentFactory, ConfigComponentFactory, PipelineComponents, PipelineSettings, RagPipeline,
};
pub use types::{AppError, Result};
pub use utils::config::Config;

use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Validated startup configuration
    pub config: Arc<Config>,
    /// Lazily initialized question answering pipeline
    pub pipeline: Arc<RagPipeline>,
}
