//! Retrieval Augmented Generation (RAG) Pipeline
//!
//! # Module Structure
//!
//! - [`rag::embeddings`](crate::rag::embeddings) - Sentence embedding models (fastembed)
//! - [`rag::retriever`](crate::rag::retriever) - Question embedding and nearest-chunk lookup
//! - [`rag::prompt`](crate::rag::prompt) - Fixed system template plus the raw question
//! - [`rag::pipeline`](crate::rag::pipeline) - Lazily initialized retrieve/assemble/generate flow
//! - [`rag::chunker`](crate::rag::chunker) - Text chunking for document processing
//! - [`rag::loader`](crate::rag::loader) - PDF discovery and text extraction
//! - [`rag::indexer`](crate::rag::indexer) - Offline chunk/embed/upsert
//!
//! # RAG Pipeline
//!
//! 1. **Ingestion** - PDFs are chunked and embedded (`medirag-server index`)
//! 2. **Storage** - Embeddings stored in the Pinecone index
//! 3. **Retrieval** - Question embedded, top-k similar chunks retrieved
//! 4. **Generation** - LLM answers from the retrieved context
//!
//! # Embedding Models
//!
//! - `sentence-transformers/all-MiniLM-L6-v2` - Lightweight (default)
//! - `BAAI/bge-small-en-v1.5` - Same dimension, often better quality
//! - `BAAI/bge-base-en-v1.5` - Higher quality, slower, needs a 768-d index

pub mod chunker;
pub mod embeddings;
pub mod indexer;
pub mod loader;
pub mod pipeline;
pub mod prompt;
pub mod retriever;

pub use pipeline::{ComponentFactory, ConfigComponentFactory, PipelineComponents, PipelineSettings, RagPipeline};
