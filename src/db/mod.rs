//! Vector index clients.
//!
//! - [`PineconeStore`] - managed serverless index used in production
//! - [`InMemoryVectorStore`] - process-local index for tests and demos

#![allow(missing_docs)]

// Vector store abstraction layer
pub mod vectorstore;

// Provider implementations
pub mod pinecone;

// Re-exports
pub use pinecone::PineconeStore;
pub use vectorstore::{rank_results, IndexSpec, IndexStats, InMemoryVectorStore, VectorStore};
