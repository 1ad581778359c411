//! Vector Store Abstraction Layer
//!
//! The retriever and the corpus indexer talk to the vector index through the
//! [`VectorStore`] trait so the HTTP service can run against Pinecone in
//! production and against [`InMemoryVectorStore`] in tests and local demos.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               VectorStore Trait               │
//! ├──────────────────────────────────────────────┤
//! │  ensure_index  │  upsert  │  search  │ count  │
//! └──────────────────────────────────────────────┘
//!          ▲                          ▲
//!    ┌─────┴─────┐             ┌──────┴──────┐
//!    │ Pinecone  │             │  In-memory  │
//!    │  (cloud)  │             │  (testing)  │
//!    └───────────┘             └─────────────┘
//! ```

use crate::types::{AppError, DocumentChunk, Result, SearchResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

// ============================================================================
// Index identity
// ============================================================================

/// Identity of a vector index: name, vector shape, and the embedding model
/// whose output it stores.
///
/// The live retriever and the offline indexer both derive this from the same
/// configuration; stores verify it against the remote index on connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    /// Index name, e.g. `medical-chatbot`
    pub name: String,
    /// Vector length produced by the embedding model
    pub dimension: usize,
    /// Similarity metric (`cosine`, `dotproduct` or `euclidean`)
    pub metric: String,
    /// Embedding model identifier recorded on every stored chunk
    pub embedding_model: String,
}

impl IndexSpec {
    /// Check an existing index's shape against this spec.
    ///
    /// The metric comparison ignores case.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Database`] naming both values when the dimension
    /// or the metric differ.
    pub fn verify(&self, dimension: usize, metric: &str) -> Result<()> {
        if dimension != self.dimension {
            return Err(AppError::Database(format!(
                "Index '{}' has dimension {} but embedding model '{}' produces {}",
                self.name, dimension, self.embedding_model, self.dimension
            )));
        }
        if !metric.eq_ignore_ascii_case(&self.metric) {
            return Err(AppError::Database(format!(
                "Index '{}' uses metric '{}', expected '{}'",
                self.name, metric, self.metric
            )));
        }
        Ok(())
    }
}

/// Shape and size of an index as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStats {
    /// Index name
    pub name: String,
    /// Vector length reported by the store
    pub dimension: usize,
    /// Similarity metric reported by the store
    pub metric: String,
    /// Whether `ensure_index` had to create the index.
    pub created: bool,
}

// ============================================================================
// Vector Store Trait
// ============================================================================

/// Storage and nearest-neighbour search over embedded chunks.
///
/// The pipeline shares one store across concurrent requests, so
/// implementations take `&self` and handle their own synchronization.
/// Index names are passed per call; [`ensure_index`](Self::ensure_index)
/// must succeed for a name before the other operations use it.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Get the name of this vector store provider, used in log fields.
    fn provider_name(&self) -> &'static str;

    /// Make sure the index described by `spec` exists, creating it if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable, creation fails, or an
    /// existing index disagrees with `spec` on dimension or metric.
    async fn ensure_index(&self, spec: &IndexSpec) -> Result<IndexStats>;

    /// Upsert chunks with their embeddings. Chunks are identified by `id`,
    /// so writing an existing id replaces it.
    ///
    /// Returns the number of chunks written.
    ///
    /// # Errors
    ///
    /// Returns an error if any chunk is missing an embedding, the index does
    /// not exist, or the store rejects the write.
    async fn upsert(&self, index: &str, chunks: &[DocumentChunk]) -> Result<usize>;

    /// The `limit` nearest chunks to `embedding`, sorted by descending score.
    ///
    /// Fewer results are returned when the index holds fewer chunks.
    ///
    /// # Errors
    ///
    /// Returns an error if the index does not exist or the store is
    /// unreachable.
    async fn search(&self, index: &str, embedding: &[f32], limit: usize)
        -> Result<Vec<SearchResult>>;

    /// Number of vectors stored in the index.
    ///
    /// # Errors
    ///
    /// Returns an error if the index does not exist or the store is
    /// unreachable.
    async fn count(&self, index: &str) -> Result<usize>;
}

/// Order hits by descending score, breaking ties by id so results are
/// deterministic for a fixed corpus and query.
pub fn rank_results(results: &mut Vec<SearchResult>, limit: usize) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    results.truncate(limit);
}

// ============================================================================
// In-Memory Vector Store (for testing)
// ============================================================================

/// In-memory vector store using cosine similarity.
///
/// Data is not persisted and will be lost when the process exits. Clones
/// share the same indexes. Every index scores with cosine similarity
/// whatever metric its spec names; the metric is only stored so that
/// `ensure_index` can verify it.
#[derive(Clone, Default)]
pub struct InMemoryVectorStore {
    indexes: Arc<RwLock<HashMap<String, InMemoryIndex>>>,
}

struct InMemoryIndex {
    dimension: usize,
    metric: String,
    chunks: HashMap<String, DocumentChunk>,
}

impl InMemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculate cosine similarity between two vectors.
    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot_product / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn provider_name(&self) -> &'static str {
        "in-memory"
    }

    async fn ensure_index(&self, spec: &IndexSpec) -> Result<IndexStats> {
        let mut indexes = self.indexes.write();
        let created = match indexes.get(&spec.name) {
            Some(existing) => {
                spec.verify(existing.dimension, &existing.metric)?;
                false
            }
            None => {
                indexes.insert(
                    spec.name.clone(),
                    InMemoryIndex {
                        dimension: spec.dimension,
                        metric: spec.metric.clone(),
                        chunks: HashMap::new(),
                    },
                );
                true
            }
        };

        Ok(IndexStats {
            name: spec.name.clone(),
            dimension: spec.dimension,
            metric: spec.metric.clone(),
            created,
        })
    }

    async fn upsert(&self, index: &str, chunks: &[DocumentChunk]) -> Result<usize> {
        let mut indexes = self.indexes.write();
        let idx = indexes
            .get_mut(index)
            .ok_or_else(|| AppError::Database(format!("Index '{}' not found", index)))?;

        for chunk in chunks {
            let embedding = chunk.embedding.as_ref().ok_or_else(|| {
                AppError::InvalidInput(format!("Chunk '{}' is missing embedding", chunk.id))
            })?;
            if embedding.len() != idx.dimension {
                return Err(AppError::Database(format!(
                    "Chunk '{}' has dimension {}, index '{}' expects {}",
                    chunk.id,
                    embedding.len(),
                    index,
                    idx.dimension
                )));
            }
        }

        for chunk in chunks {
            idx.chunks.insert(chunk.id.clone(), chunk.clone());
        }

        Ok(chunks.len())
    }

    async fn search(
        &self,
        index: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let indexes = self.indexes.read();
        let idx = indexes
            .get(index)
            .ok_or_else(|| AppError::Database(format!("Index '{}' not found", index)))?;

        let mut results: Vec<SearchResult> = idx
            .chunks
            .values()
            .filter_map(|chunk| {
                let chunk_embedding = chunk.embedding.as_ref()?;
                Some(SearchResult {
                    id: chunk.id.clone(),
                    text: chunk.text.clone(),
                    score: Self::cosine_similarity(embedding, chunk_embedding),
                    source: Some(chunk.metadata.source.clone()),
                    embedding_model: Some(chunk.metadata.embedding_model.clone()),
                })
            })
            .collect();

        rank_results(&mut results, limit);
        Ok(results)
    }

    async fn count(&self, index: &str) -> Result<usize> {
        let indexes = self.indexes.read();
        indexes
            .get(index)
            .map(|idx| idx.chunks.len())
            .ok_or_else(|| AppError::Database(format!("Index '{}' not found", index)))
    }
}

// ============================================================================
// Tests
// ============================================================================
