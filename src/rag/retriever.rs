use std::sync::Arc;

use crate::db::{IndexSpec, VectorStore};
use crate::rag::embeddings::Embedder;
use crate::types::{Question, RetrievalError, RetrievedContext};

/// Embeds a question and fetches the nearest chunks from the vector index.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    index: IndexSpec,
}

impl Retriever {
    /// Pair an embedder with an index. The embedder must produce vectors of
    /// the index's dimension.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        index: IndexSpec,
    ) -> Result<Self, RetrievalError> {
        if embedder.dimensions() != index.dimension {
            return Err(RetrievalError::DimensionMismatch {
                index: index.name,
                expected: index.dimension,
                actual: embedder.dimensions(),
            });
        }
        Ok(Self {
            embedder,
            store,
            index,
        })
    }

    pub fn index(&self) -> &IndexSpec {
        &self.index
    }

    pub async fn retrieve(
        &self,
        question: &Question,
        k: usize,
    ) -> Result<RetrievedContext, RetrievalError> {
        let embedding = self
            .embedder
            .embed_query(question.as_str())
            .await
            .map_err(|e| RetrievalError::Embedding(e.to_string()))?;

        if embedding.len() != self.index.dimension {
            return Err(RetrievalError::DimensionMismatch {
                index: self.index.name.clone(),
                expected: self.index.dimension,
                actual: embedding.len(),
            });
        }

        let results = self
            .store
            .search(&self.index.name, &embedding, k)
            .await
            .map_err(|e| RetrievalError::VectorStore(e.to_string()))?;

        for hit in &results {
            if let Some(model) = hit.embedding_model.as_deref() {
                if model != self.embedder.model_name() {
                    tracing::warn!(
                        chunk = %hit.id,
                        stored_model = %model,
                        live_model = %self.embedder.model_name(),
                        "Chunk was indexed with a different embedding model"
                    );
                }
            }
        }

        tracing::debug!(
            store = self.store.provider_name(),
            index = %self.index.name,
            k,
            hits = results.len(),
            top_score = results.first().map(|r| r.score),
            "Retrieved context"
        );

        Ok(RetrievedContext::new(results))
    }
}
