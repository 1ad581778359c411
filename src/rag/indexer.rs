//! Offline corpus indexing: chunk, embed, upsert.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::db::{IndexSpec, VectorStore};
use crate::rag::chunker::TextChunker;
use crate::rag::embeddings::Embedder;
use crate::rag::loader::SourceDocument;
use crate::types::{AppError, ChunkMetadata, DocumentChunk, Result};

pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Summary of one indexing run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub documents: usize,
    pub chunks: usize,
    pub upserted: usize,
    /// Whether the index had to be created.
    pub created_index: bool,
}

/// Writes a corpus into the same index the retriever reads from.
pub struct CorpusIndexer {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    spec: IndexSpec,
    chunker: TextChunker,
    batch_size: usize,
}

impl CorpusIndexer {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        spec: IndexSpec,
        chunker: TextChunker,
    ) -> Self {
        Self {
            embedder,
            store,
            spec,
            chunker,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub async fn index_documents(&self, documents: &[SourceDocument]) -> Result<IndexReport> {
        if self.embedder.dimensions() != self.spec.dimension {
            return Err(AppError::Configuration(format!(
                "Embedding model '{}' produces {} dimensions but index '{}' expects {}",
                self.embedder.model_name(),
                self.embedder.dimensions(),
                self.spec.name,
                self.spec.dimension
            )));
        }

        let pending: Vec<(&str, usize, String)> = documents
            .iter()
            .flat_map(|doc| {
                self.chunker
                    .chunk(&doc.text)
                    .into_iter()
                    .enumerate()
                    .map(move |(i, text)| (doc.source.as_str(), i, text))
            })
            .collect();

        if pending.is_empty() {
            return Err(AppError::InvalidInput(
                "No text chunks produced from the corpus".into(),
            ));
        }

        let stats = self.store.ensure_index(&self.spec).await?;

        let indexed_at = Utc::now();
        let mut upserted = 0;
        for (batch_no, batch) in pending.chunks(self.batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|(_, _, text)| text.clone()).collect();
            let embeddings = self.embedder.embed_documents(&texts).await?;
            if embeddings.len() != batch.len() {
                return Err(AppError::Internal(format!(
                    "Embedding model returned {} vectors for {} chunks",
                    embeddings.len(),
                    batch.len()
                )));
            }

            let chunks: Vec<DocumentChunk> = batch
                .iter()
                .zip(embeddings)
                .map(|((source, chunk_index, text), embedding)| DocumentChunk {
                    id: Uuid::new_v4().to_string(),
                    text: text.clone(),
                    metadata: ChunkMetadata {
                        source: source.to_string(),
                        chunk_index: *chunk_index,
                        embedding_model: self.embedder.model_name().to_string(),
                        indexed_at,
                    },
                    embedding: Some(embedding),
                })
                .collect();

            upserted += self.store.upsert(&self.spec.name, &chunks).await?;
            tracing::info!(
                store = self.store.provider_name(),
                index = %self.spec.name,
                batch = batch_no + 1,
                upserted,
                total = pending.len(),
                "Upserted batch"
            );
        }

        Ok(IndexReport {
            documents: documents.len(),
            chunks: pending.len(),
            upserted,
            created_index: stats.created,
        })
    }
}
