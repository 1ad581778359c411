//! Dense text embeddings.
//!
//! The retriever and the corpus indexer must embed with the same model,
//! otherwise similarity scores are meaningless. Both obtain an [`Embedder`]
//! from the configured [`EmbeddingModelType`], and every stored chunk records
//! the model's [`hf_name`](EmbeddingModelType::hf_name).

use std::str::FromStr;

use async_trait::async_trait;
use crate::types::{AppError, EmbeddingVector, Result};

// ============================================================================
// Embedding Model Types
// ============================================================================

/// Supported sentence-embedding models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EmbeddingModelType {
    /// all-MiniLM-L6-v2 - 384 dimensions, the model the medical corpus was indexed with
    #[default]
    AllMiniLML6V2,
    /// BGE Small English v1.5 - 384 dimensions
    BgeSmallEnV15,
    /// BGE Base English v1.5 - 768 dimensions
    BgeBaseEnV15,
}

impl EmbeddingModelType {
    /// Hugging Face model id, recorded alongside every stored chunk.
    pub fn hf_name(&self) -> &'static str {
        match self {
            Self::AllMiniLML6V2 => "sentence-transformers/all-MiniLM-L6-v2",
            Self::BgeSmallEnV15 => "BAAI/bge-small-en-v1.5",
            Self::BgeBaseEnV15 => "BAAI/bge-base-en-v1.5",
        }
    }

    /// Output vector length.
    pub fn dimensions(&self) -> usize {
        match self {
            Self::AllMiniLML6V2 | Self::BgeSmallEnV15 => 384,
            Self::BgeBaseEnV15 => 768,
        }
    }

    /// Convert to fastembed's EmbeddingModel enum
    #[cfg(feature = "local-embeddings")]
    pub fn to_fastembed_model(&self) -> fastembed::EmbeddingModel {
        match self {
            Self::AllMiniLML6V2 => fastembed::EmbeddingModel::AllMiniLML6V2,
            Self::BgeSmallEnV15 => fastembed::EmbeddingModel::BGESmallENV15,
            Self::BgeBaseEnV15 => fastembed::EmbeddingModel::BGEBaseENV15,
        }
    }
}

impl FromStr for EmbeddingModelType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sentence-transformers/all-minilm-l6-v2" | "all-minilm-l6-v2" => {
                Ok(Self::AllMiniLML6V2)
            }
            "baai/bge-small-en-v1.5" | "bge-small-en-v1.5" => Ok(Self::BgeSmallEnV15),
            "baai/bge-base-en-v1.5" | "bge-base-en-v1.5" => Ok(Self::BgeBaseEnV15),
            _ => Err(AppError::Configuration(format!(
                "Unknown embedding model: {}. Use one of: \
                 sentence-transformers/all-MiniLM-L6-v2, BAAI/bge-small-en-v1.5, BAAI/bge-base-en-v1.5",
                s
            ))),
        }
    }
}

impl std::fmt::Display for EmbeddingModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.hf_name())
    }
}

// ============================================================================
// Embedder Trait
// ============================================================================

/// Maps text to fixed-length vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier stored with indexed chunks.
    fn model_name(&self) -> &str;

    fn dimensions(&self) -> usize;

    /// Embed a single search query.
    async fn embed_query(&self, text: &str) -> Result<EmbeddingVector>;

    /// Embed a batch of passages, preserving order.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>>;

    /// Load weights ahead of the first embed call.
    async fn warm_up(&self) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// fastembed-backed Embedder
// ============================================================================

#[cfg(feature = "local-embeddings")]
pub use local::FastEmbedder;

/// Build the embedder for `model`. The server and the `index` command both go
/// through here so they cannot drift apart.
pub fn create_embedder(model: EmbeddingModelType) -> Result<std::sync::Arc<dyn Embedder>> {
    #[cfg(feature = "local-embeddings")]
    {
        Ok(std::sync::Arc::new(FastEmbedder::new(model)))
    }
    #[cfg(not(feature = "local-embeddings"))]
    {
        Err(AppError::Configuration(format!(
            "Embedding model {} needs the `local-embeddings` feature",
            model
        )))
    }
}

#[cfg(feature = "local-embeddings")]
mod local {
    use super::*;
    use fastembed::{InitOptions, TextEmbedding};
    use std::sync::Arc;
    use tokio::sync::{Mutex, OnceCell};

    /// Local ONNX sentence-transformer. Weights are downloaded and loaded on
    /// first use.
    pub struct FastEmbedder {
        model_type: EmbeddingModelType,
        model: OnceCell<Arc<Mutex<TextEmbedding>>>,
    }

    impl FastEmbedder {
        pub fn new(model_type: EmbeddingModelType) -> Self {
            Self {
                model_type,
                model: OnceCell::new(),
            }
        }

        /// Load the model now instead of on the first embed call.
        pub async fn load(&self) -> Result<()> {
            self.get_model().await.map(|_| ())
        }

        async fn get_model(&self) -> Result<Arc<Mutex<TextEmbedding>>> {
            self.model
                .get_or_try_init(|| async {
                    let model_type = self.model_type;
                    tokio::task::spawn_blocking(move || {
                        let options = InitOptions::new(model_type.to_fastembed_model())
                            .with_show_download_progress(true);
                        let model = TextEmbedding::try_new(options).map_err(|e| {
                            AppError::Internal(format!(
                                "Failed to load embedding model {}: {}",
                                model_type, e
                            ))
                        })?;
                        tracing::info!(model = %model_type, "Embedding model loaded");
                        Ok(Arc::new(Mutex::new(model)))
                    })
                    .await
                    .map_err(|e| AppError::Internal(format!("Embedding model task failed: {}", e)))?
                })
                .await
                .map(Arc::clone)
        }
    }

    #[async_trait]
    impl Embedder for FastEmbedder {
        fn model_name(&self) -> &str {
            self.model_type.hf_name()
        }

        fn dimensions(&self) -> usize {
            self.model_type.dimensions()
        }

        async fn embed_query(&self, text: &str) -> Result<EmbeddingVector> {
            self.embed_documents(&[text.to_string()])
                .await?
                .pop()
                .ok_or_else(|| AppError::Internal("Embedding model returned no vectors".into()))
        }

        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }

            let model = self.get_model().await?;
            let texts = texts.to_vec();
            tokio::task::spawn_blocking(move || {
                let mut model = model.blocking_lock();
                model.embed(texts, None)
            })
            .await
            .map_err(|e| AppError::Internal(format!("Embedding task failed: {}", e)))?
            .map_err(|e| AppError::Internal(format!("Embedding failed: {}", e)))
        }

        async fn warm_up(&self) -> Result<()> {
            self.load().await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("sentence-transformers/all-MiniLM-L6-v2", EmbeddingModelType::AllMiniLML6V2, 384)]
    #[case("all-minilm-l6-v2", EmbeddingModelType::AllMiniLML6V2, 384)]
    #[case("BAAI/bge-small-en-v1.5", EmbeddingModelType::BgeSmallEnV15, 384)]
    #[case("bge-base-en-v1.5", EmbeddingModelType::BgeBaseEnV15, 768)]
    fn test_parse_model(#[case] raw: &str, #[case] expected: EmbeddingModelType, #[case] dims: usize) {
        let model: EmbeddingModelType = raw.parse().unwrap();
        assert_eq!(model, expected);
        assert_eq!(model.dimensions(), dims);
    }

    #[test]
    fn test_unknown_model_is_configuration_error() {
        let err = "word2vec".parse::<EmbeddingModelType>().unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn test_display_round_trips_through_hf_name() {
        let model = EmbeddingModelType::default();
        assert_eq!(model.to_string().parse::<EmbeddingModelType>().unwrap(), model);
    }
}
