use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use utoipa::ToSchema;

// ============= API Request/Response Types =============

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AskResponse {
    pub answer: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub detail: String,
}

// ============= Domain Types =============

/// A caller-supplied question that is known to contain non-whitespace text.
///
/// The raw text is kept as-is (including surrounding whitespace) because it is
/// forwarded verbatim to the language model; only the emptiness check trims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question(String);

impl Question {
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(AppError::InvalidInput("Question cannot be empty".into()));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Question {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Dense vector produced by the embedding model.
pub type EmbeddingVector = Vec<f32>;

/// A span of source text plus its embedding, as persisted in the vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    pub embedding: Option<EmbeddingVector>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    pub source: String,
    pub chunk_index: usize,
    pub embedding_model: String,
    pub indexed_at: DateTime<Utc>,
}

/// One similarity-search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub id: String,
    pub text: String,
    pub score: f32,
    pub source: Option<String>,
    pub embedding_model: Option<String>,
}

/// Top-k chunks for one question, ordered by descending score.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievedContext {
    pub chunks: Vec<SearchResult>,
}

impl RetrievedContext {
    pub fn new(chunks: Vec<SearchResult>) -> Self {
        Self { chunks }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunk texts joined with a blank line, in rank order.
    pub fn render(&self) -> String {
        self.chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Plain-text model output returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer(pub String);

impl Answer {
    pub fn into_inner(self) -> String {
        self.0
    }
}

// ============= Error Types =============

/// Failures while embedding the question or searching the vector index.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RetrievalError {
    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("vector index error: {0}")]
    VectorStore(String),

    #[error("vector index '{index}' is unavailable: {reason}")]
    IndexUnavailable { index: String, reason: String },

    #[error("dimension mismatch: index '{index}' expects {expected}, got {actual}")]
    DimensionMismatch {
        index: String,
        expected: usize,
        actual: usize,
    },
}

/// Failures while asking the language model for an answer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GenerationError {
    #[error("language model error: {0}")]
    Provider(String),

    #[error("language model returned an empty completion")]
    EmptyCompletion,
}

/// The single failure shape the HTTP layer has to translate.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PipelineError {
    #[error("RAG pipeline failed: initialization error: {0}")]
    Initialization(String),

    #[error("RAG pipeline failed: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("RAG pipeline failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("RAG pipeline failed: timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let (status, detail) = match self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Pipeline(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("RAG Error: {}", err),
            ),
            AppError::Configuration(msg)
            | AppError::Database(msg)
            | AppError::LLM(msg)
            | AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, axum::Json(ErrorResponse { detail })).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
