//! Mock implementations for testing
//!
//! Deterministic stand-ins for the embedding model, the vector index and the
//! language model, plus a [`MockFactory`] that assembles them into pipeline
//! components while counting how often it is asked to.

use async_trait::async_trait;
use chrono::Utc;
use medirag::db::{IndexSpec, IndexStats, InMemoryVectorStore, VectorStore};
use medirag::llm::{AnswerGenerator, LLMClient};
use medirag::rag::embeddings::Embedder;
use medirag::rag::pipeline::{ComponentFactory, PipelineComponents};
use medirag::rag::prompt::PromptTemplate;
use medirag::rag::retriever::Retriever;
use medirag::types::{
    AppError, ChunkMetadata, DocumentChunk, EmbeddingVector, PipelineError, Result, SearchResult,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const TEST_DIMENSION: usize = 8;
pub const TEST_INDEX: &str = "medical-test";
pub const TEST_MODEL: &str = "mock-embedder";

pub fn test_spec() -> IndexSpec {
    IndexSpec {
        name: TEST_INDEX.to_string(),
        dimension: TEST_DIMENSION,
        metric: "cosine".to_string(),
        embedding_model: TEST_MODEL.to_string(),
    }
}

// ============= Embedder =============

/// Bag-of-bytes embedder: equal text gives equal vectors, shared words pull
/// vectors together.
#[derive(Clone, Default)]
pub struct MockEmbedder {
    pub calls: Arc<AtomicUsize>,
    pub should_fail: bool,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn vector(text: &str) -> EmbeddingVector {
        let mut v = vec![0.0f32; TEST_DIMENSION];
        for word in text.to_lowercase().split_whitespace() {
            let bucket = word.bytes().map(|b| b as usize).sum::<usize>() % TEST_DIMENSION;
            v[bucket] += 1.0;
        }
        v
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    fn model_name(&self) -> &str {
        TEST_MODEL
    }

    fn dimensions(&self) -> usize {
        TEST_DIMENSION
    }

    async fn embed_query(&self, text: &str) -> Result<EmbeddingVector> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(AppError::Internal("Mock embedding failure".to_string()));
        }
        Ok(Self::vector(text))
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(AppError::Internal("Mock embedding failure".to_string()));
        }
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }
}

// ============= Vector store =============

/// Wraps an [`InMemoryVectorStore`], counting searches and optionally failing
/// every call as if the index were unreachable.
#[derive(Clone, Default)]
pub struct MockVectorStore {
    pub inner: InMemoryVectorStore,
    pub searches: Arc<AtomicUsize>,
    pub unreachable: Arc<AtomicBool>,
}

impl MockVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable() -> Self {
        let store = Self::default();
        store.unreachable.store(true, Ordering::SeqCst);
        store
    }

    /// Index `texts` under [`test_spec`] with [`MockEmbedder`] vectors.
    pub async fn seeded(texts: &[&str]) -> Self {
        let store = Self::new();
        store.inner.ensure_index(&test_spec()).await.unwrap();
        let chunks: Vec<DocumentChunk> = texts
            .iter()
            .enumerate()
            .map(|(i, text)| DocumentChunk {
                id: format!("chunk-{}", i),
                text: text.to_string(),
                metadata: ChunkMetadata {
                    source: "data/medical-book.pdf".to_string(),
                    chunk_index: i,
                    embedding_model: TEST_MODEL.to_string(),
                    indexed_at: Utc::now(),
                },
                embedding: Some(MockEmbedder::vector(text)),
            })
            .collect();
        store.inner.upsert(TEST_INDEX, &chunks).await.unwrap();
        store
    }

    fn check(&self) -> Result<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(AppError::Database(
                "Pinecone request failed: connection refused".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for MockVectorStore {
    fn provider_name(&self) -> &'static str {
        "mock"
    }

    async fn ensure_index(&self, spec: &IndexSpec) -> Result<IndexStats> {
        self.check()?;
        self.inner.ensure_index(spec).await
    }

    async fn upsert(&self, index: &str, chunks: &[DocumentChunk]) -> Result<usize> {
        self.check()?;
        self.inner.upsert(index, chunks).await
    }

    async fn search(
        &self,
        index: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.search(index, embedding, limit).await
    }

    async fn count(&self, index: &str) -> Result<usize> {
        self.check()?;
        self.inner.count(index).await
    }
}

// ============= LLM =============

/// Mock LLM client for testing with configurable responses
#[derive(Clone)]
pub struct MockLLMClient {
    pub response: String,
    pub should_fail: bool,
    pub calls: Arc<AtomicUsize>,
    /// Last (system, user) pair received.
    pub last_prompt: Arc<Mutex<Option<(String, String)>>>,
    pub delay: Duration,
    in_flight: Arc<AtomicUsize>,
    /// Highest number of overlapping calls observed.
    pub max_in_flight: Arc<AtomicUsize>,
}

impl MockLLMClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            should_fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
            last_prompt: Arc::new(Mutex::new(None)),
            delay: Duration::ZERO,
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::new("")
        }
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some((system.to_string(), prompt.to_string()));

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.should_fail {
            return Err(AppError::LLM("Mock LLM failure".to_string()));
        }
        Ok(self.response.clone())
    }

    fn model_name(&self) -> &str {
        "mock-llm"
    }
}

// ============= Component factory =============

/// Builds components from shared mocks and counts builds.
#[derive(Clone)]
pub struct MockFactory {
    pub embedder: MockEmbedder,
    pub store: MockVectorStore,
    pub llm: MockLLMClient,
    pub builds: Arc<AtomicUsize>,
    /// Number of initial builds that fail before one succeeds.
    pub failures_left: Arc<AtomicUsize>,
    pub build_delay: Duration,
}

impl MockFactory {
    pub fn new(store: MockVectorStore, llm: MockLLMClient) -> Self {
        Self {
            embedder: MockEmbedder::new(),
            store,
            llm,
            builds: Arc::new(AtomicUsize::new(0)),
            failures_left: Arc::new(AtomicUsize::new(0)),
            build_delay: Duration::ZERO,
        }
    }

    pub fn with_embedder(mut self, embedder: MockEmbedder) -> Self {
        self.embedder = embedder;
        self
    }

    pub fn failing_first(self, failures: usize) -> Self {
        self.failures_left.store(failures, Ordering::SeqCst);
        self
    }

    pub fn with_build_delay(mut self, delay: Duration) -> Self {
        self.build_delay = delay;
        self
    }

    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ComponentFactory for MockFactory {
    async fn build(&self) -> std::result::Result<PipelineComponents, PipelineError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        if !self.build_delay.is_zero() {
            tokio::time::sleep(self.build_delay).await;
        }

        let should_fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(PipelineError::Initialization(
                "embedding model download failed".to_string(),
            ));
        }

        let retriever = Retriever::new(
            Arc::new(self.embedder.clone()),
            Arc::new(self.store.clone()),
            test_spec(),
        )?;

        Ok(PipelineComponents {
            retriever,
            prompt: PromptTemplate::new(),
            generator: AnswerGenerator::new(Arc::new(self.llm.clone())),
        })
    }
}
