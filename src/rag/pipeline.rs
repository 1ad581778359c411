//! Question answering pipeline.
//!
//! [`RagPipeline`] starts *uninitialized*. The first request builds the
//! embedder, vector index client and language model client through its
//! [`ComponentFactory`]; concurrent first requests share that single build.
//! A failed build leaves the pipeline uninitialized so the next request
//! tries again.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{OnceCell, Semaphore};

use crate::db::{PineconeStore, VectorStore};
use crate::llm::{AnswerGenerator, GenerationParams, Provider};
use crate::rag::embeddings::create_embedder;
use crate::rag::prompt::PromptTemplate;
use crate::rag::retriever::Retriever;
use crate::types::{Answer, PipelineError, Question, RetrievalError};
use crate::utils::config::Config;

/// Delay between describe calls while a new index initializes.
const READY_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Describe attempts that fit in half of `deadline`, leaving the rest of the
/// request budget for retrieval and generation.
fn ready_poll_attempts(deadline: Duration) -> u32 {
    let budget = deadline.as_secs() / 2 / READY_POLL_INTERVAL.as_secs();
    u32::try_from(budget).unwrap_or(u32::MAX).max(1)
}

/// Everything a ready pipeline needs to answer a question.
pub struct PipelineComponents {
    pub retriever: Retriever,
    pub prompt: PromptTemplate,
    pub generator: AnswerGenerator,
}

/// Builds [`PipelineComponents`] on first use.
#[async_trait]
pub trait ComponentFactory: Send + Sync {
    async fn build(&self) -> Result<PipelineComponents, PipelineError>;
}

/// Per-request limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub top_k: usize,
    pub request_timeout: Duration,
    pub max_in_flight: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            top_k: 3,
            request_timeout: Duration::from_secs(60),
            max_in_flight: 32,
        }
    }
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            top_k: config.rag.top_k,
            request_timeout: config.request_timeout(),
            max_in_flight: config.rag.max_in_flight,
        }
    }
}

pub struct RagPipeline {
    factory: Box<dyn ComponentFactory>,
    components: OnceCell<Arc<PipelineComponents>>,
    settings: PipelineSettings,
    permits: Semaphore,
}

impl RagPipeline {
    pub fn new(factory: impl ComponentFactory + 'static, settings: PipelineSettings) -> Self {
        Self {
            factory: Box::new(factory),
            components: OnceCell::new(),
            permits: Semaphore::new(settings.max_in_flight.max(1)),
            settings,
        }
    }

    /// A pipeline that is already *ready*.
    pub fn from_components(components: PipelineComponents, settings: PipelineSettings) -> Self {
        Self {
            factory: Box::new(AlreadyBuilt),
            components: OnceCell::new_with(Some(Arc::new(components))),
            permits: Semaphore::new(settings.max_in_flight.max(1)),
            settings,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.components.initialized()
    }

    /// Build components now instead of on the first question.
    pub async fn warm_up(&self) -> Result<(), PipelineError> {
        self.components().await.map(|_| ())
    }

    async fn components(&self) -> Result<Arc<PipelineComponents>, PipelineError> {
        self.components
            .get_or_try_init(|| async {
                tracing::info!("Initializing RAG pipeline");
                match self.factory.build().await {
                    Ok(components) => {
                        tracing::info!(
                            index = %components.retriever.index().name,
                            model = %components.generator.model_name(),
                            "RAG pipeline ready"
                        );
                        Ok(Arc::new(components))
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "RAG pipeline initialization failed");
                        Err(e)
                    }
                }
            })
            .await
            .map(Arc::clone)
    }

    /// Retrieve context for `question`, assemble the prompt and generate an
    /// answer, all within the configured request deadline.
    pub async fn answer_question(&self, question: &Question) -> Result<Answer, PipelineError> {
        let deadline = self.settings.request_timeout;
        tokio::time::timeout(deadline, self.run(question))
            .await
            .map_err(|_| PipelineError::Timeout(deadline))?
    }

    async fn run(&self, question: &Question) -> Result<Answer, PipelineError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| PipelineError::Initialization("pipeline is shutting down".into()))?;

        let components = self.components().await?;

        let context = components
            .retriever
            .retrieve(question, self.settings.top_k)
            .await?;
        let prompt = components.prompt.assemble(&context, question);
        let answer = components.generator.generate(&prompt).await?;

        tracing::info!(
            chunks = context.len(),
            answer_chars = answer.0.len(),
            "Answered question"
        );
        Ok(answer)
    }
}

struct AlreadyBuilt;

#[async_trait]
impl ComponentFactory for AlreadyBuilt {
    async fn build(&self) -> Result<PipelineComponents, PipelineError> {
        Err(PipelineError::Initialization(
            "pipeline components were provided up front".into(),
        ))
    }
}

// ============================================================================
// Production factory
// ============================================================================

/// Builds the production stack from [`Config`]: local sentence-transformer
/// embeddings, a Pinecone index and Groq chat completions.
pub struct ConfigComponentFactory {
    config: Arc<Config>,
}

impl ConfigComponentFactory {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    fn provider(&self) -> Provider {
        Provider::Groq {
            api_key: self.config.llm.groq_api_key.clone(),
            api_base: self.config.llm.api_base.clone(),
            model: self.config.llm.model.clone(),
        }
    }
}

#[async_trait]
impl ComponentFactory for ConfigComponentFactory {
    async fn build(&self) -> Result<PipelineComponents, PipelineError> {
        let init = |e: crate::types::AppError| PipelineError::Initialization(e.to_string());

        let spec = self.config.index_spec().map_err(init)?;
        let embedder = create_embedder(self.config.embedding_model().map_err(init)?).map_err(init)?;

        let store = PineconeStore::new(&self.config.pinecone)
            .map_err(init)?
            .with_ready_polling(
                ready_poll_attempts(self.config.request_timeout()),
                READY_POLL_INTERVAL,
            );
        let stats = store.ensure_index(&spec).await.map_err(|e| {
            RetrievalError::IndexUnavailable {
                index: spec.name.clone(),
                reason: e.to_string(),
            }
        })?;
        tracing::info!(
            index = %stats.name,
            dimension = stats.dimension,
            metric = %stats.metric,
            created = stats.created,
            "Vector index available"
        );

        embedder.warm_up().await.map_err(init)?;
        let retriever = Retriever::new(embedder, Arc::new(store), spec)?;

        let params = GenerationParams {
            temperature: self.config.llm.temperature,
            max_tokens: self.config.llm.max_tokens,
        };
        let client = self.provider().create_client(params).map_err(init)?;
        let mut generator = AnswerGenerator::new(Arc::from(client));
        if self.config.telemetry.llm_tracing {
            let project = self
                .config
                .telemetry
                .llm_tracing_project
                .clone()
                .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());
            generator = generator.with_tracing(project);
        }

        Ok(PipelineComponents {
            retriever,
            prompt: PromptTemplate::new(),
            generator,
        })
    }
}
