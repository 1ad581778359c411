//! Environment-driven configuration.
//!
//! Everything is read exactly once at startup into [`Config`]. Required
//! credentials that are missing, numbers that do not parse, and settings that
//! contradict each other are reported as [`AppError::Configuration`] so the
//! process refuses to start instead of failing on the first request.

use crate::db::IndexSpec;
use crate::rag::embeddings::EmbeddingModelType;
use crate::types::{AppError, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Origins of the local frontend dev servers.
pub const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:5173",
    "http://localhost:8080",
    "http://localhost:3000",
    "http://127.0.0.1:5173",
    "http://127.0.0.1:8080",
    "http://127.0.0.1:3000",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub pinecone: PineconeConfig,
    pub llm: LLMConfig,
    pub rag: RAGConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PineconeConfig {
    pub api_key: String,
    pub controller_url: String,
    pub index_name: String,
    pub namespace: String,
    pub cloud: String,
    pub region: String,
    pub metric: String,
}

#[derive(Debug, Clone)]
pub struct LLMConfig {
    pub groq_api_key: String,
    pub api_base: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct RAGConfig {
    pub embedding_model: String,
    pub top_k: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub request_timeout_secs: u64,
    pub max_in_flight: usize,
    pub eager_init: bool,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Emit prompt/answer level events for the LLM stage.
    pub llm_tracing: bool,
    pub llm_tracing_project: Option<String>,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(AppError::Configuration(format!(
                "Unknown log format '{}', expected 'pretty' or 'json'",
                other
            ))),
        }
    }
}

impl Config {
    /// Load configuration from the process environment (and `.env`, if present).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let pinecone_api_key = var("PINECONE_API_KEY");
        let groq_api_key = var("GROQ_API_KEY");
        let missing: Vec<&str> = [
            ("PINECONE_API_KEY", pinecone_api_key.is_none()),
            ("GROQ_API_KEY", groq_api_key.is_none()),
        ]
        .into_iter()
        .filter_map(|(key, absent)| absent.then_some(key))
        .collect();
        if !missing.is_empty() {
            return Err(AppError::Configuration(format!(
                "Missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        let cors_origins = match var("CORS_ALLOWED_ORIGINS") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            None => DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
        };

        let config = Config {
            server: ServerConfig {
                host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(&var, "PORT", 8000)?,
                cors_origins,
            },
            pinecone: PineconeConfig {
                api_key: pinecone_api_key.unwrap_or_default(),
                controller_url: var("PINECONE_CONTROLLER_URL")
                    .unwrap_or_else(|| "https://api.pinecone.io".to_string()),
                index_name: var("PINECONE_INDEX").unwrap_or_else(|| "medical-chatbot".to_string()),
                namespace: var("PINECONE_NAMESPACE").unwrap_or_default(),
                cloud: var("PINECONE_CLOUD").unwrap_or_else(|| "aws".to_string()),
                region: var("PINECONE_REGION").unwrap_or_else(|| "us-east-1".to_string()),
                metric: "cosine".to_string(),
            },
            llm: LLMConfig {
                groq_api_key: groq_api_key.unwrap_or_default(),
                api_base: var("GROQ_API_BASE")
                    .unwrap_or_else(|| "https://api.groq.com/openai/v1".to_string()),
                model: var("GROQ_MODEL").unwrap_or_else(|| "openai/gpt-oss-20b".to_string()),
                temperature: parse_or(&var, "LLM_TEMPERATURE", 0.0)?,
                max_tokens: parse_or(&var, "LLM_MAX_TOKENS", 200)?,
            },
            rag: RAGConfig {
                embedding_model: var("EMBEDDING_MODEL")
                    .unwrap_or_else(|| EmbeddingModelType::default().hf_name().to_string()),
                top_k: parse_or(&var, "RAG_TOP_K", 3)?,
                chunk_size: parse_or(&var, "CHUNK_SIZE", 500)?,
                chunk_overlap: parse_or(&var, "CHUNK_OVERLAP", 20)?,
                request_timeout_secs: parse_or(&var, "RAG_REQUEST_TIMEOUT_SECS", 60)?,
                max_in_flight: parse_or(&var, "RAG_MAX_IN_FLIGHT", 32)?,
                eager_init: parse_bool_or(&var, "RAG_EAGER_INIT", false)?,
            },
            telemetry: TelemetryConfig {
                llm_tracing: parse_bool_or(&var, "LLM_TRACING", false)?,
                llm_tracing_project: var("LLM_TRACING_PROJECT"),
                log_format: var("LOG_FORMAT")
                    .map(|v| v.parse::<LogFormat>())
                    .transpose()?
                    .unwrap_or(LogFormat::Pretty),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.rag.top_k == 0 {
            return Err(AppError::Configuration("RAG_TOP_K must be at least 1".into()));
        }
        if self.rag.chunk_size == 0 {
            return Err(AppError::Configuration("CHUNK_SIZE must be at least 1".into()));
        }
        if self.rag.chunk_overlap >= self.rag.chunk_size {
            return Err(AppError::Configuration(format!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
                self.rag.chunk_overlap, self.rag.chunk_size
            )));
        }
        if self.rag.max_in_flight == 0 {
            return Err(AppError::Configuration(
                "RAG_MAX_IN_FLIGHT must be at least 1".into(),
            ));
        }
        if self.rag.request_timeout_secs == 0 {
            return Err(AppError::Configuration(
                "RAG_REQUEST_TIMEOUT_SECS must be at least 1".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(AppError::Configuration(format!(
                "LLM_TEMPERATURE must be within 0.0..=2.0, got {}",
                self.llm.temperature
            )));
        }
        self.embedding_model()?;
        Ok(())
    }

    /// The embedding model shared by the retriever and the corpus indexer.
    pub fn embedding_model(&self) -> Result<EmbeddingModelType> {
        self.rag.embedding_model.parse()
    }

    /// Identity of the vector index. Both the live retriever and the offline
    /// indexer are built from this value.
    pub fn index_spec(&self) -> Result<IndexSpec> {
        let model = self.embedding_model()?;
        Ok(IndexSpec {
            name: self.pinecone.index_name.clone(),
            dimension: model.dimensions(),
            metric: self.pinecone.metric.clone(),
            embedding_model: model.hf_name().to_string(),
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.rag.request_timeout_secs)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            AppError::Configuration(format!("Invalid value for {}: '{}'", key, raw))
        }),
        None => Ok(default),
    }
}

fn parse_bool_or<F>(var: &F, key: &str, default: bool) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(AppError::Configuration(format!(
                "Invalid boolean for {}: '{}'",
                key, raw
            ))),
        },
        None => Ok(default),
    }
}
