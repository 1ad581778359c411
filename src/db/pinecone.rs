//! Pinecone vector database integration.
//!
//! Talks to Pinecone's REST API directly:
//!
//! - **Control plane** (`https://api.pinecone.io`): describe and create
//!   serverless indexes.
//! - **Data plane** (the per-index `host` returned by describe): upsert,
//!   query and stats.
//!
//! Chunk text is stored under the `text` metadata key, the same layout
//! LangChain's `PineconeVectorStore` writes, so corpora indexed by other
//! tooling remain searchable.

use crate::db::vectorstore::{rank_results, IndexSpec, IndexStats, VectorStore};
use crate::types::{AppError, DocumentChunk, Result, SearchResult};
use crate::utils::config::PineconeConfig;
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::time::Duration;

const API_VERSION: &str = "2024-07";
const UPSERT_BATCH_SIZE: usize = 100;

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct IndexDescription {
    pub name: String,
    pub dimension: usize,
    pub metric: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub status: IndexStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndexStatus {
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    namespace: &'a str,
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize)]
struct UpsertVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexStatsResponse {
    #[serde(default)]
    namespaces: HashMap<String, NamespaceSummary>,
    #[serde(default)]
    total_vector_count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceSummary {
    #[serde(default)]
    vector_count: usize,
}

// ============================================================================
// Store
// ============================================================================

/// Pinecone-backed [`VectorStore`].
pub struct PineconeStore {
    http: reqwest::Client,
    controller_url: String,
    namespace: String,
    cloud: String,
    region: String,
    /// Index name → data-plane base URL, filled on first describe.
    hosts: RwLock<HashMap<String, String>>,
    ready_attempts: u32,
    ready_interval: Duration,
}

impl PineconeStore {
    pub fn new(config: &PineconeConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let api_key = HeaderValue::from_str(&config.api_key).map_err(|_| {
            AppError::Configuration("PINECONE_API_KEY contains invalid characters".into())
        })?;
        headers.insert("api-key", api_key);
        headers.insert("x-pinecone-api-version", HeaderValue::from_static(API_VERSION));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Database(format!("Failed to create Pinecone client: {}", e)))?;

        Ok(Self {
            http,
            controller_url: config.controller_url.trim_end_matches('/').to_string(),
            namespace: config.namespace.clone(),
            cloud: config.cloud.clone(),
            region: config.region.clone(),
            hosts: RwLock::new(HashMap::new()),
            ready_attempts: 60,
            ready_interval: Duration::from_secs(2),
        })
    }

    /// Override how long `ensure_index` waits for a freshly created index.
    pub fn with_ready_polling(mut self, attempts: u32, interval: Duration) -> Self {
        self.ready_attempts = attempts.max(1);
        self.ready_interval = interval;
        self
    }

    /// Describe an index; `None` if it does not exist.
    pub async fn describe_index(&self, name: &str) -> Result<Option<IndexDescription>> {
        let url = format!("{}/indexes/{}", self.controller_url, name);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Database(format!("Pinecone request failed: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response, "describe index").await?;
        let description: IndexDescription = response
            .json()
            .await
            .map_err(|e| AppError::Database(format!("Invalid describe index response: {}", e)))?;

        if !description.host.is_empty() {
            self.hosts
                .write()
                .insert(name.to_string(), data_plane_url(&description.host));
        }
        Ok(Some(description))
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        let url = format!("{}/indexes", self.controller_url);
        let body = json!({
            "name": spec.name,
            "dimension": spec.dimension,
            "metric": spec.metric,
            "spec": {
                "serverless": {
                    "cloud": self.cloud,
                    "region": self.region,
                }
            }
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Database(format!("Pinecone request failed: {}", e)))?;

        // Another process may have created it between our describe and create.
        if response.status() == StatusCode::CONFLICT {
            return Ok(());
        }
        check_status(response, "create index").await?;

        tracing::info!(
            index = %spec.name,
            dimension = spec.dimension,
            metric = %spec.metric,
            cloud = %self.cloud,
            region = %self.region,
            "Created Pinecone index"
        );
        Ok(())
    }

    async fn wait_until_ready(&self, name: &str) -> Result<IndexDescription> {
        for attempt in 1..=self.ready_attempts {
            if let Some(description) = self.describe_index(name).await? {
                if description.status.ready && !description.host.is_empty() {
                    return Ok(description);
                }
                tracing::debug!(
                    index = %name,
                    state = %description.status.state,
                    attempt,
                    "Waiting for Pinecone index"
                );
            }
            tokio::time::sleep(self.ready_interval).await;
        }

        Err(AppError::Database(format!(
            "Index '{}' did not become ready after {} attempts",
            name, self.ready_attempts
        )))
    }

    async fn host(&self, index: &str) -> Result<String> {
        if let Some(host) = self.hosts.read().get(index) {
            return Ok(host.clone());
        }

        match self.describe_index(index).await? {
            Some(description) if !description.host.is_empty() => {
                Ok(data_plane_url(&description.host))
            }
            Some(_) => Err(AppError::Database(format!(
                "Index '{}' has no data plane host yet",
                index
            ))),
            None => Err(AppError::Database(format!("Index '{}' not found", index))),
        }
    }

    async fn post_data_plane<B: Serialize + ?Sized>(
        &self,
        index: &str,
        path: &str,
        body: &B,
        operation: &str,
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.host(index).await?, path);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Database(format!("Pinecone request failed: {}", e)))?;
        check_status(response, operation).await
    }
}

#[async_trait]
impl VectorStore for PineconeStore {
    fn provider_name(&self) -> &'static str {
        "pinecone"
    }

    async fn ensure_index(&self, spec: &IndexSpec) -> Result<IndexStats> {
        let (description, created) = match self.describe_index(&spec.name).await? {
            Some(description) if description.status.ready && !description.host.is_empty() => {
                (description, false)
            }
            // Created by another process and still initializing.
            Some(_) => (self.wait_until_ready(&spec.name).await?, false),
            None => {
                self.create_index(spec).await?;
                (self.wait_until_ready(&spec.name).await?, true)
            }
        };

        spec.verify(description.dimension, &description.metric)?;

        Ok(IndexStats {
            name: description.name,
            dimension: description.dimension,
            metric: description.metric,
            created,
        })
    }

    async fn upsert(&self, index: &str, chunks: &[DocumentChunk]) -> Result<usize> {
        let mut total = 0;

        for batch in chunks.chunks(UPSERT_BATCH_SIZE) {
            let vectors = batch
                .iter()
                .map(|chunk| {
                    let values = chunk.embedding.as_deref().ok_or_else(|| {
                        AppError::InvalidInput(format!("Chunk '{}' is missing embedding", chunk.id))
                    })?;
                    Ok(UpsertVector {
                        id: &chunk.id,
                        values,
                        metadata: json!({
                            "text": chunk.text,
                            "source": chunk.metadata.source,
                            "chunk_index": chunk.metadata.chunk_index,
                            "embedding_model": chunk.metadata.embedding_model,
                            "indexed_at": chunk.metadata.indexed_at.to_rfc3339(),
                        }),
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let body = json!({ "vectors": vectors, "namespace": self.namespace });
            let response: UpsertResponse = self
                .post_data_plane(index, "/vectors/upsert", &body, "upsert")
                .await?
                .json()
                .await
                .map_err(|e| AppError::Database(format!("Invalid upsert response: {}", e)))?;

            total += response.upserted_count;
        }

        Ok(total)
    }

    async fn search(
        &self,
        index: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let request = QueryRequest {
            namespace: &self.namespace,
            vector: embedding,
            top_k: limit,
            include_metadata: true,
            include_values: false,
        };

        let response: QueryResponse = self
            .post_data_plane(index, "/query", &request, "query")
            .await?
            .json()
            .await
            .map_err(|e| AppError::Database(format!("Invalid query response: {}", e)))?;

        let mut results: Vec<SearchResult> = response
            .matches
            .into_iter()
            .filter_map(|m| {
                let metadata = m.metadata?;
                let text = metadata.get("text")?.as_str()?.to_string();
                let field = |key: &str| metadata.get(key).and_then(Value::as_str).map(String::from);
                Some(SearchResult {
                    id: m.id,
                    text,
                    score: m.score,
                    source: field("source"),
                    embedding_model: field("embedding_model"),
                })
            })
            .collect();

        rank_results(&mut results, limit);
        Ok(results)
    }

    async fn count(&self, index: &str) -> Result<usize> {
        let stats: IndexStatsResponse = self
            .post_data_plane(index, "/describe_index_stats", &json!({}), "describe index stats")
            .await?
            .json()
            .await
            .map_err(|e| AppError::Database(format!("Invalid index stats response: {}", e)))?;

        if self.namespace.is_empty() {
            return Ok(stats.total_vector_count);
        }
        Ok(stats
            .namespaces
            .get(&self.namespace)
            .map(|ns| ns.vector_count)
            .unwrap_or(0))
    }
}

/// Pinecone reports bare hostnames; tests and proxies may hand back full URLs.
fn data_plane_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

async fn check_status(response: reqwest::Response, operation: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AppError::Database(format!(
        "Pinecone {} failed ({}): {}",
        operation,
        status,
        body.trim()
    )))
}
