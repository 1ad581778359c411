//! HTTP API tests against the full router with mocked downstream services.

mod common;

use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum_test::TestServer;
use common::mocks::{MockEmbedder, MockFactory, MockLLMClient, MockVectorStore};
use medirag::{
    api::{create_router, routes::MAX_BODY_BYTES},
    rag::pipeline::{PipelineSettings, RagPipeline},
    AppState, Config,
};
use serde_json::{json, Value};
use std::future::IntoFuture;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

const CORPUS: &[&str] = &[
    "Hypertension is persistently high arterial blood pressure.",
    "Acne is a skin condition affecting hair follicles.",
    "Asthma narrows the airways of the lungs.",
];

fn test_config() -> Arc<Config> {
    Arc::new(
        Config::from_lookup(|key| match key {
            "PINECONE_API_KEY" => Some("pc-test".to_string()),
            "GROQ_API_KEY" => Some("gsk-test".to_string()),
            _ => None,
        })
        .expect("test config"),
    )
}

fn create_test_server(factory: MockFactory) -> TestServer {
    let pipeline = RagPipeline::new(factory, PipelineSettings::default());
    let state = AppState {
        config: test_config(),
        pipeline: Arc::new(pipeline),
    };
    TestServer::new(create_router(state)).expect("Failed to create test server")
}

async fn seeded_factory(answer: &str) -> MockFactory {
    MockFactory::new(
        MockVectorStore::seeded(CORPUS).await,
        MockLLMClient::new(answer),
    )
}

// ============= Health =============

#[tokio::test]
async fn test_health_check() {
    let factory = seeded_factory("unused").await;
    let server = create_test_server(factory.clone());

    let response = server.get("/api/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "medirag-server");
    assert!(body["version"].is_string());
    assert_eq!(factory.build_count(), 0, "health must not initialize the pipeline");
}

#[tokio::test]
async fn test_health_check_with_broken_pipeline() {
    let factory = MockFactory::new(MockVectorStore::unreachable(), MockLLMClient::failing())
        .failing_first(usize::MAX);
    let server = create_test_server(factory);

    for _ in 0..3 {
        server.get("/api/health").await.assert_status_ok();
    }
}

// ============= Ask =============

#[tokio::test]
async fn test_ask_returns_answer() {
    let factory = seeded_factory("Hypertension is high blood pressure.").await;
    let server = create_test_server(factory.clone());

    let response = server
        .post("/api/ask")
        .json(&json!({ "question": "What is hypertension blood pressure?" }))
        .await;

    response.assert_status_ok();
    response.assert_json(&json!({ "answer": "Hypertension is high blood pressure." }));

    let (system, user) = factory.llm.last_prompt.lock().unwrap().clone().unwrap();
    assert!(system.starts_with("You are a question answering assistant."));
    assert!(system.contains("Hypertension is persistently high arterial blood pressure."));
    assert_eq!(user, "What is hypertension blood pressure?");
    assert_eq!(factory.store.searches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_ask_blank_question_is_rejected_without_downstream_calls() {
    let factory = seeded_factory("unused").await;
    let server = create_test_server(factory.clone());

    for question in ["", "   ", "\n\t"] {
        let response = server
            .post("/api/ask")
            .json(&json!({ "question": question }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({ "detail": "Question cannot be empty" }));
    }

    assert_eq!(factory.build_count(), 0);
    assert_eq!(factory.embedder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(factory.store.searches.load(Ordering::SeqCst), 0);
    assert_eq!(factory.llm.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_ask_vector_index_failure_is_500() {
    let factory = MockFactory::new(MockVectorStore::unreachable(), MockLLMClient::new("unused"));
    let server = create_test_server(factory.clone());

    let response = server
        .post("/api/ask")
        .json(&json!({ "question": "What is acne?" }))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("RAG Error: RAG pipeline failed:"), "{detail}");
    assert!(detail.contains("connection refused"), "{detail}");
    assert_eq!(factory.llm.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_ask_embedding_failure_is_500() {
    let factory = seeded_factory("unused")
        .await
        .with_embedder(MockEmbedder::failing());
    let server = create_test_server(factory);

    let response = server
        .post("/api/ask")
        .json(&json!({ "question": "What is acne?" }))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .contains("embedding failed: Internal error: Mock embedding failure"));
}

#[tokio::test]
async fn test_ask_llm_failure_is_500() {
    let factory = MockFactory::new(
        MockVectorStore::seeded(CORPUS).await,
        MockLLMClient::failing(),
    );
    let server = create_test_server(factory);

    let response = server
        .post("/api/ask")
        .json(&json!({ "question": "What is asthma?" }))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("RAG Error: "));
    assert!(detail.contains("Mock LLM failure"));
}

#[tokio::test]
async fn test_ask_empty_completion_is_500() {
    let factory = seeded_factory("   ").await;
    let server = create_test_server(factory);

    let response = server
        .post("/api/ask")
        .json(&json!({ "question": "What is asthma?" }))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert!(body["detail"].as_str().unwrap().contains("empty completion"));
}

#[tokio::test]
async fn test_failed_initialization_is_retried() {
    let factory = seeded_factory("Acne affects hair follicles.")
        .await
        .failing_first(1);
    let server = create_test_server(factory.clone());

    let first = server
        .post("/api/ask")
        .json(&json!({ "question": "What is acne?" }))
        .await;
    first.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = first.json();
    assert_eq!(
        body["detail"],
        "RAG Error: RAG pipeline failed: initialization error: embedding model download failed"
    );

    let second = server
        .post("/api/ask")
        .json(&json!({ "question": "What is acne?" }))
        .await;
    second.assert_status_ok();
    assert_eq!(factory.build_count(), 2);
}

#[tokio::test]
async fn test_concurrent_first_requests_initialize_once() {
    let factory = seeded_factory("Asthma narrows the airways.")
        .await
        .with_build_delay(Duration::from_millis(50));
    let server = create_test_server(factory.clone());

    let requests = (0..8).map(|_| {
        server
            .post("/api/ask")
            .json(&json!({ "question": "What is asthma?" }))
            .into_future()
    });
    let responses = futures::future::join_all(requests).await;

    for response in &responses {
        response.assert_status_ok();
    }
    assert_eq!(factory.build_count(), 1);
    assert_eq!(factory.llm.calls.load(Ordering::SeqCst), 8);
}

#[tokio::test]
async fn test_ask_malformed_body_is_client_error() {
    let factory = seeded_factory("unused").await;
    let server = create_test_server(factory.clone());

    let not_json = server.post("/api/ask").text("{question").await;
    assert!(not_json.status_code().is_client_error());

    let missing_field = server.post("/api/ask").json(&json!({ "query": "hi" })).await;
    assert!(missing_field.status_code().is_client_error());

    assert_eq!(factory.build_count(), 0);
}

#[tokio::test]
async fn test_ask_oversized_body_is_rejected() {
    let factory = seeded_factory("unused").await;
    let server = create_test_server(factory.clone());

    let question = "a".repeat(MAX_BODY_BYTES + 1);
    let response = server
        .post("/api/ask")
        .json(&json!({ "question": question }))
        .await;

    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(factory.build_count(), 0);
    assert_eq!(factory.llm.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_ask_large_question_within_limit_is_answered() {
    let server = create_test_server(seeded_factory("ok").await);

    let question = format!("What is asthma? {}", "detail ".repeat(1000));
    let response = server
        .post("/api/ask")
        .json(&json!({ "question": question }))
        .await;

    response.assert_status_ok();
}

// ============= CORS and docs =============

#[tokio::test]
async fn test_cors_preflight_allows_local_frontend() {
    let server = create_test_server(seeded_factory("unused").await);

    let response = server
        .method(Method::OPTIONS, "/api/ask")
        .add_header(
            HeaderName::from_static("origin"),
            HeaderValue::from_static("http://localhost:5173"),
        )
        .add_header(
            HeaderName::from_static("access-control-request-method"),
            HeaderValue::from_static("POST"),
        )
        .add_header(
            HeaderName::from_static("access-control-request-headers"),
            HeaderValue::from_static("content-type"),
        )
        .await;

    let headers = response.headers();
    assert_eq!(
        headers.get("access-control-allow-origin").unwrap(),
        "http://localhost:5173"
    );
    assert_eq!(headers.get("access-control-allow-credentials").unwrap(), "true");
    assert!(headers
        .get("access-control-allow-methods")
        .unwrap()
        .to_str()
        .unwrap()
        .contains("POST"));
}

#[tokio::test]
async fn test_cors_rejects_unknown_origin() {
    let server = create_test_server(seeded_factory("unused").await);

    let response = server
        .get("/api/health")
        .add_header(
            HeaderName::from_static("origin"),
            HeaderValue::from_static("https://evil.example.com"),
        )
        .await;

    response.assert_status_ok();
    assert!(response.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn test_openapi_document_lists_endpoints() {
    let server = create_test_server(seeded_factory("unused").await);

    let response = server.get("/api/openapi.json").await;

    response.assert_status_ok();
    let doc: Value = response.json();
    assert!(doc["paths"]["/api/ask"]["post"].is_object());
    assert!(doc["paths"]["/api/health"]["get"].is_object());
}
