use crate::api::handlers::{ask, health};
use crate::types::{AskRequest, AskResponse, ErrorResponse, HealthResponse};
use crate::AppState;
use axum::{
    http::HeaderValue,
    routing::{get, post},
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;

/// Questions are short; anything larger than this is not a question.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "MediRAG API",
        description = "Retrieval augmented question answering over a medical corpus"
    ),
    paths(health::health, ask::ask),
    components(schemas(AskRequest, AskResponse, HealthResponse, ErrorResponse)),
    tags(
        (name = "health", description = "Service liveness"),
        (name = "ask", description = "Question answering")
    )
)]
pub struct ApiDoc;

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health::health))
        .route("/ask", post(ask::ask))
        .route("/openapi.json", get(openapi_json));

    let app = Router::new().nest("/api", api);

    #[cfg(feature = "swagger-ui")]
    let app = app.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    let cors = cors_layer(&state.config.server.cors_origins);

    app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
            .layer(cors),
    )
    .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Allow-listed origins with credentials. Methods and headers are mirrored
/// from the preflight request, since a wildcard cannot be combined with
/// credentials.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
