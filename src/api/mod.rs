//! HTTP API Handlers and Routes
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each endpoint
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//!
//! # API Endpoints
//!
//! - `GET /api/health` - Health check endpoint
//! - `POST /api/ask` - Answer a question: `{"question": "..."}` → `{"answer": "..."}`
//! - `GET /api/openapi.json` - OpenAPI document
//!
//! Errors are returned as `{"detail": "..."}` with status 400 for a blank
//! question and 500 when retrieval or generation fails.
//!
//! # OpenAPI Documentation
//!
//! When the `swagger-ui` feature is enabled, interactive API documentation
//! is available at `/swagger-ui/`.

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;

pub use routes::{create_router, ApiDoc};
