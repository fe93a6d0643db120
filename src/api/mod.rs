//! API Layer - JSON HTTP surface for the patient registry
//!
//! Assembles the router: the registry routes under `/api/v1`, a health
//! probe, request tracing, and permissive CORS for the browser UI.

pub mod rest;

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::ai::AiService;
use crate::repository::PatientRepository;

/// Create the main API router.
pub fn router(repository: Arc<PatientRepository>, ai: Arc<AiService>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", rest::routes())
        .layer(Extension(repository))
        .layer(Extension(ai))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn health_check() -> &'static str {
    "OK"
}
