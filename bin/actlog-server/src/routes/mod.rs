//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (body limit, per-request trace id, CORS)
//! - Optional Swagger UI / OpenAPI spec endpoint (disable with `ACTLOG_ENABLE_SWAGGER=false`)
//! - Health route
//! - The `/log` ingest and query routes

pub mod doc;
mod health;
mod log;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use tower_http::limit::RequestBodyLimitLayer;
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware::{cors, trace};
use crate::state::AppState;

// ── Router builder ────────────────────────────────────────────────────────────

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let mut app = Router::new().merge(health::router()).merge(log::router());

    if state.config.enable_swagger {
        app = app.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", doc::get_docs()));
    }

    let body_limit = state.config.max_body_bytes;
    app.layer(DefaultBodyLimit::max(body_limit))
        .layer(cors::cors_layer(state.clone()))
        .layer(middleware::from_fn(trace::trace_middleware))
        // Outermost: the trace middleware buffers bodies, so cap them first.
        .layer(RequestBodyLimitLayer::new(body_limit))
        .with_state(state)
}
