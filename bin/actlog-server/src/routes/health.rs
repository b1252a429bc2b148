//! Health endpoint.

use std::sync::Arc;

use actlog_core::ActionLogStore;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tracing::warn;
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_health))]
pub struct HealthApi;

/// Register health-check routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

/// Report liveness and whether the store answers.
///
/// Load-balancers and monitoring systems should poll this endpoint.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Server and store are healthy", body = Value),
        (status = 503, description = "Store unreachable", body = Value),
    )
)]
pub async fn get_health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let counts = async {
        let sessions = state.store.count_sessions().await?;
        let actions = state.store.count_actions().await?;
        Ok::<_, actlog_core::Error>((sessions, actions))
    };

    match counts.await {
        Ok((sessions, actions)) => (
            StatusCode::OK,
            Json(json!({
                "status":   "ok",
                "version":  env!("CARGO_PKG_VERSION"),
                "sessions": sessions,
                "actions":  actions,
            })),
        ),
        Err(e) => {
            warn!(error = %e, "health check could not reach the store");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status":  "unavailable",
                    "version": env!("CARGO_PKG_VERSION"),
                })),
            )
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
