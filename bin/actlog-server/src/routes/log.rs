//! `/log` ingest and query endpoints.

use std::sync::Arc;

use actlog_core::ActionLogStore;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::routing::post;
use axum::{Json, Router};
use tracing::info;
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::log::{
    ActionListResponse, ActionQuery, ActionRequest, ActionResponse, ErrorResponse, LogAck,
    LogBatchRequest,
};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(post_log, get_log),
    components(schemas(
        LogBatchRequest,
        ActionRequest,
        LogAck,
        ErrorResponse,
        ActionResponse,
        ActionListResponse
    ))
)]
pub struct LogApi;

/// Register log routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/log", post(post_log).get(get_log))
}

/// Ingest one batch of actions for a user session.
///
/// The batch is validated in full before anything is written, then committed
/// in a single transaction.
#[utoipa::path(
    post,
    path = "/log",
    tag = "log",
    request_body = LogBatchRequest,
    responses(
        (status = 200, description = "Batch stored", body = LogAck),
        (status = 400, description = "Missing field or unparseable time", body = ErrorResponse),
        (status = 500, description = "Storage error", body = ErrorResponse),
    )
)]
pub async fn post_log(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LogBatchRequest>, JsonRejection>,
) -> Result<Json<LogAck>, ServerError> {
    let Json(request) = payload?;
    let batch = request.into_batch()?;
    let session = state.store.record_batch(&batch).await?;
    info!(
        log_id = session.id,
        user_id = %session.user_id,
        session_id = %session.session_id,
        actions = batch.actions.len(),
        "batch ingested"
    );
    Ok(Json(LogAck::ok()))
}

/// List stored actions matching every supplied filter.
#[utoipa::path(
    get,
    path = "/log",
    tag = "log",
    params(ActionQuery),
    responses(
        (status = 200, description = "Matching actions, oldest first", body = ActionListResponse),
        (status = 400, description = "Unparseable time bound", body = ErrorResponse),
        (status = 500, description = "Storage error", body = ErrorResponse),
    )
)]
pub async fn get_log(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ActionQuery>, QueryRejection>,
) -> Result<Json<ActionListResponse>, ServerError> {
    let Query(query) = query?;
    let filter = query.to_filter()?;
    let records = state.store.query_actions(&filter).await?;
    Ok(Json(ActionListResponse {
        result: records.into_iter().map(ActionResponse::from).collect(),
    }))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
