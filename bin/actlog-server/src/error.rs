//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors are converted to the
//! `{"success": false, "errorCode": ...}` body with a matching status code.
//!
//! Caller errors all collapse to the single `"Bad request"` code; the detail is
//! only logged. Internal errors are logged in full and never leak SQL or
//! stored data to the client.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};
use validator::ValidationErrors;

use crate::schemas::log::ErrorResponse;

pub const BAD_REQUEST: &str = "Bad request";
pub const INTERNAL_ERROR: &str = "Internal server error";
pub const UNAVAILABLE: &str = "Service unavailable";
pub const TOO_LARGE: &str = "Payload too large";

/// All errors that can occur in the actlog-server request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The caller sent an invalid or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The request body exceeded `ACTLOG_MAX_BODY_BYTES`.
    #[error("request body too large")]
    PayloadTooLarge,

    /// Propagated from the action log store.
    #[error("storage error: {0}")]
    Storage(actlog_core::Error),

    /// Stored data could not be turned back into a response.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, BAD_REQUEST),
            ServerError::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, TOO_LARGE),
            ServerError::Storage(actlog_core::Error::Database(sqlx::Error::PoolTimedOut)) => {
                (StatusCode::SERVICE_UNAVAILABLE, UNAVAILABLE)
            }
            ServerError::Storage(_) | ServerError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        match &self {
            ServerError::BadRequest(detail) => warn!(%detail, "rejected request"),
            ServerError::PayloadTooLarge => warn!("rejected oversize request body"),
            ServerError::Storage(e) => error!(error = %e, "storage error"),
            ServerError::Internal(m) => error!(message = %m, "internal server error"),
        }
        (status, Json(ErrorResponse::new(code))).into_response()
    }
}

impl From<actlog_core::Error> for ServerError {
    fn from(e: actlog_core::Error) -> Self {
        if e.is_caller_error() {
            ServerError::BadRequest(e.to_string())
        } else if matches!(e, actlog_core::Error::CorruptRecord { .. }) {
            ServerError::Internal(e.to_string())
        } else {
            ServerError::Storage(e)
        }
    }
}

impl From<JsonRejection> for ServerError {
    fn from(e: JsonRejection) -> Self {
        ServerError::BadRequest(e.body_text())
    }
}

impl From<QueryRejection> for ServerError {
    fn from(e: QueryRejection) -> Self {
        ServerError::BadRequest(e.body_text())
    }
}

impl From<ValidationErrors> for ServerError {
    fn from(e: ValidationErrors) -> Self {
        ServerError::BadRequest(e.to_string())
    }
}
