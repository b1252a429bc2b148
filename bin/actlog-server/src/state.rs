//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use actlog_core::SqliteStore;

use crate::config::Config;

/// State shared across all HTTP handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Persistent action log.
    pub store: Arc<SqliteStore>,
}
