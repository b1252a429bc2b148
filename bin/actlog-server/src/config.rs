//! Server configuration, loaded from environment variables at startup.

use std::time::Duration;

use actlog_core::StoreOptions;

/// Runtime configuration for actlog-server.
///
/// Every field has a sensible default so the server works out-of-the-box
/// without any environment variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:5000"`).
    pub bind_address: String,

    /// sqlx SQLite URL (default: `"sqlite://actlog.db"`).
    pub database_url: String,

    /// Upper bound on pooled database connections.
    pub db_max_connections: u32,

    /// Seconds to wait for a connection or a locked database before the
    /// request fails.
    pub db_acquire_timeout_secs: u64,

    /// Largest accepted request body, in bytes.
    pub max_body_bytes: usize,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// When set, also write logs to a daily-rolling file in this directory.
    pub log_dir: Option<String>,

    /// Comma-separated list of allowed CORS origins; `None` allows any.
    pub cors_allowed_origins: Option<String>,

    /// Serve `/swagger-ui` and `/api-docs/openapi.json`.
    pub enable_swagger: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_owned(),
            database_url: "sqlite://actlog.db".to_owned(),
            db_max_connections: 5,
            db_acquire_timeout_secs: 5,
            max_body_bytes: 2 * 1024 * 1024,
            log_level: "info".to_owned(),
            log_json: false,
            log_dir: None,
            cors_allowed_origins: None,
            enable_swagger: true,
        }
    }
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_address: env_or("ACTLOG_BIND", &defaults.bind_address),
            database_url: env_or("ACTLOG_DATABASE_URL", &defaults.database_url),
            db_max_connections: parse_env("ACTLOG_DB_MAX_CONNECTIONS", defaults.db_max_connections),
            db_acquire_timeout_secs: parse_env(
                "ACTLOG_DB_ACQUIRE_TIMEOUT_SECS",
                defaults.db_acquire_timeout_secs,
            ),
            max_body_bytes: parse_env("ACTLOG_MAX_BODY_BYTES", defaults.max_body_bytes),
            log_level: env_or("ACTLOG_LOG", &defaults.log_level),
            log_json: env_flag("ACTLOG_LOG_JSON", defaults.log_json),
            log_dir: non_empty_env("ACTLOG_LOG_DIR"),
            cors_allowed_origins: non_empty_env("ACTLOG_CORS_ORIGINS"),
            enable_swagger: env_flag("ACTLOG_ENABLE_SWAGGER", defaults.enable_swagger),
        }
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            max_connections: self.db_max_connections.max(1),
            acquire_timeout: Duration::from_secs(self.db_acquire_timeout_secs),
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
