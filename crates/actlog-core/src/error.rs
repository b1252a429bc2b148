//! Error taxonomy shared by ingestion and query paths.

use thiserror::Error;

/// All errors produced by actlog-core.
#[derive(Debug, Error)]
pub enum Error {
    /// A required field was absent or empty.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// A date-time field could not be parsed.
    #[error("invalid date-time for `{field}`: {value:?}")]
    InvalidTime { field: &'static str, value: String },

    /// A stored row could not be decoded back into the domain model.
    #[error("stored action {action_id} is corrupt: {reason}")]
    CorruptRecord { action_id: i64, reason: String },

    /// Propagated from the underlying store.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Embedded migrations failed to apply.
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl Error {
    /// `true` when the error was caused by the caller's input rather than by
    /// the server or its data.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Error::MissingField(_) | Error::InvalidTime { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
