//! Persistence layer.
//!
//! [`ActionLogStore`] defines the interface the HTTP layer calls into. The
//! default implementation is [`sqlite::SqliteStore`]. To swap to another
//! database, implement [`ActionLogStore`] for the new type and change the
//! concrete store held by the server state.
//!
//! All trait methods use `impl Future` in their signatures so no extra
//! `async-trait` crate is required.

pub mod sqlite;

use std::future::Future;

use crate::error::Result;
use crate::model::{ActionFilter, ActionRecord, LogSession, NewLogSession};

pub trait ActionLogStore: Send + Sync + 'static {
    /// Persist the parent session and every action in one transaction.
    ///
    /// Either all rows are committed or none are.
    fn record_batch(&self, batch: &NewLogSession) -> impl Future<Output = Result<LogSession>> + Send;

    /// Every stored action matching `filter`, joined with its session,
    /// ordered by ascending time then ascending action id.
    fn query_actions(
        &self,
        filter: &ActionFilter,
    ) -> impl Future<Output = Result<Vec<ActionRecord>>> + Send;

    fn count_sessions(&self) -> impl Future<Output = Result<i64>> + Send;

    fn count_actions(&self) -> impl Future<Output = Result<i64>> + Send;
}
