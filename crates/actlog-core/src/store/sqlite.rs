//! SQLite implementation of [`ActionLogStore`].
//!
//! Uses [`sqlx`] with the `sqlite` feature. Migrations are run automatically
//! by [`SqliteStore::connect`].
//!
//! # Migrations path
//!
//! `sqlx::migrate!("./migrations")` resolves the path **at compile time**
//! relative to `CARGO_MANIFEST_DIR` (the crate root), so the directory is
//! embedded into the binary. The database file location is chosen at runtime
//! by the caller.
//!
//! # Queries
//!
//! The runtime-checked `sqlx::query` form is used so that no `DATABASE_URL`
//! environment variable is needed at compile time. Filtered reads are
//! assembled with [`QueryBuilder`], one bound predicate per supplied filter.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};

use super::ActionLogStore;
use crate::error::{Error, Result};
use crate::model::{ActionFilter, ActionRecord, LogSession, NewLogSession};
use crate::properties::ActionProperties;

/// Pool tuning for [`SqliteStore::connect`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub max_connections: u32,
    /// Upper bound on waiting for a pooled connection or a locked database.
    pub acquire_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// SQLite-backed action log.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the SQLite database at `url` and run pending migrations.
    ///
    /// `url` should be a sqlx-compatible SQLite URL, e.g. `"sqlite://actlog.db"`.
    pub async fn connect(url: &str, options: &StoreOptions) -> Result<Self> {
        let connect = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(options.acquire_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.acquire_timeout)
            .connect_with(connect)
            .await?;

        Self::migrate(pool).await
    }

    /// A private in-memory database, used by tests.
    ///
    /// Every SQLite in-memory connection is its own database, so the pool is
    /// pinned to exactly one connection that is never recycled.
    pub async fn connect_in_memory() -> Result<Self> {
        let connect = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(connect)
            .await?;

        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> Result<Self> {
        // Path is resolved relative to CARGO_MANIFEST_DIR at compile time.
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("action log schema up to date");
        Ok(Self { pool })
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close every pooled connection. Later operations fail with
    /// `sqlx::Error::PoolClosed`.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("action log store closed");
    }
}

/// Raw row of the session × action join.
#[derive(sqlx::FromRow)]
struct ActionRow {
    action_id: i64,
    user_id: String,
    session_id: String,
    action_type: String,
    occurred_at: i64,
    properties: String,
}

impl ActionRow {
    fn into_record(self) -> Result<ActionRecord> {
        let time = DateTime::<Utc>::from_timestamp_micros(self.occurred_at).ok_or_else(|| {
            Error::CorruptRecord {
                action_id: self.action_id,
                reason: format!("timestamp {} out of range", self.occurred_at),
            }
        })?;
        let properties =
            ActionProperties::from_stored_text(&self.properties).map_err(|e| Error::CorruptRecord {
                action_id: self.action_id,
                reason: format!("properties are not valid JSON: {e}"),
            })?;
        Ok(ActionRecord {
            action_id: self.action_id,
            user_id: self.user_id,
            session_id: self.session_id,
            action_type: self.action_type,
            time,
            properties,
        })
    }
}

impl ActionLogStore for SqliteStore {
    async fn record_batch(&self, batch: &NewLogSession) -> Result<LogSession> {
        // Dropping `tx` without `commit` rolls back, so every `?` below
        // leaves no trace of this batch.
        let mut tx = self.pool.begin().await?;

        let created_at = Utc::now().to_rfc3339();
        let log_id = sqlx::query(
            "INSERT INTO log_sessions (user_id, session_id, created_at) VALUES (?1, ?2, ?3)",
        )
        .bind(&batch.user_id)
        .bind(&batch.session_id)
        .bind(&created_at)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for action in &batch.actions {
            sqlx::query(
                "INSERT INTO action_events (action_type, occurred_at, properties, log_id) \
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(&action.action_type)
            .bind(action.time.timestamp_micros())
            .bind(action.properties.to_canonical_text())
            .bind(log_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(log_id, actions = batch.actions.len(), "batch committed");

        Ok(LogSession {
            id: log_id,
            user_id: batch.user_id.clone(),
            session_id: batch.session_id.clone(),
        })
    }

    async fn query_actions(&self, filter: &ActionFilter) -> Result<Vec<ActionRecord>> {
        let mut query: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "SELECT a.action_id, l.user_id, l.session_id, a.action_type, a.occurred_at, a.properties \
             FROM action_events a INNER JOIN log_sessions l ON l.log_id = a.log_id",
        );

        if !filter.is_unbounded() {
            query.push(" WHERE ");
            let mut predicates = query.separated(" AND ");
            if let Some(user_id) = &filter.user_id {
                predicates.push("l.user_id = ");
                predicates.push_bind_unseparated(user_id.clone());
            }
            if let Some(action_type) = &filter.action_type {
                predicates.push("a.action_type = ");
                predicates.push_bind_unseparated(action_type.clone());
            }
            if let Some(start) = filter.start_time {
                predicates.push("a.occurred_at >= ");
                predicates.push_bind_unseparated(start.timestamp_micros());
            }
            if let Some(end) = filter.end_time {
                predicates.push("a.occurred_at <= ");
                predicates.push_bind_unseparated(end.timestamp_micros());
            }
        }
        query.push(" ORDER BY a.occurred_at ASC, a.action_id ASC");

        let rows: Vec<ActionRow> = query.build_query_as().fetch_all(&self.pool).await?;
        debug!(rows = rows.len(), ?filter, "actions queried");
        rows.into_iter().map(ActionRow::into_record).collect()
    }

    async fn count_sessions(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM log_sessions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_actions(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM action_events")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewActionEvent;
    use serde_json::{Value, json};

    fn action(kind: &str, time: &str, props: Value) -> NewActionEvent {
        NewActionEvent::parse(kind, time, props).expect("valid action")
    }

    fn batch(user: &str, session: &str, actions: Vec<NewActionEvent>) -> NewLogSession {
        NewLogSession::new(user, session, actions).expect("valid batch")
    }

    /// Session A: CLICK + VIEW for `userA`; session B: CLICK for `userB`.
    async fn seeded_store() -> SqliteStore {
        let store = SqliteStore::connect_in_memory().await.unwrap();
        store
            .record_batch(&batch(
                "userA",
                "sessionA",
                vec![
                    action("CLICK", "2020-01-01T21:37:28-06:00", json!({ "locationX": 52, "locationY": 11 })),
                    action("VIEW", "2018-10-18T21:37:28-06:00", json!({ "viewID": "IDViewed" })),
                ],
            ))
            .await
            .unwrap();
        store
            .record_batch(&batch(
                "userB",
                "sessionB",
                vec![action("CLICK", "2019-01-01T21:37:28-06:00", json!({ "locationX": 1 }))],
            ))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn record_batch_persists_parent_and_children() {
        let store = SqliteStore::connect_in_memory().await.unwrap();
        let props = json!({ "locationX": 52, "locationY": 11, "nested": [1, { "a": null }] });
        let session = store
            .record_batch(&batch(
                "user1",
                "session1",
                vec![action("CLICK", "2018-10-18T21:37:28-06:00", props.clone())],
            ))
            .await
            .unwrap();

        assert_eq!(session.user_id, "user1");
        assert_eq!(store.count_sessions().await.unwrap(), 1);
        assert_eq!(store.count_actions().await.unwrap(), 1);

        let records = store.query_actions(&ActionFilter::default()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].session_id, "session1");
        assert_eq!(records[0].properties.as_value(), &props);
        assert_eq!(records[0].time_text(), "2018-10-19T03:37:28Z");
    }

    #[tokio::test]
    async fn empty_batch_stores_only_the_parent() {
        let store = SqliteStore::connect_in_memory().await.unwrap();
        store.record_batch(&batch("u", "s", vec![])).await.unwrap();
        assert_eq!(store.count_sessions().await.unwrap(), 1);
        assert_eq!(store.count_actions().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_child_rolls_back_whole_batch() {
        let store = SqliteStore::connect_in_memory().await.unwrap();
        let mut broken = action("CLICK", "2018-10-18T21:37:28Z", json!({}));
        // Bypasses validation so the CHECK constraint rejects the second row.
        broken.action_type = String::new();
        let bad = NewLogSession {
            user_id: "u".into(),
            session_id: "s".into(),
            actions: vec![action("VIEW", "2018-10-18T21:37:28Z", json!({})), broken],
        };

        let err = store.record_batch(&bad).await.unwrap_err();
        assert!(matches!(err, Error::Database(_)));
        assert_eq!(store.count_sessions().await.unwrap(), 0);
        assert_eq!(store.count_actions().await.unwrap(), 0);

        // The connection is usable again after the rollback.
        store.record_batch(&batch("u", "s", vec![])).await.unwrap();
        assert_eq!(store.count_sessions().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unfiltered_query_returns_everything_in_time_order() {
        let store = seeded_store().await;
        let records = store.query_actions(&ActionFilter::default()).await.unwrap();
        let types: Vec<_> = records.iter().map(|r| r.action_type.as_str()).collect();
        assert_eq!(types, ["VIEW", "CLICK", "CLICK"]);
        assert!(records.windows(2).all(|w| w[0].time <= w[1].time));
    }

    #[tokio::test]
    async fn filters_combine_with_and() {
        let store = seeded_store().await;

        let by_type = ActionFilter::parse(None, Some("CLICK"), None, None).unwrap();
        assert_eq!(store.query_actions(&by_type).await.unwrap().len(), 2);

        let by_user = ActionFilter::parse(Some("userA"), None, None, None).unwrap();
        assert_eq!(store.query_actions(&by_user).await.unwrap().len(), 2);

        let both = ActionFilter::parse(Some("userA"), Some("CLICK"), None, None).unwrap();
        let records = store.query_actions(&both).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user_id, "userA");
        assert_eq!(records[0].action_type, "CLICK");

        let nobody = ActionFilter::parse(Some("userZ"), None, None, None).unwrap();
        assert!(store.query_actions(&nobody).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn time_bounds_are_inclusive() {
        let store = seeded_store().await;
        let exact = "2019-01-01T21:37:28-06:00";

        let from = ActionFilter::parse(None, None, Some(exact), None).unwrap();
        assert_eq!(store.query_actions(&from).await.unwrap().len(), 2);

        let until = ActionFilter::parse(None, None, None, Some(exact)).unwrap();
        assert_eq!(store.query_actions(&until).await.unwrap().len(), 2);

        let point = ActionFilter::parse(None, None, Some(exact), Some(exact)).unwrap();
        let records = store.query_actions(&point).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user_id, "userB");
    }

    #[tokio::test]
    async fn range_before_all_data_is_empty() {
        let store = seeded_store().await;
        let filter = ActionFilter::parse(None, None, None, Some("2018-01-19T21:37:28-06:00")).unwrap();
        assert!(store.query_actions(&filter).await.unwrap().is_empty());

        let inverted = ActionFilter::parse(None, None, Some("2020-01-01"), Some("2018-01-01")).unwrap();
        assert!(store.query_actions(&inverted).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn closed_store_reports_database_errors() {
        let store = seeded_store().await;
        store.close().await;

        let err = store.count_sessions().await.unwrap_err();
        assert!(matches!(err, Error::Database(sqlx::Error::PoolClosed)));
        assert!(!err.is_caller_error());
        assert!(store.record_batch(&batch("u", "s", vec![])).await.is_err());
    }

    #[tokio::test]
    async fn unreadable_row_is_reported_as_corrupt() {
        let store = SqliteStore::connect_in_memory().await.unwrap();
        let log_id = sqlx::query(
            "INSERT INTO log_sessions (user_id, session_id, created_at) VALUES ('u', 's', 'now')",
        )
        .execute(&store.pool)
        .await
        .unwrap()
        .last_insert_rowid();
        sqlx::query(
            "INSERT INTO action_events (action_type, occurred_at, properties, log_id) \
             VALUES ('CLICK', ?1, '{}', ?2)",
        )
        .bind(i64::MAX)
        .bind(log_id)
        .execute(&store.pool)
        .await
        .unwrap();

        let err = store.query_actions(&ActionFilter::default()).await.unwrap_err();
        assert!(matches!(err, Error::CorruptRecord { .. }));
        assert!(!err.is_caller_error());
    }
}
