//! Domain model: the parent log session, its actions, and read-side filters.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::properties::ActionProperties;
use crate::time::parse_datetime;

/// One validated action waiting to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewActionEvent {
    pub action_type: String,
    pub time: DateTime<Utc>,
    pub properties: ActionProperties,
}

impl NewActionEvent {
    /// Validate raw action fields.
    ///
    /// `time_text` goes through [`parse_datetime`]; an empty `action_type` is
    /// treated the same as a missing one.
    pub fn parse(action_type: impl Into<String>, time_text: &str, properties: Value) -> Result<Self> {
        let action_type = action_type.into();
        if action_type.is_empty() {
            return Err(Error::MissingField("type"));
        }
        let time = parse_datetime(time_text).ok_or_else(|| Error::InvalidTime {
            field: "time",
            value: time_text.to_owned(),
        })?;
        Ok(Self {
            action_type,
            time,
            properties: ActionProperties::new(properties),
        })
    }
}

/// A complete, validated batch: one parent identity plus its actions.
///
/// Constructing this value is the only way to reach
/// [`ActionLogStore::record_batch`](crate::ActionLogStore::record_batch), so
/// nothing unvalidated is ever written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLogSession {
    pub user_id: String,
    pub session_id: String,
    pub actions: Vec<NewActionEvent>,
}

impl NewLogSession {
    pub fn new(
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        actions: Vec<NewActionEvent>,
    ) -> Result<Self> {
        let user_id = user_id.into();
        let session_id = session_id.into();
        if user_id.is_empty() {
            return Err(Error::MissingField("userId"));
        }
        if session_id.is_empty() {
            return Err(Error::MissingField("sessionId"));
        }
        Ok(Self {
            user_id,
            session_id,
            actions,
        })
    }
}

/// A persisted parent row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSession {
    pub id: i64,
    pub user_id: String,
    pub session_id: String,
}

/// One action joined with its owning session, as returned by queries.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRecord {
    pub action_id: i64,
    pub user_id: String,
    pub session_id: String,
    pub action_type: String,
    pub time: DateTime<Utc>,
    pub properties: ActionProperties,
}

impl ActionRecord {
    /// RFC 3339 in UTC, e.g. `2018-10-19T03:37:28Z`.
    pub fn time_text(&self) -> String {
        self.time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}

/// Conjunction of optional constraints over stored actions.
///
/// A `None` field places no constraint on that dimension. Time bounds are
/// inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionFilter {
    pub user_id: Option<String>,
    pub action_type: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl ActionFilter {
    /// Build a filter from raw request parameters.
    ///
    /// Empty strings count as absent. Time bounds use the same parser as
    /// ingestion; an unparseable bound is an [`Error::InvalidTime`].
    pub fn parse(
        user_id: Option<&str>,
        action_type: Option<&str>,
        start_time: Option<&str>,
        end_time: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            user_id: non_empty(user_id).map(str::to_owned),
            action_type: non_empty(action_type).map(str::to_owned),
            start_time: parse_bound("startTime", start_time)?,
            end_time: parse_bound("endTime", end_time)?,
        })
    }

    /// `true` when no constraint is set and every stored action matches.
    pub fn is_unbounded(&self) -> bool {
        self == &Self::default()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn parse_bound(field: &'static str, value: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    match non_empty(value) {
        None => Ok(None),
        Some(text) => parse_datetime(text)
            .map(Some)
            .ok_or_else(|| Error::InvalidTime {
                field,
                value: text.to_owned(),
            }),
    }
}
