use actlog_core::{ActionFilter, ActionRecord, NewActionEvent, NewLogSession};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::ServerError;

// ── POST /log ─────────────────────────────────────────────────────────────────

/// One ingestion batch as sent by the client.
///
/// Every field is optional at the serde level so that a missing field is a
/// validation failure (400) rather than a deserialization rejection with a
/// different body.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogBatchRequest {
    #[validate(required, length(min = 1))]
    pub user_id: Option<String>,
    #[validate(required, length(min = 1))]
    pub session_id: Option<String>,
    #[validate(required)]
    pub actions: Option<Vec<ActionRequest>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ActionRequest {
    #[serde(rename = "type")]
    #[validate(required, length(min = 1))]
    pub action_type: Option<String>,
    /// Date-time text, e.g. `2018-10-18T21:37:28-06:00`.
    #[validate(required)]
    pub time: Option<String>,
    /// Arbitrary JSON. An explicit `null` is a value; only an absent key is missing.
    #[serde(default, deserialize_with = "present")]
    #[validate(required)]
    pub properties: Option<Value>,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl LogBatchRequest {
    /// Validate the whole request and build the batch to persist.
    ///
    /// Fails on the first problem found; nothing is partially accepted.
    pub fn into_batch(self) -> Result<NewLogSession, ServerError> {
        self.validate()?;
        let actions = self
            .actions
            .unwrap_or_default()
            .into_iter()
            .map(ActionRequest::into_action)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(NewLogSession::new(
            self.user_id.unwrap_or_default(),
            self.session_id.unwrap_or_default(),
            actions,
        )?)
    }
}

impl ActionRequest {
    fn into_action(self) -> Result<NewActionEvent, ServerError> {
        self.validate()?;
        Ok(NewActionEvent::parse(
            self.action_type.unwrap_or_default(),
            self.time.as_deref().unwrap_or_default(),
            self.properties.unwrap_or(Value::Null),
        )?)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LogAck {
    pub success: bool,
}

impl LogAck {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Body of every error response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub error_code: String,
}

impl ErrorResponse {
    pub fn new(code: &str) -> Self {
        Self {
            success: false,
            error_code: code.to_owned(),
        }
    }
}

// ── GET /log ──────────────────────────────────────────────────────────────────

/// Optional filters; an absent parameter places no constraint.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ActionQuery {
    /// Exact match on the owning session's user.
    pub user_id: Option<String>,
    /// Exact match on the action type.
    #[serde(rename = "type")]
    pub action_type: Option<String>,
    /// Inclusive lower bound, date-time text.
    pub start_time: Option<String>,
    /// Inclusive upper bound, date-time text.
    pub end_time: Option<String>,
}

impl ActionQuery {
    pub fn to_filter(&self) -> Result<ActionFilter, actlog_core::Error> {
        ActionFilter::parse(
            self.user_id.as_deref(),
            self.action_type.as_deref(),
            self.start_time.as_deref(),
            self.end_time.as_deref(),
        )
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub user_id: String,
    pub session_id: String,
    /// RFC 3339 in UTC.
    pub time: String,
    #[serde(rename = "type")]
    pub action_type: String,
    pub properties: Value,
}

impl From<ActionRecord> for ActionResponse {
    fn from(record: ActionRecord) -> Self {
        Self {
            time: record.time_text(),
            user_id: record.user_id,
            session_id: record.session_id,
            action_type: record.action_type,
            properties: record.properties.into_value(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ActionListResponse {
    pub result: Vec<ActionResponse>,
}
