//! Free-form action properties.

use serde_json::Value;

/// Arbitrary structured data attached to an action.
///
/// The payload is never given a schema; it is carried as a JSON value and
/// converted to canonical text only at the storage boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionProperties(Value);

impl ActionProperties {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Compact JSON with object keys in sorted order.
    ///
    /// `serde_json::Map` is ordered by key, so two deep-equal values always
    /// produce identical text.
    pub fn to_canonical_text(&self) -> String {
        self.0.to_string()
    }

    /// Parse text previously produced by [`to_canonical_text`](Self::to_canonical_text).
    pub fn from_stored_text(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text).map(Self)
    }
}

impl From<Value> for ActionProperties {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
