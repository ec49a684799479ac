//! Cached authorization token.

use serde::{Deserialize, Serialize};

/// Authorization credential plus its expiry (epoch milliseconds).
///
/// Replaced wholesale on refresh, never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub token: String,
    #[serde(rename = "expires")]
    pub expires_at_ms: u64,
}

impl TokenRecord {
    pub fn new(token: impl Into<String>, expires_at_ms: u64) -> Self {
        Self {
            token: token.into(),
            expires_at_ms,
        }
    }

    /// True while `expires_at_ms` is strictly in the future.
    pub fn is_live(&self, now_ms: u64) -> bool {
        self.expires_at_ms > now_ms
    }

    /// Value for the `Authorization` header of direct remote calls.
    pub fn authorization_header(&self) -> String {
        format!("Plugin {}", self.token)
    }

    /// Interpret a `response.data` value as a token refresh.
    ///
    /// Returns `None` for empty payloads (`null`, `false`, `""`, `{}`, `[]`)
    /// and for anything that does not decode as a token record.
    pub fn from_refresh_data(data: &serde_json::Value) -> Option<Self> {
        if is_empty_payload(data) {
            return None;
        }
        serde_json::from_value(data.clone()).ok()
    }
}

pub(crate) fn is_empty_payload(data: &serde_json::Value) -> bool {
    use serde_json::Value;
    match data {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Number(_) => false,
    }
}
