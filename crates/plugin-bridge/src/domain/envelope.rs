//! Wire envelopes exchanged with the host.
//!
//! ```text
//! outbound: {"requestID": "...", "event": "...", "request": <payload>}
//! inbound:  {"requestID": "...", "response": {"event": "...", "success": bool, "data": <payload>}}
//! connect:  {"event": "connect"}
//! ```

use crate::domain::request_id::RequestId;
use serde::{Deserialize, Serialize};

/// Event name of the one-time handshake signal.
pub const CONNECT_EVENT: &str = "connect";

/// Event name of host-pushed token refreshes.
pub const TOKEN_EVENT: &str = "token";

/// Outbound request envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundEnvelope<T> {
    #[serde(rename = "requestID")]
    pub request_id: RequestId,
    pub event: String,
    pub request: T,
}

impl<T: Serialize> OutboundEnvelope<T> {
    pub fn new(request_id: RequestId, event: impl Into<String>, request: T) -> Self {
        Self {
            request_id,
            event: event.into(),
            request,
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// The `response` body of an inbound envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestResponse<T> {
    pub event: String,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: T,
}

/// Inbound reply envelope.
///
/// `requestID` is optional on the wire: host pushes such as token refreshes
/// may omit it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: serde::de::DeserializeOwned + Default"))]
pub struct InboundEnvelope<T> {
    #[serde(rename = "requestID", default)]
    pub request_id: Option<RequestId>,
    pub response: RequestResponse<T>,
}

impl<T: serde::de::DeserializeOwned + Default> InboundEnvelope<T> {
    pub fn decode(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}

impl InboundEnvelope<serde_json::Value> {
    /// True when this envelope is a channel-wide token refresh push.
    pub fn is_token_refresh(&self) -> bool {
        self.response.event == TOKEN_EVENT
    }
}

/// The handshake signal sent once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectSignal {
    pub event: String,
}

impl Default for ConnectSignal {
    fn default() -> Self {
        Self {
            event: CONNECT_EVENT.to_string(),
        }
    }
}

impl ConnectSignal {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
