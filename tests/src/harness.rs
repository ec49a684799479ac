//! # Fake Host Harness
//!
//! Drives a `PluginBridge` from the host side of an in-memory channel:
//! answers the `connect` signal, reads correlated requests, replies to them
//! and pushes token refreshes.

use async_trait::async_trait;
use parking_lot::Mutex;
use plugin_bridge::{
    BridgeConfig, FetchError, FetchResult, HostEnd, MemoryChannel, PluginBridge, RemoteApi,
    TokenStore,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Expiry far enough in the future for every test run (2100-01-01).
pub const FAR_FUTURE_MS: u64 = 4_102_444_800_000;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// One correlated request as the host sees it.
#[derive(Debug, Clone)]
pub struct SentRequest {
    pub request_id: String,
    pub event: String,
    pub body: Value,
}

pub struct FakeHost {
    end: HostEnd,
}

impl FakeHost {
    pub fn new(end: HostEnd) -> Self {
        Self { end }
    }

    /// Next raw payload the plugin sent.
    pub async fn next_payload(&mut self) -> Value {
        let raw = timeout(RECV_TIMEOUT, self.end.recv())
            .await
            .expect("timed out waiting for plugin payload")
            .expect("plugin end closed");
        serde_json::from_str(&raw).expect("plugin sent invalid JSON")
    }

    pub async fn expect_connect(&mut self) {
        assert_eq!(self.next_payload().await, json!({"event": "connect"}));
    }

    /// Next correlated request.
    pub async fn next_request(&mut self) -> SentRequest {
        let payload = self.next_payload().await;
        SentRequest {
            request_id: payload["requestID"]
                .as_str()
                .expect("request without requestID")
                .to_string(),
            event: payload["event"].as_str().unwrap_or_default().to_string(),
            body: payload["request"].clone(),
        }
    }

    /// True when the plugin has sent nothing that is still unread.
    pub fn is_quiet(&mut self) -> bool {
        self.end.try_recv().is_none()
    }

    pub fn complete_handshake(&self, token: &str) {
        self.deliver(handshake_payload(token, FAR_FUTURE_MS));
    }

    pub fn reply(&self, request: &SentRequest, success: bool, data: Value) {
        self.reply_to(&request.request_id, &request.event, success, data);
    }

    pub fn reply_to(&self, request_id: &str, event: &str, success: bool, data: Value) {
        self.deliver(
            json!({
                "requestID": request_id,
                "response": {"event": event, "success": success, "data": data}
            })
            .to_string(),
        );
    }

    pub fn push_token(&self, request_id: &str, token: &str, expires_at_ms: u64) {
        self.reply_to(
            request_id,
            "token",
            true,
            json!({"token": token, "expires": expires_at_ms}),
        );
    }

    pub fn deliver(&self, payload: impl Into<String>) -> usize {
        self.end.deliver(payload)
    }

    pub fn subscriber_count(&self) -> usize {
        self.end.subscriber_count()
    }
}

pub fn handshake_payload(token: &str, expires_at_ms: u64) -> String {
    json!({
        "requestID": "bootstrap",
        "response": {
            "event": "connect",
            "success": true,
            "data": {"token": token, "expires": expires_at_ms}
        }
    })
    .to_string()
}

/// Remote API double serving canned JSON by URL.
#[derive(Default)]
pub struct CannedRemoteApi {
    responses: Mutex<HashMap<String, Value>>,
    calls: Mutex<Vec<(String, Option<String>)>>,
}

impl CannedRemoteApi {
    pub fn with(self, url: &str, body: Value) -> Self {
        self.responses.lock().insert(url.to_string(), body);
        self
    }

    /// Every `(url, authorization)` pair requested so far.
    pub fn calls(&self) -> Vec<(String, Option<String>)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl RemoteApi for CannedRemoteApi {
    async fn get_json(&self, url: &str, authorization: Option<&str>) -> FetchResult<Value> {
        self.calls
            .lock()
            .push((url.to_string(), authorization.map(str::to_string)));
        self.responses
            .lock()
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                status: 404,
                url: url.to_string(),
            })
    }
}

pub fn test_config() -> BridgeConfig {
    BridgeConfig::default()
        .with_poll_interval(Duration::from_millis(1))
        .with_api_base_url("https://api.example.test")
}

/// A bridge wired to a fake host, not yet initialized.
pub fn bridge_pair(
    config: BridgeConfig,
    store: Option<Arc<dyn TokenStore>>,
    remote: Arc<CannedRemoteApi>,
) -> (Arc<PluginBridge>, FakeHost) {
    bridge_telemetry::init_test_logging();

    let (channel, host) = MemoryChannel::pair();
    let mut builder = PluginBridge::with_channel(config, channel).remote_api(remote);
    if let Some(store) = store {
        builder = builder.token_store(store);
    }
    let bridge = builder.build().expect("valid test config");
    (Arc::new(bridge), FakeHost::new(host))
}

/// A bridge that has completed the handshake with token `token`.
pub async fn connected_bridge(
    token: &str,
    remote: Arc<CannedRemoteApi>,
) -> (Arc<PluginBridge>, FakeHost) {
    let (bridge, mut host) = bridge_pair(test_config(), None, remote);
    bridge.init().await.expect("init");
    host.expect_connect().await;
    host.complete_handshake(token);
    bridge
        .wait_until_ready(Some(RECV_TIMEOUT))
        .await
        .expect("handshake");
    (bridge, host)
}

/// Poll `check` until it holds, failing after two seconds.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
    while !check() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached"
        );
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}
