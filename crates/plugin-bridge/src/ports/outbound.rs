//! Outbound Ports (Driven Ports)
//!
//! Collaborators the bridge depends on but does not own: the message
//! channel to the host, the durable token store, the clock, and the host's
//! HTTP API.

use crate::domain::token::TokenRecord;
use crate::error::{ChannelError, FetchError, StorageError};
use async_trait::async_trait;
use std::pin::Pin;
use tokio_stream::Stream;

/// Inbound payloads from the host, in arrival order.
///
/// Dropping the stream unsubscribes.
pub type InboundStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// Fire-and-forget delivery of a serialized payload to the host.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// Deliver one payload. No delivery confirmation.
    ///
    /// Returns `ChannelError::HostUnavailable` when there is no host to
    /// address.
    async fn send(&self, payload: String) -> Result<(), ChannelError>;
}

/// Subscription to payloads arriving from the host.
pub trait ChannelSource: Send + Sync {
    fn subscribe(&self) -> Result<InboundStream, ChannelError>;
}

/// Durable key/value storage for the cached token.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<TokenRecord>, StorageError>;

    async fn set(&self, key: &str, record: &TokenRecord) -> Result<(), StorageError>;
}

/// Time source trait for testability
pub trait TimeSource: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;
}

/// System time implementation
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            // Clock before Unix epoch - treat as 0 rather than panic
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Plain HTTP GET against the host API.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Fetch `url` and decode the body as JSON.
    ///
    /// `authorization` is sent verbatim as the `Authorization` header.
    async fn get_json(
        &self,
        url: &str,
        authorization: Option<&str>,
    ) -> Result<serde_json::Value, FetchError>;
}
