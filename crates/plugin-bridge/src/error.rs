//! Error types for the plugin bridge.
//!
//! The façade keeps a silent contract (absent values and `false` flags), but
//! every layer underneath reports an explicit outcome through these enums so
//! failures can be logged before they are collapsed.

use std::time::Duration;
use thiserror::Error;

/// Result alias used across the bridge.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Result alias for direct remote calls.
pub type FetchResult<T> = Result<T, FetchError>;

/// Top-level bridge errors.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("timed out after {waited:?} waiting for {what}")]
    Timeout { what: &'static str, waited: Duration },

    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("token storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to encode outbound envelope: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("reply channel closed before a response arrived")]
    ReplyDropped,

    #[error("bridge already initialized")]
    AlreadyInitialized,

    #[error("bridge not initialized")]
    NotInitialized,

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("remote api error: {0}")]
    Remote(#[from] FetchError),
}

/// Errors raised by the channel adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The host reference the outbound primitive needs is missing.
    #[error("host unavailable")]
    HostUnavailable,

    #[error("channel closed")]
    Closed,

    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Errors from the durable token store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt token record: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Errors from direct remote calls. Never surfaced past the façade.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("no token available: {0}")]
    Unauthorized(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

/// Configuration validation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid interval: {0}")]
    InvalidInterval(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}
