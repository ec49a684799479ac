//! # Plugin Bridge
//!
//! Request/response correlation between an embedded plugin and its host over
//! a fire-and-forget message channel.
//!
//! ## Purpose
//!
//! The channel only moves opaque payloads. This crate layers on top of it:
//! a one-time handshake that proves the host is present and yields an initial
//! token, request IDs that pair every request with exactly one reply, and a
//! token cache that follows host-pushed refreshes.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Ready is set at most once and never reverts | `domain/handshake.rs` - `ReadyFlag::try_mark_ready()` |
//! | No request is sent before ready | `service/correlator.rs` - `send()` readiness wait |
//! | A caller is registered before its request is sent | `service/correlator.rs` - `send()` |
//! | Request IDs are unique among pending requests | `domain/pending.rs` - `register()` entry check |
//! | A reply resolves its caller at most once | `domain/pending.rs` - `complete()` removes the entry |
//! | Exactly one inbound handler is active | `service/listener.rs` - slot swap |
//! | Token refresh is independent of correlation | `service/correlator.rs` - `on_message()` |
//!
//! ## Handshake
//!
//! ```text
//! [Connecting] ──reply with token──→ [Ready]
//!      │                                 │
//!      └── malformed / tokenless ──┐     └── further handshakes: logged, ignored
//!                                  ↓
//!                            [Connecting]
//! ```
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      OUTER LAYER                                │
//! │  adapters/ - MemoryChannel, token stores, HttpRemoteApi         │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      MIDDLE LAYER                               │
//! │  ports/inbound.rs  - PluginApi trait                            │
//! │  ports/outbound.rs - ChannelSender, ChannelSource, TokenStore,  │
//! │                      TimeSource, RemoteApi traits               │
//! │  service/          - PluginBridge, HandshakeMachine,            │
//! │                      RequestCorrelator, TokenCache, listener    │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      INNER LAYER                                │
//! │  domain/envelope.rs   - wire envelopes                          │
//! │  domain/pending.rs    - PendingRequestTable                     │
//! │  domain/handshake.rs  - ReadyFlag, bootstrap interpretation     │
//! │  domain/token.rs      - TokenRecord                             │
//! │  domain/config.rs     - BridgeConfig                            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! let (channel, host) = MemoryChannel::pair();
//! let bridge = PluginBridge::with_channel(BridgeConfig::from_env(), channel).build()?;
//! bridge.init().await?;
//!
//! let reply = bridge.send_request("getUser", json!({"userid": "42"})).await?;
//! let me = bridge.get_self().await;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]
// Allow unwrap/expect/panic in test code only
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::*;
pub use domain::*;
pub use error::{
    BridgeError, BridgeResult, ChannelError, ConfigError, FetchError, FetchResult, StorageError,
};
pub use ports::*;
pub use service::{
    BootstrapOutcome, BridgeBuilder, CorrelatorStats, DispatchOutcome, HandshakeMachine,
    ListenerSlot, ListenerStats, PluginBridge, RequestCorrelator, TokenCache,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
