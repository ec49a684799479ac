//! Service Layer
//!
//! Stateful components wired together by `PluginBridge`:
//! - `HandshakeMachine`: connect signal and the one-way ready transition
//! - `RequestCorrelator`: pairs outbound requests with inbound replies
//! - `TokenCache`: the current token and its persistence
//! - `InboundListener`: single task routing inbound payloads to the active slot

pub(crate) mod backoff;
pub mod bridge;
pub mod correlator;
pub mod handshake;
pub mod listener;
pub mod token_cache;

pub use bridge::{BridgeBuilder, PluginBridge};
pub use correlator::{CorrelatorStats, DispatchOutcome, RequestCorrelator};
pub use handshake::{BootstrapOutcome, HandshakeMachine};
pub use listener::{ListenerSlot, ListenerStats};
pub use token_cache::TokenCache;
