//! Domain types for the plugin bridge.
//!
//! Pure data and state: envelopes, IDs, tokens, the handshake flag and the
//! pending table. No I/O happens here.

pub mod config;
pub mod envelope;
pub mod handshake;
pub mod intent;
pub mod pending;
pub mod request_id;
pub mod token;
pub mod types;

// Re-exports for convenience
pub use config::{
    BridgeConfig, DEFAULT_API_BASE_URL, DEFAULT_POLL_INTERVAL, DEFAULT_TOKEN_STORAGE_KEY,
};
pub use envelope::{ConnectSignal, InboundEnvelope, OutboundEnvelope, RequestResponse};
pub use handshake::{BootstrapDecision, HandshakeState, ReadyFlag, Transition};
pub use intent::{IntentsRequest, PluginIntent};
pub use pending::{PendingRequestTable, PendingStats, Reply};
pub use request_id::{IdGenerator, RandomIdGenerator, RequestId};
pub use token::TokenRecord;
pub use types::{Community, LmsLinkedUser, PublicUser, Toast, User};
