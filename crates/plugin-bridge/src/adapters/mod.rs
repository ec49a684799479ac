//! Adapters Layer
//!
//! Reference implementations of the outbound ports:
//! - `MemoryChannel` / `HostEnd`: in-process channel pair
//! - `InMemoryTokenStore`, `JsonFileTokenStore`: durable token storage
//! - `HttpRemoteApi`: direct calls to the host's HTTP API

pub mod http_api;
pub mod memory_channel;
pub mod token_store;

pub use http_api::HttpRemoteApi;
pub use memory_channel::{HostEnd, MemoryChannel};
pub use token_store::{InMemoryTokenStore, JsonFileTokenStore};
