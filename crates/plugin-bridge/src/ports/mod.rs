//! Ports Layer
//!
//! Defines the interfaces (traits) for:
//! - Driving Ports (inbound) - API for plugin code
//! - Driven Ports (outbound) - channel, token store, clock, remote API

pub mod inbound;
pub mod outbound;

pub use inbound::PluginApi;
pub use outbound::{
    ChannelSender, ChannelSource, InboundStream, RemoteApi, SystemTimeSource, TimeSource,
    TokenStore,
};
