//! # Integration Tests
//!
//! End-to-end flows through `PluginBridge`, driven by the fake host.

pub mod flows;
