//! Inbound Ports (Driving Ports)
//!
//! The API plugin code calls. Apart from `send_request`, every operation
//! keeps a silent contract: failures surface as `None` or `false`, never as
//! an error.

use crate::domain::envelope::RequestResponse;
use crate::domain::intent::PluginIntent;
use crate::domain::types::{Community, LmsLinkedUser, PublicUser, Toast, User};
use crate::error::BridgeResult;
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait PluginApi: Send + Sync {
    /// Issue a correlated request and wait for the host's reply.
    async fn send_request(&self, event: &str, body: Value) -> BridgeResult<RequestResponse<Value>>;

    /// Ask the host to grant `intents`. On success the reply carries a fresh
    /// token which replaces the cached one.
    async fn request_intents(&self, intents: &[PluginIntent]) -> bool;

    /// Ask the host to display a toast. Returns the host's success flag.
    async fn send_toast(&self, toast: &Toast) -> bool;

    /// Public profile of any user. No authorization.
    async fn get_user(&self, user_id: &str) -> Option<PublicUser>;

    /// The authenticated user. Waits for a token.
    async fn get_self(&self) -> Option<User>;

    /// Community by ID. No authorization.
    async fn get_community(&self, community_id: &str) -> Option<Community>;

    /// The caller's LMS-linked account in a community. Waits for a token.
    async fn get_lms_self(&self, community_id: &str) -> Option<LmsLinkedUser>;
}
