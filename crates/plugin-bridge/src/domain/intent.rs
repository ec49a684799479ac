//! Permissions a plugin can ask the host to grant.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A capability requested through `requestIntents`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PluginIntent {
    #[serde(rename = "getSelf")]
    GetSelf,
    #[serde(rename = "getUser")]
    GetUser,
    #[serde(rename = "getUsers")]
    GetUsers,
    #[serde(rename = "getAssignment")]
    GetAssignment,
    #[serde(rename = "getCourse")]
    GetCourse,
    #[serde(rename = "getCommunity")]
    GetCommunity,
    #[serde(rename = "getLMSLinkedSelf")]
    GetLmsLinkedSelf,
}

impl PluginIntent {
    pub const ALL: [PluginIntent; 7] = [
        PluginIntent::GetSelf,
        PluginIntent::GetUser,
        PluginIntent::GetUsers,
        PluginIntent::GetAssignment,
        PluginIntent::GetCourse,
        PluginIntent::GetCommunity,
        PluginIntent::GetLmsLinkedSelf,
    ];

    /// Wire name of the intent.
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginIntent::GetSelf => "getSelf",
            PluginIntent::GetUser => "getUser",
            PluginIntent::GetUsers => "getUsers",
            PluginIntent::GetAssignment => "getAssignment",
            PluginIntent::GetCourse => "getCourse",
            PluginIntent::GetCommunity => "getCommunity",
            PluginIntent::GetLmsLinkedSelf => "getLMSLinkedSelf",
        }
    }
}

impl fmt::Display for PluginIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of a `requestIntents` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentsRequest {
    pub intents: Vec<PluginIntent>,
}
