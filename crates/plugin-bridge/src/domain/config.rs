//! Bridge configuration with validation.
//!
//! Timeouts are `None` by default: waiting for readiness, for a token, or for
//! a reply is unbounded unless the caller opts into a deadline.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Storage key the cached token is persisted under.
pub const DEFAULT_TOKEN_STORAGE_KEY: &str = "__$DisadusAppToken";

/// Base URL for direct remote calls.
pub const DEFAULT_API_BASE_URL: &str = "https://api.disadus.app";

/// Delay between readiness / token re-checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Fixed delay between re-checks while waiting
    pub poll_interval: Duration,
    /// Deadline for `send_request` waiting on the handshake
    pub ready_timeout: Option<Duration>,
    /// Deadline for authorized calls waiting on a token
    pub token_timeout: Option<Duration>,
    /// Deadline for a correlated reply once the request is sent
    pub request_timeout: Option<Duration>,
    /// Durable storage key for the cached token
    pub token_storage_key: String,
    /// Base URL of the host's HTTP API
    pub api_base_url: String,
    /// Per-call timeout for direct HTTP requests
    pub http_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            ready_timeout: None,
            token_timeout: None,
            request_timeout: None,
            token_storage_key: DEFAULT_TOKEN_STORAGE_KEY.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            http_timeout: Duration::from_secs(10),
        }
    }
}

impl BridgeConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `BRIDGE_API_BASE_URL`: host API base (default: https://api.disadus.app)
    /// - `BRIDGE_POLL_INTERVAL_MS`: wait re-check interval (default: 20)
    /// - `BRIDGE_READY_TIMEOUT_MS`: handshake wait deadline (default: none)
    /// - `BRIDGE_TOKEN_TIMEOUT_MS`: token wait deadline (default: none)
    /// - `BRIDGE_REQUEST_TIMEOUT_MS`: reply wait deadline (default: none)
    /// - `BRIDGE_TOKEN_KEY`: token storage key (default: `__$DisadusAppToken`)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            poll_interval: env_millis("BRIDGE_POLL_INTERVAL_MS").unwrap_or(defaults.poll_interval),
            ready_timeout: env_millis("BRIDGE_READY_TIMEOUT_MS"),
            token_timeout: env_millis("BRIDGE_TOKEN_TIMEOUT_MS"),
            request_timeout: env_millis("BRIDGE_REQUEST_TIMEOUT_MS"),
            token_storage_key: env::var("BRIDGE_TOKEN_KEY")
                .unwrap_or(defaults.token_storage_key),
            api_base_url: env::var("BRIDGE_API_BASE_URL").unwrap_or(defaults.api_base_url),
            http_timeout: defaults.http_timeout,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::InvalidInterval(
                "poll_interval cannot be 0".into(),
            ));
        }

        for (name, timeout) in [
            ("ready_timeout", self.ready_timeout),
            ("token_timeout", self.token_timeout),
            ("request_timeout", self.request_timeout),
        ] {
            if timeout.is_some_and(|t| t.is_zero()) {
                return Err(ConfigError::InvalidInterval(format!("{name} cannot be 0")));
            }
        }

        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(ConfigError::InvalidUrl(self.api_base_url.clone()));
        }

        if self.token_storage_key.trim().is_empty() {
            return Err(ConfigError::InvalidKey(
                "token_storage_key cannot be empty".into(),
            ));
        }

        Ok(())
    }

    /// Builder-style method to set the poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = Some(timeout);
        self
    }

    pub fn with_token_timeout(mut self, timeout: Duration) -> Self {
        self.token_timeout = Some(timeout);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_token_storage_key(mut self, key: impl Into<String>) -> Self {
        self.token_storage_key = key.into();
        self
    }

    /// Append path segments to the API base URL.
    ///
    /// Each segment is percent-encoded on its own, so a `/` or `..` inside a
    /// caller-supplied ID cannot reach a different endpoint.
    pub fn api_url(&self, segments: &[&str]) -> Result<String, ConfigError> {
        let mut url = reqwest::Url::parse(&self.api_base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {e}", self.api_base_url)))?;
        url.path_segments_mut()
            .map_err(|_| ConfigError::InvalidUrl(self.api_base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url.into())
    }
}

fn env_millis(name: &str) -> Option<Duration> {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
}
