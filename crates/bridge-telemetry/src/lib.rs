//! # Bridge Telemetry
//!
//! Structured logging for processes embedding the plugin bridge.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bridge_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(TelemetryConfig::from_env())?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `plugin-bridge` | Service name attached to the startup log |
//! | `BRIDGE_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `BRIDGE_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `BRIDGE_JSON_LOGS` | `false` (`true` in containers) | JSON formatted logs |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::{init_logging, LoggingGuard};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Failed to install subscriber: {0}")]
    Subscriber(String),
}

/// Initialize logging for the process.
///
/// Returns a guard to hold for the lifetime of the application. Fails if a
/// global subscriber is already installed.
pub fn init_telemetry(config: TelemetryConfig) -> Result<LoggingGuard, TelemetryError> {
    init_logging(&config)
}

/// Install a test subscriber, ignoring the error when one already exists.
///
/// Safe to call from every test.
pub fn init_test_logging() {
    let config = TelemetryConfig {
        log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string()),
        json_logs: false,
        ..TelemetryConfig::default()
    };
    let _ = init_logging(&config);
}
