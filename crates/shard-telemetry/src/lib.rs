//! # Shard Telemetry
//!
//! Structured logging for shard-rendezvous processes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shard_telemetry::{init_logging, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_logging(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `shard-rendezvous` | Service name attached to startup log |
//! | `SHARD_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `SHARD_JSON_LOGS` | `false` | JSON instead of pretty output |
//! | `SHARD_CONSOLE_OUTPUT` | `true` | Emit to stdout at all |

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::{build_filter, init_logging};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// A global subscriber could not be installed.
    #[error("Failed to initialize tracing subscriber: {0}")]
    SubscriberInit(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TelemetryError::Config("bad level".into());
        assert_eq!(err.to_string(), "Invalid configuration: bad level");
    }
}
