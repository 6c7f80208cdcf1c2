//! # Bridge Telemetry
//!
//! Logging and metrics for both sides of the panel bridge.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bridge_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::for_side("host");
//! let _guard = init_telemetry(&config).expect("Failed to init telemetry");
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `BRIDGE_SERVICE_NAME` | `panel-bridge` | Service name in logs |
//! | `BRIDGE_SIDE` | `host` | Which side of the bridge |
//! | `BRIDGE_LOG_LEVEL` | `info` | Log level filter |
//! | `BRIDGE_JSON_LOGS` | `false` | JSON formatted logs |

#![cfg_attr(test, allow(clippy::unwrap_used))]

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::{init_logging, StructuredLogger};
pub use metrics::{
    encode_metrics, record_anomaly, register_metrics, MetricsHandle, CALLS_ISSUED,
    CAPABILITY_DURATION, CAPABILITY_FAILURES, COMMANDS_PUSHED, HANDSHAKE_OUTCOMES,
    PENDING_CALLS, PROTOCOL_ANOMALIES, REQUESTS_RECEIVED, RESPONSES_SENT,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and register metrics.
///
/// Returns a guard that must be held for the lifetime of the application.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    // Metrics first (synchronous, no global subscriber involved)
    let metrics_handle = register_metrics()?;

    let logger = init_logging(config)?;

    Ok(TelemetryGuard {
        _logger: logger,
        _metrics: metrics_handle,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _logger: StructuredLogger,
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}
