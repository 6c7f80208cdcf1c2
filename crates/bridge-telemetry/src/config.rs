//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for logging and metrics.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Which side of the bridge this process is (host, view)
    pub side: String,

    /// Log level filter (trace, debug, info, warn, error)
    pub log_level: String,

    /// Whether to write logs at all
    pub console_output: bool,

    /// Whether to emit JSON formatted logs
    pub json_logs: bool,

    /// Whether to use ANSI colours in plain logs
    pub ansi: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "panel-bridge".to_string(),
            side: "host".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            ansi: true,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `BRIDGE_SERVICE_NAME`: Service name (default: panel-bridge)
    /// - `BRIDGE_SIDE`: host or view (default: host)
    /// - `BRIDGE_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `BRIDGE_CONSOLE_OUTPUT`: Enable log output (default: true)
    /// - `BRIDGE_JSON_LOGS`: Enable JSON logs (default: false)
    /// - `NO_COLOR`: Disable ANSI colours when set
    pub fn from_env() -> Self {
        Self {
            service_name: env::var("BRIDGE_SERVICE_NAME")
                .unwrap_or_else(|_| "panel-bridge".to_string()),

            side: env::var("BRIDGE_SIDE").unwrap_or_else(|_| "host".to_string()),

            log_level: env::var("BRIDGE_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            console_output: env::var("BRIDGE_CONSOLE_OUTPUT")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(true),

            json_logs: env::var("BRIDGE_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),

            ansi: env::var("NO_COLOR").is_err(),
        }
    }

    /// Create configuration for one side of the bridge.
    pub fn for_side(side: &str) -> Self {
        let mut config = Self::from_env();
        config.side = side.to_string();
        config
    }

    /// Get the full service name including the side.
    pub fn full_service_name(&self) -> String {
        format!("{}-{}", self.service_name, self.side)
    }
}
