//! Runtime configuration.
//!
//! Collects the host and view settings and adds the transport choice.

use bridge_channel::DEFAULT_CHANNEL_CAPACITY;
use bridge_host::{ConfigError, HostConfig};
use bridge_view::{ViewConfig, ViewConfigError};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use thiserror::Error;

/// How the host reaches its view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// JSON lines over stdin/stdout
    #[default]
    Stdio,
    /// In-process loopback view
    Memory,
}

impl FromStr for Transport {
    type Err = RuntimeConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdio" => Ok(Transport::Stdio),
            "memory" => Ok(Transport::Memory),
            other => Err(RuntimeConfigError::Invalid(format!(
                "BRIDGE_TRANSPORT must be 'stdio' or 'memory', got '{}'",
                other
            ))),
        }
    }
}

/// Runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub transport: Transport,
    /// Capacity of in-memory channels
    pub channel_capacity: usize,
    /// Location pushed to the view once it is ready
    pub initial_location: Option<String>,
    pub host: HostConfig,
    pub view: ViewConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            transport: Transport::default(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            initial_location: None,
            host: HostConfig::default(),
            view: ViewConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Defaults overridden from the environment.
    ///
    /// Reads `BRIDGE_TRANSPORT`, `BRIDGE_CHANNEL_CAPACITY` and
    /// `BRIDGE_INITIAL_LOCATION`, plus everything [`HostConfig::from_env`]
    /// and [`ViewConfig::from_env`] read.
    pub fn from_env() -> Result<Self, RuntimeConfigError> {
        let mut config = Self {
            host: HostConfig::from_env()?,
            view: ViewConfig::from_env()?,
            ..Self::default()
        };

        if let Ok(transport) = env::var("BRIDGE_TRANSPORT") {
            config.transport = transport.parse()?;
        }

        if let Ok(value) = env::var("BRIDGE_CHANNEL_CAPACITY") {
            config.channel_capacity = value.trim().parse().map_err(|_| {
                RuntimeConfigError::Invalid(format!(
                    "BRIDGE_CHANNEL_CAPACITY must be a positive integer, got '{}'",
                    value
                ))
            })?;
        }

        if let Ok(location) = env::var("BRIDGE_INITIAL_LOCATION") {
            if !location.trim().is_empty() {
                config.initial_location = Some(location);
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RuntimeConfigError> {
        if self.channel_capacity == 0 {
            return Err(RuntimeConfigError::Invalid(
                "channel capacity cannot be 0".into(),
            ));
        }
        self.host.validate()?;
        self.view.validate()?;
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum RuntimeConfigError {
    #[error(transparent)]
    Host(#[from] ConfigError),

    #[error(transparent)]
    View(#[from] ViewConfigError),

    #[error("invalid runtime configuration: {0}")]
    Invalid(String),
}
