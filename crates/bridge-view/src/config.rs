//! View configuration.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Greeting text sent once the view has bootstrapped.
pub const DEFAULT_GREETING: &str = "Hello from the view";

/// View-side settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Reclaim calls still waiting after this many milliseconds.
    /// `None` keeps them until a Response arrives.
    pub orphan_ttl_ms: Option<u64>,
    /// How often the reaper looks for expired calls
    pub reap_interval_ms: u64,
    /// Text carried by the greeting
    pub greeting: String,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            orphan_ttl_ms: None,
            reap_interval_ms: 1000,
            greeting: DEFAULT_GREETING.to_string(),
        }
    }
}

impl ViewConfig {
    /// Defaults overridden from the environment.
    ///
    /// # Environment Variables
    ///
    /// - `BRIDGE_ORPHAN_TTL_MS`: enables reclaiming unanswered calls
    /// - `BRIDGE_REAP_INTERVAL_MS`: reaper period
    pub fn from_env() -> Result<Self, ViewConfigError> {
        let mut config = Self::default();

        if let Ok(value) = env::var("BRIDGE_ORPHAN_TTL_MS") {
            config.orphan_ttl_ms = Some(parse_millis("BRIDGE_ORPHAN_TTL_MS", &value)?);
        }
        if let Ok(value) = env::var("BRIDGE_REAP_INTERVAL_MS") {
            config.reap_interval_ms = parse_millis("BRIDGE_REAP_INTERVAL_MS", &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ViewConfigError> {
        if self.orphan_ttl_ms == Some(0) {
            return Err(ViewConfigError("orphan TTL cannot be 0".into()));
        }
        if self.reap_interval_ms == 0 {
            return Err(ViewConfigError("reap interval cannot be 0".into()));
        }
        Ok(())
    }

    pub fn orphan_ttl(&self) -> Option<Duration> {
        self.orphan_ttl_ms.map(Duration::from_millis)
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_millis(self.reap_interval_ms)
    }
}

/// Invalid view configuration
#[derive(Debug, Error)]
#[error("invalid view configuration: {0}")]
pub struct ViewConfigError(String);

fn parse_millis(name: &str, value: &str) -> Result<u64, ViewConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| ViewConfigError(format!("{} must be milliseconds, got '{}'", name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_keeps_orphans() {
        let config = ViewConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.orphan_ttl(), None);
        assert_eq!(config.reap_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_zero_values_rejected() {
        let config = ViewConfig {
            orphan_ttl_ms: Some(0),
            ..ViewConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ViewConfig {
            reap_interval_ms: 0,
            ..ViewConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ViewConfig = serde_json::from_str(r#"{"orphan_ttl_ms": 30000}"#).unwrap();
        assert_eq!(config.orphan_ttl(), Some(Duration::from_secs(30)));
        assert_eq!(config.greeting, DEFAULT_GREETING);
    }
}
