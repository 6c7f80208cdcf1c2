//! Host configuration with validation.
//!
//! Defaults are usable as is; every field can be overridden from a
//! `BRIDGE_*` environment variable.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default time the host waits for the view's greeting.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(5000);

/// Main host configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Readiness handshake configuration
    pub handshake: HandshakeConfig,
    /// Filesystem capability configuration
    pub filesystem: FileSystemConfig,
    /// Environment capability configuration
    pub environment: EnvironmentConfig,
}

impl HostConfig {
    /// Defaults overridden from the environment.
    ///
    /// # Environment Variables
    ///
    /// - `BRIDGE_HANDSHAKE_TIMEOUT_MS`: greeting timeout in milliseconds
    /// - `BRIDGE_EXTENSION_ROOT`: root that `./` paths resolve against
    /// - `BRIDGE_WORKSPACE_FOLDERS`: workspace folders, separated like `PATH`
    /// - `BRIDGE_ENVIRONMENT_NAME`: name reported by `getEnvironmentName`
    /// - `BRIDGE_EDITOR`: program `openFile` launches
    /// - `BRIDGE_SHELL`: shell `runShellCommand` runs commands with
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(value) = env::var("BRIDGE_HANDSHAKE_TIMEOUT_MS") {
            let millis = value.trim().parse::<u64>().map_err(|_| {
                ConfigError::InvalidTimeout(format!(
                    "BRIDGE_HANDSHAKE_TIMEOUT_MS must be milliseconds, got '{}'",
                    value
                ))
            })?;
            config.handshake.timeout = Duration::from_millis(millis);
        }

        if let Ok(root) = env::var("BRIDGE_EXTENSION_ROOT") {
            config.filesystem.extension_root = PathBuf::from(root);
        }

        if let Some(folders) = env::var_os("BRIDGE_WORKSPACE_FOLDERS") {
            config.filesystem.workspace_folders = env::split_paths(&folders)
                .filter(|folder| !folder.as_os_str().is_empty())
                .collect();
        }

        if let Ok(name) = env::var("BRIDGE_ENVIRONMENT_NAME") {
            config.environment.name = name;
        }

        if let Ok(editor) = env::var("BRIDGE_EDITOR") {
            config.environment.editor = editor;
        }

        if let Ok(shell) = env::var("BRIDGE_SHELL") {
            config.environment.shell = shell;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.handshake.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "handshake timeout cannot be 0".into(),
            ));
        }

        if self.environment.name.trim().is_empty() {
            return Err(ConfigError::Invalid("environment name cannot be empty".into()));
        }

        if self.environment.editor.trim().is_empty() {
            return Err(ConfigError::Invalid("editor cannot be empty".into()));
        }

        if self.environment.shell.trim().is_empty() {
            return Err(ConfigError::Invalid("shell cannot be empty".into()));
        }

        Ok(())
    }
}

/// Readiness handshake configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HandshakeConfig {
    /// How long to wait for the view's greeting before proceeding anyway
    #[serde(with = "millis_serde")]
    pub timeout: Duration,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }
}

/// Filesystem capability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSystemConfig {
    /// Root that `./`-relative paths resolve against (inside its `out` dir)
    pub extension_root: PathBuf,
    /// Workspace folders; the first one answers `getWorkspaceFolderPath`
    pub workspace_folders: Vec<PathBuf>,
}

impl Default for FileSystemConfig {
    fn default() -> Self {
        Self {
            extension_root: PathBuf::from("."),
            workspace_folders: Vec::new(),
        }
    }
}

/// Environment capability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Name reported to the view
    pub name: String,
    /// Program used to open files
    pub editor: String,
    /// Shell used for shell commands
    pub shell: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            name: "headless".to_string(),
            editor: default_editor().to_string(),
            shell: default_shell().to_string(),
        }
    }
}

#[cfg(windows)]
fn default_editor() -> &'static str {
    "notepad"
}

#[cfg(not(windows))]
fn default_editor() -> &'static str {
    "xdg-open"
}

#[cfg(windows)]
fn default_shell() -> &'static str {
    "cmd"
}

#[cfg(not(windows))]
fn default_shell() -> &'static str {
    "sh"
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Durations as integer milliseconds, or strings like `"5000ms"` / `"5s"`.
mod millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}ms", duration.as_millis()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Millis(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Millis(ms) => Ok(Duration::from_millis(ms)),
            Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
        }
    }

    fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else {
            s.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid duration format")
        }
    }
}
