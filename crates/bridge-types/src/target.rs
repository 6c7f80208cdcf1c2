//! # Request Targets
//!
//! A Request names the capability it is addressed to. The set is closed:
//! anything else is a routing error that the receiver reports, never a
//! silent no-op.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The capability a Request is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    /// Host filesystem operations.
    #[serde(rename = "filesystem", alias = "fileSystem")]
    FileSystem,
    /// Host environment operations (editor, shell).
    #[serde(rename = "environment")]
    Environment,
    /// Commands the host pushes into the view.
    #[serde(rename = "view-command", alias = "map")]
    ViewCommand,
}

impl Target {
    /// All recognized targets.
    pub const ALL: [Target; 3] = [Target::FileSystem, Target::Environment, Target::ViewCommand];

    /// Wire name of this target.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Target::FileSystem => "filesystem",
            Target::Environment => "environment",
            Target::ViewCommand => "view-command",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A target string that is not one of the recognized values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized target '{0}'")]
pub struct UnknownTarget(pub String);

impl FromStr for Target {
    type Err = UnknownTarget;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "filesystem" => Ok(Target::FileSystem),
            "environment" => Ok(Target::Environment),
            "view-command" => Ok(Target::ViewCommand),
            // Spellings used by older views
            "fileSystem" => {
                tracing::debug!(target_name = s, "Accepted legacy target spelling");
                Ok(Target::FileSystem)
            }
            "map" => {
                tracing::debug!(target_name = s, "Accepted legacy target spelling");
                Ok(Target::ViewCommand)
            }
            other => Err(UnknownTarget(other.to_string())),
        }
    }
}

/// Where a parsed Request says it is going.
///
/// Unrecognized and unspecified destinations are kept rather than rejected
/// at parse time, so the receiver can answer with an explicit error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// One of the recognized targets.
    Known(Target),
    /// A target string outside the recognized set.
    Unrecognized(String),
    /// No target given.
    Unspecified,
}

impl Destination {
    /// The recognized target, if any.
    #[must_use]
    pub fn known(&self) -> Option<Target> {
        match self {
            Destination::Known(target) => Some(*target),
            _ => None,
        }
    }

    /// The string that goes on the wire, if any.
    #[must_use]
    pub fn wire_name(&self) -> Option<&str> {
        match self {
            Destination::Known(target) => Some(target.as_str()),
            Destination::Unrecognized(name) => Some(name.as_str()),
            Destination::Unspecified => None,
        }
    }
}

impl From<Target> for Destination {
    fn from(target: Target) -> Self {
        Destination::Known(target)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.wire_name() {
            Some(name) => f.write_str(name),
            None => f.write_str("<unspecified>"),
        }
    }
}
