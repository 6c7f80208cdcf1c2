//! # Bridge Host
//!
//! The privileged side of the bridge. A [`MessageBroker`] owns one channel
//! endpoint bound to one view instance and turns the view's Requests into
//! capability invocations.
//!
//! ## Modules
//!
//! - [`broker`]: routing, responses, host-initiated pushes
//! - [`capability`]: closed command tables for `filesystem` and `environment`
//! - [`readiness`]: the greet/timeout handshake
//! - [`config`]: host configuration
//! - [`path`]: path helpers for paths sent by the view
//! - [`notifier`]: operator-facing warnings

#![warn(clippy::all)]
#![deny(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod broker;
pub mod capability;
pub mod config;
pub mod notifier;
pub mod path;
pub mod readiness;

pub use broker::MessageBroker;
pub use capability::{
    CapabilityError, CapabilityRouter, CapabilityTable, CapabilityTableBuilder, Parameters,
    RegistrationError,
};
pub use config::{ConfigError, HostConfig, DEFAULT_HANDSHAKE_TIMEOUT};
pub use notifier::{LogNotifier, OperatorNotifier, RecordingNotifier, SharedNotifier};
pub use path::{normalize_path, to_extension_path};
pub use readiness::{Readiness, ReadinessSignal, ReadinessState};
