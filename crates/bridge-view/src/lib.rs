//! # Bridge View
//!
//! The sandboxed side of the bridge. The view cannot touch the filesystem or
//! the operating environment itself; it asks the host through a
//! [`ViewDispatcher`] and gets the answer back as a future.
//!
//! ```text
//! ┌────────────────────────────┐          ┌──────────────┐
//! │ RemoteFileSystem / ...     │          │              │
//! │   │ call(target, command)  │ Request  │              │
//! │   ▼                        │ ───────► │     Host     │
//! │ ViewDispatcher             │          │              │
//! │   - PendingCalls (by id)   │ Response │              │
//! │   - CommandRegistry        │ ◄─────── │              │
//! └────────────────────────────┘          └──────────────┘
//! ```
//!
//! Responses are matched to calls by correlation id only, so calls may
//! overlap and complete in any order.

#![warn(clippy::all)]
#![deny(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod pending;
pub mod remote;

pub use commands::{CommandError, CommandRegistry};
pub use config::{ViewConfig, ViewConfigError, DEFAULT_GREETING};
pub use dispatcher::{PendingCall, ViewDispatcher};
pub use error::CallError;
pub use pending::{reap_expired, CallOutcome, PendingCalls, PendingStats};
pub use remote::{RemoteEnvironment, RemoteFileSystem};
