//! # Bridge Types Crate
//!
//! Everything that crosses the channel between the host and the view:
//! the `Request` and `Response` envelopes, correlation ids, the closed set of
//! targets, and the data shapes of the filesystem and environment
//! capabilities.
//!
//! ## Design Principles
//!
//! - **Data only**: envelopes are plain structural values; nothing executable
//!   and nothing cyclic ever crosses.
//! - **Explicit parsing**: untyped payloads are parsed into new typed values
//!   with descriptive errors; tolerated deviations are reported, not hidden.
//! - **Errors as data**: failures cross the boundary as a `Response` with
//!   `error` set, never as a panic.

#![warn(clippy::all)]
#![deny(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod capability;
pub mod correlation;
pub mod envelope;
pub mod errors;
pub mod target;

pub use correlation::{CallIdAllocator, CorrelationId, ViewInstanceId};
pub use envelope::{
    classify, peek_id, Classification, Envelope, Parsed, RemoteError, Request, Resolution, Response,
    GREET_COMMAND, NAVIGATE_TO_COMMAND,
};
pub use errors::{codes, json_type_name, EnvelopeError, ValidationIssue};
pub use target::{Destination, Target, UnknownTarget};
