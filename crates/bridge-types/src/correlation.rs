//! Correlation IDs for request tracking.
//!
//! A correlation id links a Request to its eventual Response. Ids only need
//! to be unique among the calls a process has outstanding, so a counter is
//! enough; unpredictability is not a goal.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Correlation id carried by Requests that expect a reply and by every Response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Id substituted when a Request arrives without one.
    pub const SENTINEL: &'static str = "noIdProvided";

    /// Wrap an existing id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The sentinel id used for Requests that did not carry an id.
    pub fn sentinel() -> Self {
        Self(Self::SENTINEL.to_string())
    }

    /// Whether this is the sentinel id.
    pub fn is_sentinel(&self) -> bool {
        self.0 == Self::SENTINEL
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CorrelationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for CorrelationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for CorrelationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Hands out process-unique correlation ids.
///
/// The counter is the only correctness-critical shared state on the calling
/// side: the same id must never be issued twice while a call is outstanding.
#[derive(Debug, Default)]
pub struct CallIdAllocator {
    next: AtomicU64,
}

impl CallIdAllocator {
    /// Create an allocator starting at `0`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next id.
    pub fn allocate(&self) -> CorrelationId {
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        CorrelationId(id.to_string())
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

/// Identifies one host/view binding in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewInstanceId(Uuid);

impl ViewInstanceId {
    /// Generate a new random instance id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ViewInstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ViewInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
