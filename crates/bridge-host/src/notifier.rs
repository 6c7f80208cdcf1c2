//! Operator-facing warnings.
//!
//! Some conditions (a view that never greeted, a directory entry of an odd
//! kind) are worth telling the person running the host about, not just the
//! log. The notifier is the seam for that.

use parking_lot::Mutex;
use std::sync::Arc;

/// Surfaces warnings to whoever operates the host.
pub trait OperatorNotifier: Send + Sync {
    /// Show a warning.
    fn warn(&self, message: &str);
}

/// Shared notifier handle.
pub type SharedNotifier = Arc<dyn OperatorNotifier>;

/// Notifier that writes warnings to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl OperatorNotifier for LogNotifier {
    fn warn(&self, message: &str) {
        tracing::warn!(operator = true, "{}", message);
    }
}

/// Notifier that keeps every warning in memory, for embedding hosts that
/// display them later and for tests.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    warnings: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Warnings recorded so far, oldest first.
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().clone()
    }
}

impl OperatorNotifier for RecordingNotifier {
    fn warn(&self, message: &str) {
        tracing::warn!(operator = true, "{}", message);
        self.warnings.lock().push(message.to_string());
    }
}
