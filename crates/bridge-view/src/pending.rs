//! Pending-call registry.
//!
//! Maps correlation ids to calls that are waiting for a Response. The
//! registry belongs to one dispatcher; independent view instances never
//! share it.
//!
//! Flow:
//! 1. The dispatcher calls `register()` and gets a fresh id and a receiver
//! 2. The dispatcher sends the Request carrying that id
//! 3. The listener receives the Response and calls `complete()`
//! 4. The caller's receiver resolves
//!
//! Entries whose Response never arrives stay registered. Hosts that want
//! them reclaimed run `remove_expired` (see [`reap_expired`]).

use bridge_telemetry::{record_anomaly, PENDING_CALLS};
use bridge_types::{CallIdAllocator, CorrelationId, RemoteError};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

/// What a pending call eventually receives.
pub type CallOutcome = Result<Value, RemoteError>;

/// A call waiting for its Response
struct PendingEntry {
    /// Channel to deliver the outcome
    sender: oneshot::Sender<CallOutcome>,
    /// When the call was issued
    created_at: Instant,
    /// Command name (for logging)
    command: String,
}

/// Statistics for the registry
#[derive(Debug, Default)]
pub struct PendingStats {
    /// Total calls registered
    pub total_registered: AtomicU64,
    /// Total calls completed
    pub total_completed: AtomicU64,
    /// Total calls cancelled, or whose caller stopped waiting
    pub total_cancelled: AtomicU64,
    /// Total calls reclaimed by `remove_expired`
    pub total_expired: AtomicU64,
    /// Total Responses that matched no pending call
    pub total_orphaned: AtomicU64,
}

/// Registry of calls waiting for a Response.
pub struct PendingCalls {
    /// Map of correlation id to pending call
    pending: DashMap<CorrelationId, PendingEntry>,
    /// Source of fresh ids
    ids: CallIdAllocator,
    /// Statistics
    stats: PendingStats,
}

impl Default for PendingCalls {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingCalls {
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
            ids: CallIdAllocator::new(),
            stats: PendingStats::default(),
        }
    }

    /// Register a call and get its id and a receiver for the outcome.
    pub fn register(&self, command: &str) -> (CorrelationId, oneshot::Receiver<CallOutcome>) {
        let correlation_id = self.ids.allocate();
        let (tx, rx) = oneshot::channel();

        let entry = PendingEntry {
            sender: tx,
            created_at: Instant::now(),
            command: command.to_string(),
        };

        self.pending.insert(correlation_id.clone(), entry);
        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);
        PENDING_CALLS.inc();

        debug!(
            correlation_id = %correlation_id,
            command = command,
            "Registered pending call"
        );

        (correlation_id, rx)
    }

    /// Deliver an outcome to the call registered under `correlation_id`.
    ///
    /// Returns true if the call was found and its caller was still waiting.
    /// Unknown ids (never issued, or already resolved) are logged as an
    /// anomaly.
    pub fn complete(&self, correlation_id: &CorrelationId, outcome: CallOutcome) -> bool {
        let Some((_, entry)) = self.pending.remove(correlation_id) else {
            self.stats.total_orphaned.fetch_add(1, Ordering::Relaxed);
            record_anomaly("view", "orphaned_response");
            warn!(
                correlation_id = %correlation_id,
                "Response for unknown or already resolved call"
            );
            return false;
        };
        PENDING_CALLS.dec();

        let response_time = entry.created_at.elapsed();
        match entry.sender.send(outcome) {
            Ok(()) => {
                self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_id = %correlation_id,
                    command = entry.command,
                    response_time_ms = response_time.as_millis(),
                    "Completed pending call"
                );
                true
            }
            Err(_) => {
                // Caller stopped waiting
                self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_id = %correlation_id,
                    command = entry.command,
                    "Pending call receiver dropped"
                );
                false
            }
        }
    }

    /// Remove a call without delivering an outcome. Its caller sees
    /// [`crate::CallError::Dropped`].
    pub fn cancel(&self, correlation_id: &CorrelationId) -> bool {
        if self.pending.remove(correlation_id).is_some() {
            PENDING_CALLS.dec();
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Remove calls older than `max_age`.
    ///
    /// Returns the number of calls removed.
    pub fn remove_expired(&self, max_age: Duration) -> usize {
        let now = Instant::now();
        let mut removed = 0;

        self.pending.retain(|id, entry| {
            let elapsed = now.duration_since(entry.created_at);
            if elapsed > max_age {
                warn!(
                    correlation_id = %id,
                    command = entry.command,
                    elapsed_ms = elapsed.as_millis(),
                    max_age_ms = max_age.as_millis(),
                    "Removing expired pending call"
                );
                removed += 1;
                false
            } else {
                true
            }
        });

        if removed > 0 {
            PENDING_CALLS.sub(removed as f64);
            self.stats
                .total_expired
                .fetch_add(removed as u64, Ordering::Relaxed);
        }
        removed
    }

    /// Number of calls currently waiting
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Check if a correlation id is pending
    pub fn is_pending(&self, correlation_id: &CorrelationId) -> bool {
        self.pending.contains_key(correlation_id)
    }

    /// Number of ids issued so far
    pub fn issued(&self) -> u64 {
        self.ids.issued()
    }

    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }
}

impl std::fmt::Debug for PendingCalls {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCalls")
            .field("pending", &self.pending.len())
            .field("issued", &self.ids.issued())
            .finish()
    }
}

/// Background task reclaiming calls older than `max_age`.
pub async fn reap_expired(calls: Arc<PendingCalls>, max_age: Duration, interval: Duration) {
    let mut reap_interval = tokio::time::interval(interval);
    reap_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        reap_interval.tick().await;
        let removed = calls.remove_expired(max_age);
        if removed > 0 {
            debug!(removed = removed, "Reclaimed expired pending calls");
        }
    }
}
