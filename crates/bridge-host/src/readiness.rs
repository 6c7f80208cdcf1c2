//! # Readiness Handshake
//!
//! The host cannot observe the view's initialization, so the view announces
//! itself with a `greet` command. Code that depends on the view waits on the
//! [`ReadinessSignal`], never on the channel.
//!
//! ```text
//! Pending ──greet──▶ Greeted
//!    │
//!    └──timer──────▶ TimedOut (warn operator, proceed anyway)
//! ```
//!
//! Both transitions go through one guard, so a greeting and the timer may
//! race freely: whichever fires first wins, the other is a no-op.

use bridge_telemetry::HANDSHAKE_OUTCOMES;
use bridge_types::ViewInstanceId;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::notifier::SharedNotifier;

/// Where the handshake stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessState {
    Pending,
    Greeted,
    TimedOut,
}

/// How the handshake ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The view greeted before the timer fired.
    Greeted,
    /// The timer fired first. Dependent work proceeds regardless.
    TimedOut,
}

impl Readiness {
    pub fn is_greeted(&self) -> bool {
        matches!(self, Readiness::Greeted)
    }
}

/// One-shot readiness signal for one view instance. Clones share state.
#[derive(Clone)]
pub struct ReadinessSignal {
    inner: Arc<Inner>,
}

struct Inner {
    view_id: ViewInstanceId,
    state: watch::Sender<ReadinessState>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl ReadinessSignal {
    pub fn new(view_id: ViewInstanceId) -> Self {
        let (state, _) = watch::channel(ReadinessState::Pending);
        Self {
            inner: Arc::new(Inner {
                view_id,
                state,
                timer: Mutex::new(None),
            }),
        }
    }

    /// View instance this signal belongs to.
    pub fn view_id(&self) -> ViewInstanceId {
        self.inner.view_id
    }

    pub fn state(&self) -> ReadinessState {
        *self.inner.state.borrow()
    }

    /// Record the view's greeting.
    ///
    /// Returns `true` only for the completion that ended the handshake.
    pub fn greet(&self) -> bool {
        let completed = self.complete(ReadinessState::Greeted);

        if completed {
            if let Some(timer) = self.inner.timer.lock().take() {
                timer.abort();
            }
            HANDSHAKE_OUTCOMES.with_label_values(&["greeted"]).inc();
            info!(view_id = %self.inner.view_id, "View greeted");
        } else {
            debug!(
                view_id = %self.inner.view_id,
                state = ?self.state(),
                "Greeting after handshake ended, ignoring"
            );
        }

        completed
    }

    /// Start the fallback timer. When it fires before a greeting, the
    /// operator is warned and the signal completes as timed out.
    ///
    /// Re-arming replaces a running timer. Arming a completed signal does
    /// nothing.
    pub fn arm(&self, delay: Duration, notifier: SharedNotifier) {
        if self.state() != ReadinessState::Pending {
            return;
        }

        let signal = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if signal.complete(ReadinessState::TimedOut) {
                HANDSHAKE_OUTCOMES.with_label_values(&["timed_out"]).inc();
                notifier.warn(&format!(
                    "View {} did not greet within {}ms, continuing without confirmation.",
                    signal.inner.view_id,
                    delay.as_millis()
                ));
            }
        });

        if let Some(previous) = self.inner.timer.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Wait until the handshake ends.
    pub async fn wait(&self) -> Readiness {
        let mut rx = self.inner.state.subscribe();
        let outcome = match rx.wait_for(|state| *state != ReadinessState::Pending).await {
            Ok(state) if *state == ReadinessState::Greeted => Readiness::Greeted,
            _ => Readiness::TimedOut,
        };
        outcome
    }

    /// The single completion guard.
    fn complete(&self, outcome: ReadinessState) -> bool {
        self.inner.state.send_if_modified(|state| {
            if *state == ReadinessState::Pending {
                *state = outcome;
                true
            } else {
                false
            }
        })
    }
}

impl std::fmt::Debug for ReadinessSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadinessSignal")
            .field("view_id", &self.inner.view_id)
            .field("state", &self.state())
            .finish()
    }
}
