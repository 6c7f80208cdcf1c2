//! # View Dispatcher
//!
//! The view's end of the channel. Calls to host capabilities go out as
//! Requests with a fresh id; the listener matches each Response to its call
//! by id and resolves it. Requests pushed by the host are routed to the
//! [`CommandRegistry`].
//!
//! Any number of calls may be outstanding at once and Responses may arrive
//! in any order.

use bridge_channel::{ChannelReceiver, SharedSender};
use bridge_telemetry::{record_anomaly, CALLS_ISSUED};
use bridge_types::{
    classify, peek_id, Classification, CorrelationId, RemoteError, Request, Response, Target,
    ValidationIssue,
};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::commands::CommandRegistry;
use crate::config::ViewConfig;
use crate::error::CallError;
use crate::pending::{reap_expired, CallOutcome, PendingCalls};

const SIDE: &str = "view";

/// A call that has been sent and is waiting for its Response.
///
/// Resolves to the host's result or error. Dropping it abandons the call;
/// a late Response for it is discarded.
#[derive(Debug)]
pub struct PendingCall {
    id: CorrelationId,
    receiver: oneshot::Receiver<CallOutcome>,
}

impl PendingCall {
    /// Id carried by the Request.
    pub fn id(&self) -> &CorrelationId {
        &self.id
    }
}

impl Future for PendingCall {
    type Output = Result<Value, CallError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        Pin::new(&mut this.receiver).poll(cx).map(|received| match received {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(remote)) => Err(CallError::from(remote)),
            Err(_) => Err(CallError::Dropped),
        })
    }
}

/// View-side dispatcher. Clones share the pending-call registry.
#[derive(Clone)]
pub struct ViewDispatcher {
    outbound: SharedSender,
    pending: Arc<PendingCalls>,
    commands: Arc<CommandRegistry>,
}

impl ViewDispatcher {
    pub fn new(outbound: SharedSender, commands: CommandRegistry) -> Self {
        Self {
            outbound,
            pending: Arc::new(PendingCalls::new()),
            commands: Arc::new(commands),
        }
    }

    /// Registry of calls still waiting for a Response.
    pub fn pending(&self) -> &Arc<PendingCalls> {
        &self.pending
    }

    /// Send a call and return without waiting for its Response.
    ///
    /// The call is registered before the Request leaves, so a Response can
    /// never arrive ahead of its entry.
    pub async fn issue(
        &self,
        target: Target,
        command: &str,
        parameters: Vec<Value>,
    ) -> Result<PendingCall, CallError> {
        let (id, receiver) = self.pending.register(command);
        let request = Request::call(id.clone(), target, command, parameters);

        if let Err(err) = self.outbound.post(request.to_value()).await {
            self.pending.cancel(&id);
            warn!(correlation_id = %id, command = %command, error = %err, "Failed to send call");
            return Err(CallError::Channel(err.to_string()));
        }

        CALLS_ISSUED.inc();
        debug!(correlation_id = %id, target = %target, command = %command, "Issued call");
        Ok(PendingCall { id, receiver })
    }

    /// Send a call and wait for its Response.
    pub async fn call(
        &self,
        target: Target,
        command: &str,
        parameters: Vec<Value>,
    ) -> Result<Value, CallError> {
        self.issue(target, command, parameters).await?.await
    }

    /// Tell the host the view has finished bootstrapping.
    ///
    /// Sending it more than once is harmless.
    pub async fn greet(&self, message: &str) -> Result<(), CallError> {
        self.outbound
            .post(Request::greet(message).to_value())
            .await
            .map_err(|err| CallError::Channel(err.to_string()))
    }

    /// Handle one raw payload from the host. Never fails; problems are
    /// logged.
    pub fn handle_payload(&self, raw: Value) {
        match classify(&raw) {
            Classification::Response => self.handle_response(&raw),
            Classification::Request => self.handle_command(&raw),
            Classification::Ambiguous => {
                warn!(payload = %raw, "Payload looks like both Request and Response, treating as Request");
                record_anomaly(SIDE, "ambiguous");
                self.handle_command(&raw);
            }
            Classification::Unclassifiable => {
                warn!(payload = %raw, "Payload is neither Request nor Response, dropping");
                record_anomaly(SIDE, "unclassifiable");
            }
        }
    }

    fn handle_response(&self, raw: &Value) {
        let parsed = match Response::from_value(raw) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(payload = %raw, error = %err, "Malformed response");
                record_anomaly(SIDE, "malformed");
                // A reply to a known call still settles it.
                if let Some(id) = peek_id(raw) {
                    let outcome = Err(RemoteError {
                        message: format!("malformed response: {}", err),
                        code: None,
                    });
                    self.pending.complete(&id, outcome);
                }
                return;
            }
        };

        for issue in &parsed.issues {
            match issue {
                ValidationIssue::ErrorNotString(_) => record_anomaly(SIDE, "error_not_string"),
                ValidationIssue::ErrorCodeNotInteger(_) => {
                    record_anomaly(SIDE, "error_code_not_integer")
                }
                _ => {}
            }
        }

        let id = parsed.envelope.id().clone();
        let resolution = parsed.envelope.into_resolution();
        match resolution.anomaly {
            Some(ValidationIssue::BothResultAndError) => {
                record_anomaly(SIDE, "both_result_and_error")
            }
            Some(_) => record_anomaly(SIDE, "neither_result_nor_error"),
            None => {}
        }

        self.pending.complete(&id, resolution.outcome);
    }

    fn handle_command(&self, raw: &Value) {
        let request = match Request::from_value(raw) {
            Ok(parsed) => parsed.envelope,
            Err(err) => {
                warn!(payload = %raw, error = %err, "Malformed command, dropping");
                record_anomaly(SIDE, "malformed");
                return;
            }
        };

        if request.destination().known() != Some(Target::ViewCommand) {
            warn!(
                target = %request.destination(),
                command = %request.command(),
                "Request not addressed to the view, ignoring"
            );
            record_anomaly(SIDE, "unsupported_target");
            return;
        }

        match self.commands.dispatch(request.command(), request.parameters()) {
            Ok(()) => debug!(command = %request.command(), "Handled pushed command"),
            Err(err) => warn!(command = %request.command(), error = %err, "Pushed command rejected"),
        }
    }

    /// Process inbound payloads until the channel closes.
    ///
    /// Calls still pending at that point stay pending.
    #[instrument(skip(self, inbound), name = "view_dispatcher")]
    pub async fn run<R: ChannelReceiver>(&self, mut inbound: R) {
        info!("Dispatcher listening for host messages");
        while let Some(payload) = inbound.recv().await {
            self.handle_payload(payload);
        }
        info!(
            pending = self.pending.pending_count(),
            "Channel closed, dispatcher stopping"
        );
    }

    /// Start the orphan reaper if `config` enables one.
    pub fn spawn_reaper(&self, config: &ViewConfig) -> Option<JoinHandle<()>> {
        let ttl = config.orphan_ttl()?;
        Some(tokio::spawn(reap_expired(
            Arc::clone(&self.pending),
            ttl,
            config.reap_interval(),
        )))
    }
}

impl std::fmt::Debug for ViewDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewDispatcher")
            .field("pending", &self.pending)
            .field("commands", &self.commands)
            .finish()
    }
}
