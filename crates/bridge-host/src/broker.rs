//! # Message Broker
//!
//! Owns the host's end of the channel for exactly one view instance. Inbound
//! Requests are routed by target to a capability table; every Request that
//! carries an id gets exactly one Response back.
//!
//! ## Request Flow
//!
//! ```text
//! View
//!   │
//!   │ Request { id, target, command, parameters }
//!   ▼
//! ┌─────────────────────────────────────┐
//! │  MessageBroker                      │
//! │  - greet → readiness signal         │
//! │  - routes by target                 │
//! │  - invokes capability table         │
//! │  - failures become `error` data     │
//! └─────────────────────────────────────┘
//!   │
//!   │ Response { id, result | error }
//!   ▼
//! View
//! ```
//!
//! The host also pushes Requests into the view (`navigate-to`), which carry
//! no id and expect no reply.

use bridge_channel::{ChannelError, ChannelReceiver, SharedSender};
use bridge_telemetry::{
    record_anomaly, time_histogram, CAPABILITY_DURATION, CAPABILITY_FAILURES, COMMANDS_PUSHED,
    REQUESTS_RECEIVED, RESPONSES_SENT,
};
use bridge_types::{
    classify, codes, peek_id, Classification, CorrelationId, Envelope, Parsed, Request, Response,
    Target, ValidationIssue, ViewInstanceId, NAVIGATE_TO_COMMAND,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

use crate::capability::CapabilityRouter;
use crate::notifier::SharedNotifier;
use crate::readiness::ReadinessSignal;

const SIDE: &str = "host";

/// Host-side broker for one view instance. Clones share everything.
#[derive(Clone)]
pub struct MessageBroker {
    view_id: ViewInstanceId,
    outbound: SharedSender,
    capabilities: Arc<CapabilityRouter>,
    readiness: ReadinessSignal,
    notifier: SharedNotifier,
}

impl MessageBroker {
    pub fn new(
        view_id: ViewInstanceId,
        outbound: SharedSender,
        capabilities: Arc<CapabilityRouter>,
        readiness: ReadinessSignal,
        notifier: SharedNotifier,
    ) -> Self {
        Self {
            view_id,
            outbound,
            capabilities,
            readiness,
            notifier,
        }
    }

    pub fn view_id(&self) -> ViewInstanceId {
        self.view_id
    }

    /// Readiness signal completed by the view's greeting.
    pub fn readiness(&self) -> &ReadinessSignal {
        &self.readiness
    }

    /// Start the handshake timer for this view.
    pub fn arm_handshake(&self, delay: Duration) {
        self.readiness.arm(delay, Arc::clone(&self.notifier));
    }

    /// Handle one raw payload from the view.
    ///
    /// Never fails: protocol and capability problems are logged and, where
    /// the caller can be identified, answered with an `error` Response.
    pub async fn process_message(&self, raw: Value) {
        match classify(&raw) {
            Classification::Request => {}
            Classification::Ambiguous => {
                warn!(view_id = %self.view_id, "Payload looks like both Request and Response, treating as Request");
                record_anomaly(SIDE, "ambiguous");
            }
            Classification::Response => {
                warn!(view_id = %self.view_id, payload = %raw, "Host does not issue calls, dropping Response");
                record_anomaly(SIDE, "unexpected_response");
                return;
            }
            Classification::Unclassifiable => {
                warn!(view_id = %self.view_id, payload = %raw, "Payload is neither Request nor Response, dropping");
                record_anomaly(SIDE, "unclassifiable");
                return;
            }
        }

        let Parsed {
            envelope: request,
            issues,
        } = match Request::from_value(&raw) {
            Ok(parsed) => parsed,
            Err(err) => {
                record_anomaly(SIDE, "malformed");
                self.reject_malformed(&raw, &err.to_string()).await;
                return;
            }
        };

        if request.is_greeting() {
            self.readiness.greet();
            return;
        }

        // Target problems are reported as an unsupported target below
        let mut errors: Vec<String> = issues
            .iter()
            .filter(|issue| {
                !matches!(
                    issue,
                    ValidationIssue::MissingId
                        | ValidationIssue::MissingTarget
                        | ValidationIssue::UnrecognizedTarget(_)
                )
            })
            .map(ToString::to_string)
            .collect();

        let id = match request.id() {
            Some(id) => id.clone(),
            None => {
                errors.push(ValidationIssue::MissingId.to_string());
                record_anomaly(SIDE, "missing_id");
                CorrelationId::sentinel()
            }
        };

        let target_label = request
            .destination()
            .wire_name()
            .unwrap_or("undefined")
            .to_string();
        let metric_label = request
            .destination()
            .known()
            .map_or("unrecognized", |target| target.as_str());
        REQUESTS_RECEIVED.with_label_values(&[metric_label]).inc();

        debug!(
            view_id = %self.view_id,
            correlation_id = %id,
            target = %target_label,
            command = %request.command(),
            "Received request"
        );

        let table = request
            .destination()
            .known()
            .filter(|target| *target != Target::ViewCommand)
            .and_then(|target| self.capabilities.get(target));

        let response = match table {
            Some(table) => {
                let command = request.command().to_string();
                let outcome = {
                    let _timer = time_histogram!(CAPABILITY_DURATION);
                    table.invoke(&command, request.into_parameters()).await
                };

                match outcome {
                    Ok(result) => {
                        let notes = (!errors.is_empty()).then(|| failure_message(&errors, &raw));
                        Response::success_with_notes(id, result, notes)
                    }
                    Err(err) => {
                        CAPABILITY_FAILURES
                            .with_label_values(&[table.target().as_str()])
                            .inc();
                        warn!(
                            view_id = %self.view_id,
                            correlation_id = %id,
                            command = %command,
                            error = %err,
                            "Capability failed"
                        );
                        let code = err.code();
                        errors.push(err.to_string());
                        Response::failure(id, failure_message(&errors, &raw), code)
                    }
                }
            }
            None => {
                warn!(
                    view_id = %self.view_id,
                    correlation_id = %id,
                    target = %target_label,
                    "Unsupported target"
                );
                record_anomaly(SIDE, "unsupported_target");
                errors.push(format!("unsupported target '{}'", target_label));
                Response::failure(id, failure_message(&errors, &raw), codes::UNSUPPORTED_TARGET)
            }
        };

        self.send_response(response).await;
    }

    /// Transmit a Request or Response to the view.
    pub async fn post_message(&self, envelope: &Envelope) -> Result<(), ChannelError> {
        self.outbound.post(envelope.to_value()).await
    }

    /// Push a fire-and-forget command into the view.
    pub async fn push_command(
        &self,
        command: &str,
        parameters: Vec<Value>,
    ) -> Result<(), ChannelError> {
        let request = Request::push(Target::ViewCommand, command, parameters);
        self.post_message(&request.into()).await?;
        COMMANDS_PUSHED.inc();
        debug!(view_id = %self.view_id, command = %command, "Pushed command to view");
        Ok(())
    }

    /// Ask the view to navigate to `location`.
    pub async fn navigate_to(&self, location: &str) -> Result<(), ChannelError> {
        self.push_command(NAVIGATE_TO_COMMAND, vec![Value::String(location.to_string())])
            .await
    }

    /// Process inbound payloads until the channel closes.
    ///
    /// Each payload runs on its own task, so a slow capability does not hold
    /// up unrelated requests. In-flight requests are finished before
    /// returning.
    #[instrument(skip(self, inbound), fields(view_id = %self.view_id), name = "message_broker")]
    pub async fn run<R: ChannelReceiver>(&self, mut inbound: R) {
        info!("Broker listening for view messages");
        let mut in_flight = JoinSet::new();

        while let Some(payload) = inbound.recv().await {
            let broker = self.clone();
            in_flight.spawn(async move { broker.process_message(payload).await });

            while let Some(finished) = in_flight.try_join_next() {
                log_join_failure(finished);
            }
        }

        info!(in_flight = in_flight.len(), "Channel closed, finishing in-flight requests");
        while let Some(finished) = in_flight.join_next().await {
            log_join_failure(finished);
        }
    }

    async fn send_response(&self, response: Response) {
        let outcome = if response.has_result() { "success" } else { "failure" };
        let id = response.id().clone();

        match self.post_message(&response.into()).await {
            Ok(()) => {
                RESPONSES_SENT.with_label_values(&[outcome]).inc();
                debug!(view_id = %self.view_id, correlation_id = %id, outcome, "Sent response");
            }
            Err(err) => {
                error!(view_id = %self.view_id, correlation_id = %id, error = %err, "Failed to send response");
            }
        }
    }

    /// Answer a payload that could not be parsed, if it names an id.
    async fn reject_malformed(&self, raw: &Value, reason: &str) {
        let Some(id) = peek_id(raw) else {
            warn!(view_id = %self.view_id, reason = %reason, "Malformed request without id, dropping");
            return;
        };

        warn!(view_id = %self.view_id, correlation_id = %id, reason = %reason, "Malformed request");
        let errors = [reason.to_string()];
        let response = Response::failure(
            id,
            failure_message(&errors, raw),
            codes::PROTOCOL_ERROR,
        );
        self.send_response(response).await;
    }
}

impl std::fmt::Debug for MessageBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBroker")
            .field("view_id", &self.view_id)
            .field("readiness", &self.readiness)
            .finish()
    }
}

/// `processing message failed: <errors>; received message is '<json>'.`
fn failure_message(errors: &[String], raw: &Value) -> String {
    format!(
        "processing message failed: {}; received message is '{}'.",
        errors.join(", "),
        raw
    )
}

fn log_join_failure(finished: Result<(), tokio::task::JoinError>) {
    if let Err(err) = finished {
        error!(error = %err, "Request task failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{void, CapabilityError, CapabilityTable, Parameters};
    use crate::notifier::RecordingNotifier;
    use crate::readiness::ReadinessState;
    use bridge_channel::{duplex, ChannelSender, MemoryReceiver};
    use serde_json::json;

    fn test_router() -> CapabilityRouter {
        let filesystem = CapabilityTable::builder(Target::FileSystem)
            .register("readFile", |params: Parameters| async move {
                let path = params.string(0)?;
                if path == "/a/b.txt" {
                    Ok(json!("file contents"))
                } else {
                    Err(CapabilityError::Failed("not found".into()))
                }
            })
            .unwrap()
            .register("doesDirentExist", |_params: Parameters| async move { Ok(json!(false)) })
            .unwrap()
            .register("getDirentStatsIfExists", |_params: Parameters| async move {
                Ok(Value::Null)
            })
            .unwrap()
            .register("makeFolder", |_params: Parameters| async move { Ok(void()) })
            .unwrap()
            .build();
        CapabilityRouter::new().with(filesystem)
    }

    fn broker() -> (MessageBroker, MemoryReceiver, Arc<RecordingNotifier>) {
        let (host, view) = duplex(16);
        let (host_tx, _host_rx) = host.split();
        let (_view_tx, view_rx) = view.split();
        let notifier = Arc::new(RecordingNotifier::new());
        let view_id = ViewInstanceId::new();
        let broker = MessageBroker::new(
            view_id,
            Arc::new(host_tx),
            Arc::new(test_router()),
            ReadinessSignal::new(view_id),
            notifier.clone(),
        );
        (broker, view_rx, notifier)
    }

    async fn reply(broker: &MessageBroker, rx: &mut MemoryReceiver, payload: Value) -> Value {
        broker.process_message(payload).await;
        rx.recv().await.unwrap()
    }

    #[tokio::test]
    async fn test_read_file_success() {
        let (broker, mut rx, _) = broker();
        let response = reply(
            &broker,
            &mut rx,
            json!({"id": "3", "target": "filesystem", "command": "readFile", "parameters": ["/a/b.txt"]}),
        )
        .await;
        assert_eq!(response, json!({"id": "3", "result": "file contents"}));
    }

    #[tokio::test]
    async fn test_read_file_failure() {
        let (broker, mut rx, _) = broker();
        let payload = json!({"id": "4", "target": "filesystem", "command": "readFile", "parameters": ["/missing"]});
        let response = reply(&broker, &mut rx, payload.clone()).await;

        assert_eq!(response["id"], "4");
        assert!(response.get("result").is_none());
        assert_eq!(
            response["error"],
            format!(
                "processing message failed: not found; received message is '{}'.",
                payload
            )
        );
        assert_eq!(response["errorCode"], codes::CAPABILITY_FAILED);
    }

    #[tokio::test]
    async fn test_falsy_and_null_results_are_present() {
        let (broker, mut rx, _) = broker();
        let response = reply(
            &broker,
            &mut rx,
            json!({"id": "1", "target": "filesystem", "command": "doesDirentExist", "parameters": ["/x"]}),
        )
        .await;
        assert_eq!(response, json!({"id": "1", "result": false}));

        let response = reply(
            &broker,
            &mut rx,
            json!({"id": "2", "target": "filesystem", "command": "getDirentStatsIfExists", "parameters": ["/x"]}),
        )
        .await;
        assert_eq!(response, json!({"id": "2", "result": null}));
    }

    #[tokio::test]
    async fn test_void_result_is_empty_object() {
        let (broker, mut rx, _) = broker();
        let response = reply(
            &broker,
            &mut rx,
            json!({"id": "5", "target": "filesystem", "command": "makeFolder", "parameters": ["/x"]}),
        )
        .await;
        assert_eq!(response, json!({"id": "5", "result": {}}));
    }

    #[tokio::test]
    async fn test_unknown_target_answers_with_same_id() {
        let (broker, mut rx, _) = broker();
        for target in [json!("printer"), json!("view-command"), json!("environment")] {
            let response = reply(
                &broker,
                &mut rx,
                json!({"id": "9", "target": target, "command": "x", "parameters": []}),
            )
            .await;
            assert_eq!(response["id"], "9");
            assert!(response.get("result").is_none());
            assert!(response["error"].as_str().unwrap().contains("unsupported target"));
            assert_eq!(response["errorCode"], codes::UNSUPPORTED_TARGET);
        }
    }

    #[tokio::test]
    async fn test_missing_target_is_unsupported() {
        let (broker, mut rx, _) = broker();
        let response = reply(
            &broker,
            &mut rx,
            json!({"id": "9", "command": "readFile", "parameters": []}),
        )
        .await;
        assert!(response["error"]
            .as_str()
            .unwrap()
            .starts_with("processing message failed: unsupported target 'undefined'"));
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let (broker, mut rx, _) = broker();
        let response = reply(
            &broker,
            &mut rx,
            json!({"id": "6", "target": "filesystem", "command": "format", "parameters": []}),
        )
        .await;
        assert_eq!(response["errorCode"], codes::UNKNOWN_COMMAND);
    }

    #[tokio::test]
    async fn test_missing_id_uses_sentinel_and_notes_it() {
        let (broker, mut rx, _) = broker();
        let payload = json!({"target": "filesystem", "command": "readFile", "parameters": ["/a/b.txt"]});
        let response = reply(&broker, &mut rx, payload.clone()).await;

        assert_eq!(response["id"], "noIdProvided");
        assert_eq!(response["result"], "file contents");
        assert_eq!(
            response["error"],
            format!(
                "processing message failed: message has no id; received message is '{}'.",
                payload
            )
        );
    }

    #[tokio::test]
    async fn test_missing_id_and_failure_accumulate() {
        let (broker, mut rx, _) = broker();
        let payload = json!({"target": "filesystem", "command": "readFile", "parameters": ["/nope"]});
        let response = reply(&broker, &mut rx, payload).await;
        assert!(response["error"]
            .as_str()
            .unwrap()
            .starts_with("processing message failed: message has no id, not found;"));
    }

    #[tokio::test]
    async fn test_greet_sends_nothing() {
        let (broker, mut rx, _) = broker();
        broker
            .process_message(json!({"command": "greet", "parameters": ["initialized"]}))
            .await;
        broker
            .process_message(json!({"command": "greet", "parameters": ["initialized"]}))
            .await;

        assert_eq!(broker.readiness().state(), ReadinessState::Greeted);
        assert!(rx.try_recv().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_responses_and_garbage_are_dropped() {
        let (broker, mut rx, _) = broker();
        broker.process_message(json!({"id": "1", "result": 1})).await;
        broker.process_message(json!({"hello": "world"})).await;
        broker.process_message(json!([1, 2, 3])).await;
        assert!(rx.try_recv().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_request_with_id_is_answered() {
        let (broker, mut rx, _) = broker();
        let response = reply(
            &broker,
            &mut rx,
            json!({"id": "7", "target": "filesystem", "command": "readFile", "parameters": "oops"}),
        )
        .await;
        assert_eq!(response["id"], "7");
        assert_eq!(response["errorCode"], codes::PROTOCOL_ERROR);
    }

    #[tokio::test]
    async fn test_malformed_request_with_numeric_id_is_answered() {
        let (broker, mut rx, _) = broker();
        let response = reply(
            &broker,
            &mut rx,
            json!({"id": 8, "target": "filesystem", "command": "readFile", "parameters": "oops"}),
        )
        .await;
        assert_eq!(response["id"], "8");
        assert_eq!(response["errorCode"], codes::PROTOCOL_ERROR);
    }

    #[tokio::test]
    async fn test_navigate_to_push() {
        let (broker, mut rx, _) = broker();
        broker.navigate_to("/x/y").await.unwrap();
        assert_eq!(
            rx.recv().await.unwrap(),
            json!({"target": "view-command", "command": "navigate-to", "parameters": ["/x/y"]})
        );
    }

    #[tokio::test]
    async fn test_run_answers_every_request() {
        let (host, view) = duplex(16);
        let (host_tx, host_rx) = host.split();
        let (view_tx, mut view_rx) = view.split();
        let view_id = ViewInstanceId::new();
        let broker = MessageBroker::new(
            view_id,
            Arc::new(host_tx),
            Arc::new(test_router()),
            ReadinessSignal::new(view_id),
            Arc::new(RecordingNotifier::new()),
        );
        let task = tokio::spawn(async move { broker.run(host_rx).await });

        for i in 0..5 {
            view_tx
                .post(json!({"id": i.to_string(), "target": "filesystem", "command": "readFile", "parameters": ["/a/b.txt"]}))
                .await
                .unwrap();
        }
        drop(view_tx);

        let mut ids = Vec::new();
        for _ in 0..5 {
            let response = view_rx.recv().await.unwrap();
            assert_eq!(response["result"], "file contents");
            ids.push(response["id"].as_str().unwrap().to_string());
        }
        ids.sort();
        assert_eq!(ids, vec!["0", "1", "2", "3", "4"]);

        task.await.unwrap();
    }
}
