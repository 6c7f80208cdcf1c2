//! # Call and Push Flows
//!
//! A view issues calls through its dispatcher, the host broker routes them to
//! capability tables, and every Response finds its way back to the right
//! caller. The host pushes `navigate-to` the other way.

#[cfg(test)]
mod tests {
    use super::super::Bridge;
    use bridge_channel::{duplex, ChannelReceiver, ChannelSender};
    use bridge_host::{
        CapabilityError, CapabilityRouter, CapabilityTable, HostConfig, Parameters,
        RecordingNotifier,
    };
    use bridge_types::{codes, Target};
    use bridge_view::{CallError, CommandRegistry, RemoteEnvironment};
    use futures::future::join_all;
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Notify;

    // =========================================================================
    // FIXTURES
    // =========================================================================

    /// Filesystem table answering from a fixed map, so results are known.
    fn scripted_router() -> CapabilityRouter {
        let filesystem = CapabilityTable::builder(Target::FileSystem)
            .register("readFile", |params: Parameters| async move {
                match params.string(0)?.as_str() {
                    "/a/b.txt" => Ok(json!("file contents")),
                    other => Err(CapabilityError::Failed(format!("no such file: {}", other))),
                }
            })
            .unwrap()
            .register("doesDirentExist", |_params: Parameters| async move { Ok(json!(false)) })
            .unwrap()
            .register("getDirentStatsIfExists", |_params: Parameters| async move {
                Ok(Value::Null)
            })
            .unwrap()
            .register("count", |_params: Parameters| async move { Ok(json!(0)) })
            .unwrap()
            .register("echo", |params: Parameters| async move { params.value::<Value>(0) })
            .unwrap()
            .build();
        CapabilityRouter::new().with(filesystem)
    }

    fn scripted_bridge() -> Bridge {
        Bridge::connect_with(
            scripted_router(),
            CommandRegistry::new(),
            Arc::new(RecordingNotifier::new()),
        )
    }

    // =========================================================================
    // CALLS
    // =========================================================================

    #[tokio::test]
    async fn test_call_resolves_with_result() {
        let bridge = scripted_bridge();
        let result = bridge
            .view
            .call(Target::FileSystem, "readFile", vec![json!("/a/b.txt")])
            .await
            .unwrap();
        assert_eq!(result, json!("file contents"));
        assert_eq!(bridge.view.pending().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_falsy_results_resolve_not_reject() {
        let bridge = scripted_bridge();

        let exists = bridge
            .view
            .call(Target::FileSystem, "doesDirentExist", vec![json!("/nope")])
            .await
            .unwrap();
        assert_eq!(exists, json!(false));

        let stats = bridge
            .view
            .call(Target::FileSystem, "getDirentStatsIfExists", vec![json!("/nope")])
            .await
            .unwrap();
        assert_eq!(stats, Value::Null);

        let count = bridge
            .view
            .call(Target::FileSystem, "count", vec![])
            .await
            .unwrap();
        assert_eq!(count, json!(0));

        let empty = bridge
            .view
            .call(Target::FileSystem, "echo", vec![json!("")])
            .await
            .unwrap();
        assert_eq!(empty, json!(""));
    }

    #[tokio::test]
    async fn test_capability_failure_rejects_with_host_message() {
        let bridge = scripted_bridge();
        let err = bridge
            .view
            .call(Target::FileSystem, "readFile", vec![json!("/missing")])
            .await
            .unwrap_err();

        let message = err.remote_message().unwrap();
        assert!(message.starts_with("processing message failed: no such file: /missing; "));
        assert!(message.contains("received message is '"));
        assert_eq!(err.code(), Some(codes::CAPABILITY_FAILED));
    }

    #[tokio::test]
    async fn test_unserved_target_rejects() {
        let bridge = scripted_bridge();
        let err = bridge
            .view
            .call(Target::Environment, "getEnvironmentName", vec![])
            .await
            .unwrap_err();

        assert!(err
            .remote_message()
            .unwrap()
            .contains("unsupported target 'environment'"));
        assert_eq!(err.code(), Some(codes::UNSUPPORTED_TARGET));
    }

    #[tokio::test]
    async fn test_unknown_command_rejects() {
        let bridge = scripted_bridge();
        let err = bridge
            .view
            .call(Target::FileSystem, "formatDisk", vec![])
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(codes::UNKNOWN_COMMAND));
    }

    #[tokio::test]
    async fn test_concurrent_calls_get_distinct_ids_and_own_results() {
        let bridge = scripted_bridge();

        let mut calls = Vec::new();
        for i in 0..50 {
            calls.push(
                bridge
                    .view
                    .issue(Target::FileSystem, "echo", vec![json!(i)])
                    .await
                    .unwrap(),
            );
        }

        let ids: std::collections::HashSet<_> =
            calls.iter().map(|call| call.id().clone()).collect();
        assert_eq!(ids.len(), 50);

        let results = join_all(calls).await;
        for (i, result) in results.into_iter().enumerate() {
            assert_eq!(result.unwrap(), json!(i));
        }
    }

    #[tokio::test]
    async fn test_responses_out_of_order_reach_their_callers() {
        // Host whose first call blocks until the second has been answered
        let release = Arc::new(Notify::new());
        let table = CapabilityTable::builder(Target::FileSystem)
            .register("slow", {
                let release = release.clone();
                move |_params: Parameters| {
                    let release = release.clone();
                    async move {
                        release.notified().await;
                        Ok(json!("slow"))
                    }
                }
            })
            .unwrap()
            .register("fast", |_params: Parameters| async move { Ok(json!("fast")) })
            .unwrap()
            .build();
        let bridge = Bridge::connect_with(
            CapabilityRouter::new().with(table),
            CommandRegistry::new(),
            Arc::new(RecordingNotifier::new()),
        );

        let slow = bridge.view.issue(Target::FileSystem, "slow", vec![]).await.unwrap();
        let fast = bridge.view.call(Target::FileSystem, "fast", vec![]).await.unwrap();
        assert_eq!(fast, json!("fast"));
        assert!(bridge.view.pending().is_pending(slow.id()));

        release.notify_one();
        assert_eq!(slow.await.unwrap(), json!("slow"));
    }

    #[tokio::test]
    async fn test_local_environment_through_typed_proxy() {
        let mut config = HostConfig::default();
        config.environment.name = "integration".into();
        let bridge = Bridge::connect(&config, CommandRegistry::new());

        let environment = RemoteEnvironment::new(bridge.view.clone());
        assert_eq!(environment.get_environment_name().await.unwrap(), "integration");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_shell_command_through_typed_proxy() {
        let bridge = Bridge::connect(&HostConfig::default(), CommandRegistry::new());
        let environment = RemoteEnvironment::new(bridge.view.clone());

        let output = environment.run_shell_command("echo bridged").await.unwrap();
        assert_eq!(output.stdout.trim(), "bridged");
        assert_eq!(output.exit_code, Some(0));
    }

    // =========================================================================
    // WIRE EXAMPLES
    // =========================================================================

    /// Drive the broker with hand-written payloads and read its raw replies.
    #[tokio::test]
    async fn test_read_file_wire_exchange() {
        let (host, view) = duplex(8);
        let (host_tx, host_rx) = host.split();
        let (view_tx, mut view_rx) = view.split();
        let view_id = bridge_types::ViewInstanceId::new();
        let broker = bridge_host::MessageBroker::new(
            view_id,
            Arc::new(host_tx),
            Arc::new(scripted_router()),
            bridge_host::ReadinessSignal::new(view_id),
            Arc::new(RecordingNotifier::new()),
        );
        let host_task = tokio::spawn(async move { broker.run(host_rx).await });

        view_tx
            .post(json!({
                "id": "3",
                "target": "filesystem",
                "command": "readFile",
                "parameters": ["/a/b.txt"],
            }))
            .await
            .unwrap();
        assert_eq!(
            view_rx.recv().await.unwrap(),
            json!({"id": "3", "result": "file contents"})
        );

        let failing = json!({
            "id": "4",
            "target": "filesystem",
            "command": "readFile",
            "parameters": ["/missing"],
        });
        view_tx.post(failing.clone()).await.unwrap();
        let reply = view_rx.recv().await.unwrap();
        assert_eq!(reply["id"], "4");
        assert!(reply.get("result").is_none());
        assert_eq!(
            reply["error"],
            format!(
                "processing message failed: no such file: /missing; received message is '{}'.",
                failing
            )
        );

        drop(view_tx);
        host_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_request_without_id_answered_with_sentinel() {
        let (host, view) = duplex(8);
        let (host_tx, host_rx) = host.split();
        let (view_tx, mut view_rx) = view.split();
        let view_id = bridge_types::ViewInstanceId::new();
        let broker = bridge_host::MessageBroker::new(
            view_id,
            Arc::new(host_tx),
            Arc::new(scripted_router()),
            bridge_host::ReadinessSignal::new(view_id),
            Arc::new(RecordingNotifier::new()),
        );
        let host_task = tokio::spawn(async move { broker.run(host_rx).await });

        view_tx
            .post(json!({
                "target": "filesystem",
                "command": "readFile",
                "parameters": ["/a/b.txt"],
            }))
            .await
            .unwrap();
        let reply = view_rx.recv().await.unwrap();
        assert_eq!(reply["id"], "noIdProvided");
        assert_eq!(reply["result"], "file contents");
        assert!(reply["error"].as_str().unwrap().contains("message has no id"));

        drop(view_tx);
        host_task.await.unwrap();
    }

    // =========================================================================
    // PUSHES
    // =========================================================================

    #[tokio::test]
    async fn test_navigate_to_push_runs_view_handler() {
        let visited = Arc::new(Mutex::new(Vec::new()));
        let arrived = Arc::new(Notify::new());
        let mut commands = CommandRegistry::new();
        commands
            .on_navigate_to({
                let visited = visited.clone();
                let arrived = arrived.clone();
                move |location| {
                    visited.lock().push(location);
                    arrived.notify_one();
                }
            })
            .unwrap();
        let bridge = Bridge::connect(&HostConfig::default(), commands);

        bridge.broker.navigate_to("/x/y").await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), arrived.notified())
            .await
            .unwrap();

        assert_eq!(*visited.lock(), vec!["/x/y".to_string()]);
        // Pushes never register a pending call on either side
        assert_eq!(bridge.view.pending().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_push_is_ignored_and_view_keeps_working() {
        let visited = Arc::new(Mutex::new(Vec::<String>::new()));
        let mut commands = CommandRegistry::new();
        commands
            .on_navigate_to({
                let visited = visited.clone();
                move |location| visited.lock().push(location)
            })
            .unwrap();
        let bridge = Bridge::connect(&HostConfig::default(), commands);

        bridge.broker.push_command("navigate-to", vec![json!(42)]).await.unwrap();
        bridge.broker.push_command("zoom", vec![]).await.unwrap();

        // The view still answers calls after rejecting both pushes
        let name = bridge
            .view
            .call(Target::Environment, "getEnvironmentName", vec![])
            .await
            .unwrap();
        assert_eq!(name, json!("headless"));
        assert!(visited.lock().is_empty());
    }

    #[tokio::test]
    async fn test_call_fails_when_host_is_gone() {
        let (host, view) = duplex(4);
        let (view_tx, _view_rx) = view.split();
        drop(host);
        let dispatcher = bridge_view::ViewDispatcher::new(Arc::new(view_tx), CommandRegistry::new());

        let err = dispatcher
            .call(Target::FileSystem, "readFile", vec![json!("/a")])
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::Channel(_)));
    }
}
