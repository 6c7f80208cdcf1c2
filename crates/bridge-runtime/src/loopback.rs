//! In-process loopback view.
//!
//! Runs a headless view against the host over an in-memory channel: it
//! greets, asks the host for a few facts, and hangs up. Used by the
//! `memory` transport to check a host setup end to end.

use bridge_channel::duplex;
use bridge_host::SharedNotifier;
use bridge_view::{CallError, CommandRegistry, RemoteEnvironment, RemoteFileSystem, ViewDispatcher};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, warn};

use crate::{BridgeRuntime, RuntimeConfig, RuntimeError};

/// What the loopback view learned from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopbackReport {
    pub environment_name: String,
    /// `None` when the host has no workspace folder
    pub workspace_folder: Option<String>,
    /// Locations the host pushed while the view was connected
    pub visited: Vec<String>,
}

/// Serve one loopback view and report what it saw.
pub async fn run_loopback(
    config: RuntimeConfig,
    notifier: SharedNotifier,
) -> Result<LoopbackReport, RuntimeError> {
    let (host, view) = duplex(config.channel_capacity);
    let (host_tx, host_rx) = host.split();
    let (view_tx, view_rx) = view.split();

    let view_config = config.view.clone();
    let runtime = Arc::new(BridgeRuntime::new(config, Arc::new(host_tx), notifier)?);
    let serving = tokio::spawn({
        let runtime = Arc::clone(&runtime);
        async move { runtime.serve(host_rx).await }
    });

    let visited = Arc::new(Mutex::new(Vec::new()));
    let mut commands = CommandRegistry::new();
    commands
        .on_navigate_to({
            let visited = Arc::clone(&visited);
            move |location| {
                info!(location = %location, "Loopback view navigating");
                visited.lock().push(location);
            }
        })
        .map_err(|e| RuntimeError::Loopback(e.to_string()))?;

    let dispatcher = ViewDispatcher::new(Arc::new(view_tx), commands);
    let listener = tokio::spawn({
        let dispatcher = dispatcher.clone();
        async move { dispatcher.run(view_rx).await }
    });

    let report = exercise_host(&dispatcher, &view_config.greeting).await;

    // Hanging up closes the host's inbound channel, which ends `serve`
    listener.abort();
    let _ = listener.await;
    drop(dispatcher);
    serving
        .await
        .map_err(|e| RuntimeError::Join(e.to_string()))??;

    let (environment_name, workspace_folder) =
        report.map_err(|e| RuntimeError::Loopback(format!("call failed: {}", e)))?;

    let visited = std::mem::take(&mut *visited.lock());
    Ok(LoopbackReport {
        environment_name,
        workspace_folder,
        visited,
    })
}

async fn exercise_host(
    dispatcher: &ViewDispatcher,
    greeting: &str,
) -> Result<(String, Option<String>), CallError> {
    dispatcher.greet(greeting).await?;

    let environment = RemoteEnvironment::new(dispatcher.clone());
    let filesystem = RemoteFileSystem::new(dispatcher.clone());

    let environment_name = environment.get_environment_name().await?;
    let workspace_folder = match filesystem.get_workspace_folder_path().await {
        Ok(folder) => Some(folder),
        Err(CallError::Remote { message, .. }) => {
            warn!(error = %message, "Host has no workspace folder");
            None
        }
        Err(e) => return Err(e),
    };

    info!(
        environment = %environment_name,
        workspace_folder = ?workspace_folder,
        "Loopback view finished"
    );
    Ok((environment_name, workspace_folder))
}
