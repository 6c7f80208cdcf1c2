//! # Panel Bridge Host
//!
//! Serves one view over the configured transport.
//!
//! - `stdio`: the view runs in another process and exchanges JSON lines on
//!   this process's stdin/stdout. Logs go to stderr.
//! - `memory`: an embedded loopback view greets, queries the host and hangs
//!   up. Handy for checking a configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use bridge_channel::stdio;
use bridge_host::LogNotifier;
use bridge_runtime::loopback::run_loopback;
use bridge_runtime::{BridgeRuntime, RuntimeConfig, Transport};
use bridge_telemetry::{init_telemetry, TelemetryConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry = init_telemetry(&TelemetryConfig::for_side("host"))
        .context("Failed to initialize telemetry")?;

    let config = RuntimeConfig::from_env().context("Failed to load configuration")?;
    info!(
        transport = ?config.transport,
        handshake_timeout_ms = config.host.handshake.timeout.as_millis() as u64,
        "Starting panel bridge host"
    );

    match config.transport {
        Transport::Stdio => serve_stdio(config).await,
        Transport::Memory => {
            let report = run_loopback(config, Arc::new(LogNotifier))
                .await
                .context("Loopback run failed")?;
            info!(
                environment = %report.environment_name,
                workspace_folder = ?report.workspace_folder,
                visited = ?report.visited,
                "Loopback check passed"
            );
            Ok(())
        }
    }
}

async fn serve_stdio(config: RuntimeConfig) -> Result<()> {
    let (outbound, inbound) = stdio();
    let runtime = Arc::new(
        BridgeRuntime::new(config, Arc::new(outbound), Arc::new(LogNotifier))
            .context("Failed to build runtime")?,
    );

    let mut serving = tokio::spawn({
        let runtime = Arc::clone(&runtime);
        async move { runtime.serve(inbound).await }
    });

    info!("Host is running. Press Ctrl+C to stop.");
    tokio::select! {
        served = &mut serving => {
            served.context("Runtime task failed")??;
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl+C")?;
            runtime.shutdown();
            serving.await.context("Runtime task failed")??;
        }
    }

    info!("Shutdown complete");
    Ok(())
}
