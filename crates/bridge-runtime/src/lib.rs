//! # Bridge Runtime
//!
//! Wires a [`MessageBroker`] to a transport and drives it.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (defaults, then `BRIDGE_*` variables)
//! 2. Build the local capability tables
//! 3. Start the broker on the inbound half of the channel
//! 4. Arm the handshake timer and wait for the greeting (or the timeout)
//! 5. Push the initial location, if one is configured
//! 6. Serve until the channel closes or shutdown is requested

#![warn(clippy::all)]
#![deny(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config;
pub mod loopback;

pub use config::{RuntimeConfig, RuntimeConfigError, Transport};

use bridge_channel::{ChannelReceiver, SharedSender};
use bridge_host::{
    CapabilityRouter, MessageBroker, Readiness, ReadinessSignal, RegistrationError, SharedNotifier,
};
use bridge_types::ViewInstanceId;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] RuntimeConfigError),

    #[error("capability registration failed: {0}")]
    Registration(#[from] RegistrationError),

    #[error("broker task failed: {0}")]
    Join(String),

    #[error("loopback view failed: {0}")]
    Loopback(String),
}

/// Host runtime for one view instance.
pub struct BridgeRuntime {
    config: RuntimeConfig,
    broker: MessageBroker,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl BridgeRuntime {
    /// Build the runtime around `outbound`, the sending half towards the view.
    pub fn new(
        config: RuntimeConfig,
        outbound: SharedSender,
        notifier: SharedNotifier,
    ) -> Result<Self, RuntimeError> {
        config.validate()?;

        let view_id = ViewInstanceId::new();
        let capabilities = CapabilityRouter::local(&config.host, Arc::clone(&notifier))?;
        let broker = MessageBroker::new(
            view_id,
            outbound,
            Arc::new(capabilities),
            ReadinessSignal::new(view_id),
            notifier,
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(view_id = %view_id, transport = ?config.transport, "Created bridge runtime");

        Ok(Self {
            config,
            broker,
            shutdown_tx,
            shutdown_rx,
        })
    }

    pub fn broker(&self) -> &MessageBroker {
        &self.broker
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Serve `inbound` until the channel closes or [`shutdown`] is called.
    ///
    /// [`shutdown`]: BridgeRuntime::shutdown
    pub async fn serve<R>(&self, inbound: R) -> Result<(), RuntimeError>
    where
        R: ChannelReceiver + 'static,
    {
        let broker = self.broker.clone();
        let mut listener = tokio::spawn(async move { broker.run(inbound).await });

        self.broker
            .arm_handshake(self.config.host.handshake.timeout);
        let readiness = self.broker.readiness().clone();
        let ready = readiness.wait();
        tokio::pin!(ready);

        let mut shutdown = self.shutdown_rx.clone();
        let mut waiting_for_view = true;

        loop {
            tokio::select! {
                outcome = &mut ready, if waiting_for_view => {
                    waiting_for_view = false;
                    self.on_ready(outcome).await;
                }
                finished = &mut listener => {
                    finished.map_err(|e| RuntimeError::Join(e.to_string()))?;
                    info!("View channel closed");
                    break;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Shutdown requested, stopping broker");
                        listener.abort();
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    /// Ask [`serve`](BridgeRuntime::serve) to stop.
    pub fn shutdown(&self) {
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }
    }

    async fn on_ready(&self, readiness: Readiness) {
        match readiness {
            Readiness::Greeted => info!(view_id = %self.broker.view_id(), "View is ready"),
            Readiness::TimedOut => {
                warn!(view_id = %self.broker.view_id(), "Proceeding without the view's greeting")
            }
        }

        if let Some(location) = &self.config.initial_location {
            if let Err(e) = self.broker.navigate_to(location).await {
                warn!(location = %location, error = %e, "Failed to push initial location");
            }
        }
    }
}
