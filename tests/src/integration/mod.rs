//! Host and view wired back to back over an in-memory channel.

pub mod filesystem;
pub mod flows;
pub mod handshake;

use bridge_channel::duplex;
use bridge_host::{
    CapabilityRouter, HostConfig, MessageBroker, ReadinessSignal, RecordingNotifier,
};
use bridge_types::ViewInstanceId;
use bridge_view::{CommandRegistry, ViewDispatcher};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// A connected host and view with both listeners running.
pub struct Bridge {
    pub broker: MessageBroker,
    pub view: ViewDispatcher,
    pub notifier: Arc<RecordingNotifier>,
    host_task: JoinHandle<()>,
    view_task: JoinHandle<()>,
}

impl Bridge {
    /// Connect a view to a host serving the local capabilities.
    pub fn connect(config: &HostConfig, commands: CommandRegistry) -> Self {
        let notifier = Arc::new(RecordingNotifier::new());
        let router = CapabilityRouter::local(config, notifier.clone())
            .expect("local capabilities register");
        Self::connect_with(router, commands, notifier)
    }

    /// Connect a view to a host serving `router`.
    pub fn connect_with(
        router: CapabilityRouter,
        commands: CommandRegistry,
        notifier: Arc<RecordingNotifier>,
    ) -> Self {
        let (host, view) = duplex(64);
        let (host_tx, host_rx) = host.split();
        let (view_tx, view_rx) = view.split();

        let view_id = ViewInstanceId::new();
        let broker = MessageBroker::new(
            view_id,
            Arc::new(host_tx),
            Arc::new(router),
            ReadinessSignal::new(view_id),
            notifier.clone(),
        );
        let view = ViewDispatcher::new(Arc::new(view_tx), commands);

        let host_task = tokio::spawn({
            let broker = broker.clone();
            async move { broker.run(host_rx).await }
        });
        let view_task = tokio::spawn({
            let view = view.clone();
            async move { view.run(view_rx).await }
        });

        Self {
            broker,
            view,
            notifier,
            host_task,
            view_task,
        }
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.host_task.abort();
        self.view_task.abort();
    }
}
