use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use futures::future;
use futures::stream::{BoxStream, StreamExt};
use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::{BroadcastStream, WatchStream};
use tracing::{info, warn};

use remote_debug_dispatch::connection::{
    AttachTarget, Connection, ConnectionRegistry, RemoteDebugCommandRequest,
    RemoteDebuggerService, ServiceResolver, SignalStream,
};
use remote_debug_dispatch::descriptor::SessionDescriptor;
use remote_debug_dispatch::host::{ActiveSession, MetricsSink, NotificationSurface, SessionHost};
use remote_debug_dispatch::notification::{format_duplicate_ids, NotificationResponder};
use remote_debug_dispatch::{RegistryError, RemoteError};

use super::HostEvent;

const SIGNAL_BUFFER: usize = 16;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn live<T: Clone + Send + 'static>(
    sender: &broadcast::Sender<Result<T, RemoteError>>,
) -> SignalStream<T> {
    BroadcastStream::new(sender.subscribe())
        .filter_map(|item| future::ready(item.ok()))
        .boxed()
}

/// Debugger service of one simulated connection
struct SimulatedService {
    root_uri: String,
    targets: broadcast::Sender<Result<Vec<AttachTarget>, RemoteError>>,
    commands: broadcast::Sender<Result<RemoteDebugCommandRequest, RemoteError>>,
}

impl SimulatedService {
    fn new(root_uri: &str) -> Self {
        Self {
            root_uri: root_uri.to_string(),
            targets: broadcast::channel(SIGNAL_BUFFER).0,
            commands: broadcast::channel(SIGNAL_BUFFER).0,
        }
    }
}

#[async_trait]
impl RemoteDebuggerService for SimulatedService {
    fn observe_attach_targets(&self) -> SignalStream<Vec<AttachTarget>> {
        live(&self.targets)
    }

    fn observe_debug_commands(&self) -> SignalStream<RemoteDebugCommandRequest> {
        live(&self.commands)
    }

    async fn python_adapter_path(&self) -> Result<String, RemoteError> {
        Ok(format!(
            "{}/adapters/python/visualstudio_py_debugger.js",
            self.root_uri.trim_end_matches('/')
        ))
    }

    async fn node_adapter_path(&self) -> Result<String, RemoteError> {
        Ok(format!("{}/adapters/node/nodeDebug.js", self.root_uri.trim_end_matches('/')))
    }
}

/// In-memory host driven by [`HostEvent`]s; reports everything through tracing.
pub struct SimulatedHost {
    provider_name: String,
    connections: watch::Sender<Vec<Connection>>,
    services: Mutex<HashMap<String, Arc<SimulatedService>>>,
    active: Mutex<Option<ActiveSession>>,
    warning: Mutex<Option<NotificationResponder>>,
}

impl SimulatedHost {
    pub fn new(provider_name: &str) -> Self {
        Self {
            provider_name: provider_name.to_string(),
            connections: watch::channel(Vec::new()).0,
            services: Mutex::new(HashMap::new()),
            active: Mutex::new(None),
            warning: Mutex::new(None),
        }
    }

    fn service(&self, root_uri: &str) -> Arc<SimulatedService> {
        let mut services = lock(&self.services);
        Arc::clone(
            services
                .entry(root_uri.to_string())
                .or_insert_with(|| Arc::new(SimulatedService::new(root_uri))),
        )
    }

    pub fn apply(&self, event: HostEvent) {
        match event {
            HostEvent::Connections { uris } => {
                let connections = uris.into_iter().map(Connection::new).collect();
                self.connections.send_replace(connections);
            }
            HostEvent::Targets { uri, targets } => {
                let _ = self.service(&uri).targets.send(Ok(targets));
            }
            HostEvent::Command { uri, target } => {
                let _ = self
                    .service(&uri)
                    .commands
                    .send(Ok(RemoteDebugCommandRequest { target }));
            }
            HostEvent::Fail { uri } => {
                let service = self.service(&uri);
                let failure = RemoteError::Signal(format!("connection to {} lost", uri));
                let _ = service.targets.send(Err(failure.clone()));
                let _ = service.commands.send(Err(failure));
            }
            HostEvent::EndSession => {
                if lock(&self.active).take().is_some() {
                    info!("Debug session ended");
                }
            }
            HostEvent::Dismiss => {
                if let Some(responder) = lock(&self.warning).take() {
                    info!(notification = responder.id().0, "Warning dismissed");
                    responder.dismissed();
                }
            }
            HostEvent::Ignore => {
                if let Some(responder) = lock(&self.warning).take() {
                    responder.ignored();
                    responder.dismissed();
                }
            }
            HostEvent::Wait { .. } | HostEvent::Quit => {}
        }
    }
}

impl ConnectionRegistry for SimulatedHost {
    fn observe_connections(&self) -> BoxStream<'static, Result<Vec<Connection>, RegistryError>> {
        WatchStream::new(self.connections.subscribe())
            .map(Ok)
            .boxed()
    }
}

impl ServiceResolver for SimulatedHost {
    fn service_for(&self, root_uri: &str) -> Arc<dyn RemoteDebuggerService> {
        self.service(root_uri)
    }
}

#[async_trait]
impl SessionHost for SimulatedHost {
    async fn active_session(&self) -> Option<ActiveSession> {
        lock(&self.active).clone()
    }

    fn start_session(&self, descriptor: SessionDescriptor) {
        info!(
            target_path = %descriptor.target_path,
            mode = %descriptor.mode,
            adapter = %descriptor.adapter_type,
            config = %descriptor.config,
            "Starting debug session"
        );
        let session = ActiveSession::from_descriptor(&self.provider_name, &descriptor);
        *lock(&self.active) = Some(session);
    }
}

impl NotificationSurface for SimulatedHost {
    fn show_duplicate_targets_warning(&self, ids: &[String], responder: NotificationResponder) {
        warn!(
            notification = responder.id().0,
            "Debugger: duplicate attach targets: `{}`",
            format_duplicate_ids(ids)
        );
        *lock(&self.warning) = Some(responder);
    }

    fn show_conflict_warning(&self, message: &str) {
        warn!("{}", message);
    }
}

impl MetricsSink for SimulatedHost {
    fn record_event(&self, name: &str) {
        info!(event = name, "Metric recorded");
    }
}
