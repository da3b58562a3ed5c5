use std::collections::HashMap;

use futures::future;
use futures::stream::{BoxStream, StreamExt};
use tokio_stream::StreamMap;
use tracing::error;

use crate::connection::{
    AttachTarget, ConnectionContext, ConnectionSignals, RemoteDebugCommand, ServiceResolver,
    SignalStream,
};

/// Which of a connection's two signals failed
#[derive(Debug, Clone, Copy)]
pub(crate) enum SignalKind {
    AttachTargets,
    DebugCommands,
}

/// End a connection's signal quietly at its first failure.
///
/// The failure is logged unless `quiet` is set; other connections are
/// unaffected because each one is isolated on its own.
pub(crate) fn isolate<T: Send + 'static>(
    signal: SignalStream<T>,
    context: ConnectionContext,
    kind: SignalKind,
    quiet: bool,
) -> BoxStream<'static, T> {
    signal
        .scan((), move |_, item| {
            future::ready(match item {
                Ok(item) => Some(item),
                Err(err) => {
                    if !quiet {
                        report_failure(&context, kind, &err);
                    }
                    None
                }
            })
        })
        .boxed()
}

fn report_failure(context: &ConnectionContext, kind: SignalKind, err: &dyn std::error::Error) {
    match kind {
        SignalKind::DebugCommands => error!(
            context = %context,
            is_local = context.is_local(),
            error = %err,
            "Failed to listen to remote debug commands - \
             you could be running locally with two windows"
        ),
        SignalKind::AttachTargets => error!(
            context = %context,
            is_local = context.is_local(),
            error = %err,
            "Failed to listen to remote attach targets"
        ),
    }
}

/// Live subscriptions of every context seen so far.
///
/// Each appearance gets its own key. A connection that comes back replaces
/// whatever is left of its earlier subscription, so its signals are never
/// merged twice. Streams that end are dropped by the maps; their signals are
/// swept on the next appearance.
pub(crate) struct Subscriptions {
    quiet: bool,
    next_key: u64,
    signals: HashMap<u64, ConnectionSignals>,
    pub(crate) inventories: StreamMap<u64, BoxStream<'static, Vec<AttachTarget>>>,
    pub(crate) commands: StreamMap<u64, BoxStream<'static, RemoteDebugCommand>>,
}

impl Subscriptions {
    pub(crate) fn new(quiet: bool) -> Self {
        Self {
            quiet,
            next_key: 0,
            signals: HashMap::new(),
            inventories: StreamMap::new(),
            commands: StreamMap::new(),
        }
    }

    pub(crate) fn add(&mut self, context: ConnectionContext, resolver: &dyn ServiceResolver) {
        self.sweep();
        self.remove_context(&context);

        let key = self.next_key;
        self.next_key += 1;

        let signals = ConnectionSignals::open(context.clone(), resolver);

        let inventory = isolate(
            signals.targets.subscribe(),
            context.clone(),
            SignalKind::AttachTargets,
            self.quiet,
        );

        let tag = context.clone();
        let commands = isolate(
            signals.commands.subscribe(),
            context,
            SignalKind::DebugCommands,
            self.quiet,
        )
        .map(move |request| RemoteDebugCommand {
            context: tag.clone(),
            target: request.target,
        })
        .boxed();

        self.inventories.insert(key, inventory);
        self.commands.insert(key, commands);
        self.signals.insert(key, signals);
    }

    pub(crate) fn len(&self) -> usize {
        self.signals.len()
    }

    fn remove_context(&mut self, context: &ConnectionContext) {
        let stale: Vec<u64> = self
            .signals
            .iter()
            .filter(|(_, signals)| signals.context == *context)
            .map(|(key, _)| *key)
            .collect();

        for key in stale {
            self.inventories.remove(&key);
            self.commands.remove(&key);
            self.signals.remove(&key);
        }
    }

    fn sweep(&mut self) {
        let inventories = &self.inventories;
        let commands = &self.commands;
        self.signals
            .retain(|key, _| inventories.contains_key(key) || commands.contains_key(key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{RemoteDebugCommandRequest, RemoteDebuggerService};
    use crate::error::RemoteError;
    use async_trait::async_trait;
    use futures::{stream, FutureExt};
    use std::sync::Arc;
    use tokio::sync::broadcast;
    use tokio_stream::wrappers::BroadcastStream;

    /// Service whose command signal stays open until the sender goes away
    struct LiveService {
        commands: broadcast::Sender<RemoteDebugCommandRequest>,
    }

    #[async_trait]
    impl RemoteDebuggerService for LiveService {
        fn observe_attach_targets(&self) -> SignalStream<Vec<AttachTarget>> {
            stream::pending().boxed()
        }

        fn observe_debug_commands(&self) -> SignalStream<RemoteDebugCommandRequest> {
            BroadcastStream::new(self.commands.subscribe())
                .filter_map(|item| future::ready(item.ok().map(Ok)))
                .boxed()
        }

        async fn python_adapter_path(&self) -> Result<String, RemoteError> {
            Ok("/adapter.js".to_string())
        }

        async fn node_adapter_path(&self) -> Result<String, RemoteError> {
            Ok("/adapter.js".to_string())
        }
    }

    impl ServiceResolver for Arc<LiveService> {
        fn service_for(&self, _root_uri: &str) -> Arc<dyn RemoteDebuggerService> {
            self.clone()
        }
    }

    fn remote() -> ConnectionContext {
        ConnectionContext::Remote(crate::connection::Connection::for_host("a"))
    }

    #[tokio::test]
    async fn test_isolate_stops_at_first_failure() {
        let signal = stream::iter(vec![
            Ok(1),
            Ok(2),
            Err(RemoteError::Signal("lost".to_string())),
            Ok(3),
        ])
        .boxed();
        let items: Vec<_> = isolate(signal, remote(), SignalKind::DebugCommands, true)
            .collect()
            .await;
        assert_eq!(items, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_failed_connection_does_not_stop_others() {
        let mut merged: StreamMap<&str, BoxStream<'static, u32>> = StreamMap::new();
        merged.insert(
            "a",
            isolate(
                stream::iter(vec![Err(RemoteError::Signal("lost".to_string()))]).boxed(),
                remote(),
                SignalKind::DebugCommands,
                true,
            ),
        );
        merged.insert(
            "b",
            isolate(
                stream::iter(vec![Ok(10), Ok(11)]).boxed(),
                ConnectionContext::Local,
                SignalKind::DebugCommands,
                true,
            ),
        );

        let items: Vec<_> = merged.collect().await;
        assert_eq!(items, vec![("b", 10), ("b", 11)]);
    }

    #[tokio::test]
    async fn test_reappearing_context_replaces_live_subscription() {
        let service = Arc::new(LiveService {
            commands: broadcast::channel(16).0,
        });
        let mut subscriptions = Subscriptions::new(true);

        subscriptions.add(remote(), &service);
        subscriptions.add(ConnectionContext::Local, &service);
        subscriptions.add(remote(), &service);
        assert_eq!(subscriptions.len(), 2);
        assert_eq!(subscriptions.commands.len(), 2);

        service
            .commands
            .send(RemoteDebugCommandRequest {
                target: AttachTarget::new(5000),
            })
            .unwrap();

        let mut seen = Vec::new();
        for _ in 0..2 {
            let (_, command) = subscriptions.commands.next().await.unwrap();
            seen.push(command.context);
        }
        seen.sort_by_key(|context| context.is_local());
        assert_eq!(seen, vec![remote(), ConnectionContext::Local]);

        tokio::task::yield_now().await;
        assert!(subscriptions.commands.next().now_or_never().is_none());
    }
}
