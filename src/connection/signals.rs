use std::sync::{Arc, Mutex};

use futures::future;
use futures::stream::StreamExt;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

use super::{
    AttachTarget, ConnectionContext, RemoteDebugCommandRequest, ServiceResolver, SignalStream,
};
use crate::error::RemoteError;

const SIGNAL_BUFFER: usize = 64;

type Opener<T> = Box<dyn FnOnce() -> SignalStream<T> + Send>;

/// One remote signal shared by every local subscriber.
///
/// The remote source is opened on the first `subscribe` and pumped into a
/// broadcast channel; later subscribers join the live sequence instead of
/// opening a second remote channel. Dropping the signal stops the pump.
pub struct SharedSignal<T: Clone + Send + 'static> {
    name: &'static str,
    opener: Mutex<Option<Opener<T>>>,
    template: broadcast::Receiver<Result<T, RemoteError>>,
    sender: Mutex<Option<broadcast::Sender<Result<T, RemoteError>>>>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Clone + Send + 'static> SharedSignal<T> {
    pub fn new(
        name: &'static str,
        open: impl FnOnce() -> SignalStream<T> + Send + 'static,
    ) -> Self {
        let (sender, template) = broadcast::channel(SIGNAL_BUFFER);
        Self {
            name,
            opener: Mutex::new(Some(Box::new(open))),
            template,
            sender: Mutex::new(Some(sender)),
            pump: Mutex::new(None),
        }
    }

    /// Join the live sequence, opening the remote source if nobody has yet.
    ///
    /// The returned stream ends after the source ends or fails.
    pub fn subscribe(&self) -> SignalStream<T> {
        let receiver = self.template.resubscribe();
        self.start_pump();

        let name = self.name;
        BroadcastStream::new(receiver)
            .filter_map(move |item| {
                future::ready(match item {
                    Ok(item) => Some(item),
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        warn!(signal = name, skipped, "Subscriber fell behind remote signal");
                        None
                    }
                })
            })
            .boxed()
    }

    fn start_pump(&self) {
        let opener = match self.opener.lock() {
            Ok(mut opener) => opener.take(),
            Err(_) => return,
        };
        let Some(open) = opener else {
            return;
        };
        // The pump owns the only sender so subscribers see the end of the source.
        let Some(sender) = self.sender.lock().ok().and_then(|mut s| s.take()) else {
            return;
        };

        let mut source = open();
        let name = self.name;
        let handle = tokio::spawn(async move {
            while let Some(item) = source.next().await {
                let failed = item.is_err();
                if sender.send(item).is_err() {
                    // Only happens once every receiver is gone.
                    break;
                }
                if failed {
                    break;
                }
            }
            debug!(signal = name, "Remote signal ended");
        });

        if let Ok(mut pump) = self.pump.lock() {
            *pump = Some(handle);
        }
    }
}

impl<T: Clone + Send + 'static> Drop for SharedSignal<T> {
    fn drop(&mut self) {
        if let Ok(mut pump) = self.pump.lock() {
            if let Some(handle) = pump.take() {
                handle.abort();
            }
        }
    }
}

/// The two remote signals of a single connection context
pub struct ConnectionSignals {
    pub context: ConnectionContext,
    pub targets: SharedSignal<Vec<AttachTarget>>,
    pub commands: SharedSignal<RemoteDebugCommandRequest>,
}

impl ConnectionSignals {
    /// Resolve the context's debugger service and wrap both of its signals.
    /// Nothing is opened remotely until someone subscribes.
    pub fn open(context: ConnectionContext, resolver: &dyn ServiceResolver) -> Self {
        let service = resolver.service_for(context.root_uri());
        let targets_service = Arc::clone(&service);

        Self {
            context,
            targets: SharedSignal::new("attach-targets", move || {
                targets_service.observe_attach_targets()
            }),
            commands: SharedSignal::new("debug-commands", move || service.observe_debug_commands()),
        }
    }
}
