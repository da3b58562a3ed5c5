//! The remote debug command dispatcher.
//!
//! One task owns all state and reacts to one event at a time: connection
//! appearances, target inventories, attach commands, the debounce deadline,
//! user responses to warnings and shutdown.

mod fan_in;
mod startup;

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

use crate::actions::Action;
use crate::config::DispatcherConfig;
use crate::connection::{
    observe_contexts, ConnectionRegistry, RemoteDebugCommand, ServiceResolver,
};
use crate::debounce::Debouncer;
use crate::descriptor::DescriptorBuilder;
use crate::duplicates::find_duplicate_target_ids;
use crate::error::DispatchError;
use crate::gate::SessionGate;
use crate::host::{MetricsSink, NotificationSurface, SessionHost};
use crate::notification::{DuplicateTargetsNotifier, NotificationResponder};

use fan_in::Subscriptions;
use startup::wait_for_startup;

/// Host capabilities the dispatcher runs against
#[derive(Clone)]
pub struct Dependencies {
    pub registry: Arc<dyn ConnectionRegistry>,
    pub services: Arc<dyn ServiceResolver>,
    pub host: Arc<dyn SessionHost>,
    pub notifications: Arc<dyn NotificationSurface>,
    pub metrics: Arc<dyn MetricsSink>,
    pub descriptors: Arc<dyn DescriptorBuilder>,
}

/// Running dispatcher. Dropping it stops the dispatcher too.
pub struct DispatcherHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<Result<(), DispatchError>>,
}

impl DispatcherHandle {
    /// Stop all subscriptions and timers. Once this returns no further
    /// session start or notification is issued.
    pub async fn dispose(self) -> Result<(), DispatchError> {
        let mut this = self;
        let _ = this.shutdown.send(true);
        this.task.abort();
        finish(&mut this.task).await
    }

    /// Wait for the dispatcher to stop on its own (registry failure)
    pub async fn wait(self) -> Result<(), DispatchError> {
        let mut this = self;
        finish(&mut this.task).await
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for DispatcherHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
        self.task.abort();
    }
}

async fn finish(task: &mut JoinHandle<Result<(), DispatchError>>) -> Result<(), DispatchError> {
    match task.await {
        Ok(result) => result,
        Err(err) if err.is_cancelled() => Ok(()),
        Err(err) => Err(DispatchError::Task(err.to_string())),
    }
}

/// Start listening for remote debug signals. Must be called inside a tokio
/// runtime.
pub fn start_dispatcher(deps: Dependencies, config: DispatcherConfig) -> DispatcherHandle {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let dispatcher = Dispatcher::new(deps, config, shutdown_rx);
    DispatcherHandle {
        shutdown: shutdown_tx,
        task: tokio::spawn(dispatcher.run()),
    }
}

struct Dispatcher {
    deps: Dependencies,
    config: DispatcherConfig,
    shutdown: watch::Receiver<bool>,
    gate: SessionGate,
    notifier: DuplicateTargetsNotifier,
}

impl Dispatcher {
    fn new(deps: Dependencies, config: DispatcherConfig, shutdown: watch::Receiver<bool>) -> Self {
        let gate = SessionGate::new(
            config.provider_name.clone(),
            Arc::clone(&deps.host),
            Arc::clone(&deps.notifications),
            Arc::clone(&deps.metrics),
            Arc::clone(&deps.descriptors),
            shutdown.clone(),
        );

        Self {
            deps,
            config,
            shutdown,
            gate,
            notifier: DuplicateTargetsNotifier::new(),
        }
    }

    async fn run(mut self) -> Result<(), DispatchError> {
        if !wait_for_startup(self.config.startup_delay(), &mut self.shutdown).await {
            debug!("Dispatcher stopped before startup delay elapsed");
            return Ok(());
        }
        info!("Listening for remote debug commands");

        let mut contexts = observe_contexts(self.deps.registry.as_ref());
        let mut registry_open = true;
        let mut subscriptions = Subscriptions::new(self.config.quiet_signal_errors);
        let mut debouncer: Debouncer<RemoteDebugCommand> =
            Debouncer::new(self.config.debounce_window());
        let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();

        loop {
            let deadline = debouncer.deadline();

            tokio::select! {
                biased;

                _ = self.shutdown.changed() => break,

                next = contexts.next(), if registry_open => match next {
                    Some(Ok(context)) => {
                        debug!(%context, "Subscribing to debugger signals");
                        subscriptions.add(context, self.deps.services.as_ref());
                        debug!(live = subscriptions.len(), "Connection contexts");
                    }
                    Some(Err(err)) => return Err(err.into()),
                    None => registry_open = false,
                },

                Some(action) = action_rx.recv() => self.notifier.handle(action),

                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some(command) = debouncer.take_due(Instant::now()) {
                        let outcome = self.gate.dispatch(&command).await;
                        debug!(
                            context = %command.context,
                            ?outcome,
                            "Remote debug command handled"
                        );
                    }
                }

                Some((_, targets)) = subscriptions.inventories.next() => {
                    let duplicates = find_duplicate_target_ids(&targets);
                    self.offer_duplicates(duplicates, &action_tx);
                }

                Some((_, command)) = subscriptions.commands.next() => debouncer.push(command),
            }
        }

        debug!("Dispatcher stopped");
        Ok(())
    }

    fn offer_duplicates(
        &mut self,
        duplicates: BTreeSet<String>,
        actions: &mpsc::UnboundedSender<Action>,
    ) {
        if *self.shutdown.borrow() {
            return;
        }
        let Some(id) = self.notifier.offer(&duplicates) else {
            return;
        };

        let ids: Vec<String> = duplicates.into_iter().collect();
        debug!(?ids, "Duplicate attach targets");
        self.deps
            .notifications
            .show_duplicate_targets_warning(&ids, NotificationResponder::new(id, actions.clone()));
    }
}
