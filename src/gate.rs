use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::connection::{AttachTarget, RemoteDebugCommand};
use crate::descriptor::{AdapterType, DebugMode, DescriptorBuilder};
use crate::host::{ActiveSession, MetricsSink, NotificationSurface, SessionHost};

pub const AUTO_ATTACH_EVENT: &str = "remote-debugger-auto-attach";

pub const OPEN_SESSION_MESSAGE: &str =
    "Received a remote debug request, but there's an open debug session already! \
     To be able to remote debug, please terminate your existing session.";

pub const START_FAILED_MESSAGE: &str =
    "Received a remote debug request, but the debugger could not be started for it.";

/// What to do with an attach command given the host's current session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Nothing is running; attach
    Start,
    /// Already attached to that target
    Ignore,
    /// Something else is running; tell the user
    Conflict,
}

/// Result of running one command through the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Started,
    Ignored,
    Conflict,
    StartFailed,
    /// The dispatcher was shutting down
    Cancelled,
}

/// Pure decision for one command.
///
/// Remote commands always ask for a Python attach, so a session from our own
/// provider only counts as "the same" when it is a Python attach on the same
/// port. Host and roots are not compared.
pub fn decide(
    active: Option<&ActiveSession>,
    target: &AttachTarget,
    own_provider: &str,
) -> GateDecision {
    let Some(active) = active else {
        return GateDecision::Start;
    };

    if active.provider_name != own_provider {
        return GateDecision::Conflict;
    }

    if active.mode != DebugMode::Attach
        || active.adapter_type != AdapterType::Python
        || active.port() != Some(u64::from(target.port))
    {
        return GateDecision::Conflict;
    }

    GateDecision::Ignore
}

/// Applies gate decisions against the host
pub struct SessionGate {
    provider_name: String,
    host: Arc<dyn SessionHost>,
    notifications: Arc<dyn NotificationSurface>,
    metrics: Arc<dyn MetricsSink>,
    descriptors: Arc<dyn DescriptorBuilder>,
    shutdown: watch::Receiver<bool>,
}

impl SessionGate {
    pub fn new(
        provider_name: impl Into<String>,
        host: Arc<dyn SessionHost>,
        notifications: Arc<dyn NotificationSurface>,
        metrics: Arc<dyn MetricsSink>,
        descriptors: Arc<dyn DescriptorBuilder>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            provider_name: provider_name.into(),
            host,
            notifications,
            metrics,
            descriptors,
            shutdown,
        }
    }

    fn cancelled(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Run one debounced command through the gate.
    ///
    /// Building the descriptor suspends, so the session slot is queried again
    /// afterwards and the decision is retaken before anything is started.
    pub async fn dispatch(&self, command: &RemoteDebugCommand) -> GateOutcome {
        let active = self.host.active_session().await;
        let decision = decide(active.as_ref(), &command.target, &self.provider_name);
        debug!(
            context = %command.context,
            port = command.target.port,
            ?decision,
            "Remote debug command"
        );

        match decision {
            GateDecision::Start => {}
            GateDecision::Ignore => return GateOutcome::Ignored,
            GateDecision::Conflict => return self.report_conflict(),
        }

        let descriptor = match self
            .descriptors
            .build(
                &command.context,
                DebugMode::Attach,
                AdapterType::Python,
                &command.target,
            )
            .await
        {
            Ok(descriptor) => descriptor,
            Err(err) => {
                warn!(context = %command.context, error = %err, "Failed to build attach session");
                if self.cancelled() {
                    return GateOutcome::Cancelled;
                }
                self.notifications.show_conflict_warning(START_FAILED_MESSAGE);
                return GateOutcome::StartFailed;
            }
        };

        let active = self.host.active_session().await;
        match decide(active.as_ref(), &command.target, &self.provider_name) {
            GateDecision::Start => {
                if self.cancelled() {
                    return GateOutcome::Cancelled;
                }
                info!(
                    context = %command.context,
                    port = command.target.port,
                    "Attaching debugger to remote target"
                );
                self.metrics.record_event(AUTO_ATTACH_EVENT);
                self.host.start_session(descriptor);
                GateOutcome::Started
            }
            GateDecision::Ignore => {
                debug!("Session for this target started while building descriptor");
                GateOutcome::Ignored
            }
            GateDecision::Conflict => self.report_conflict(),
        }
    }

    fn report_conflict(&self) -> GateOutcome {
        if self.cancelled() {
            return GateOutcome::Cancelled;
        }
        self.notifications.show_conflict_warning(OPEN_SESSION_MESSAGE);
        GateOutcome::Conflict
    }
}
