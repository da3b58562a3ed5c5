//! Capabilities the dispatcher borrows from the host tool.

use async_trait::async_trait;
use serde_json::Value;

use crate::descriptor::{AdapterType, DebugMode, SessionDescriptor};
use crate::notification::NotificationResponder;

/// The debug session the host is currently running
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSession {
    pub provider_name: String,
    pub mode: DebugMode,
    pub adapter_type: AdapterType,
    pub config: Value,
}

impl ActiveSession {
    /// Session as seen right after the host starts `descriptor`
    pub fn from_descriptor(
        provider_name: impl Into<String>,
        descriptor: &SessionDescriptor,
    ) -> Self {
        Self {
            provider_name: provider_name.into(),
            mode: descriptor.mode,
            adapter_type: descriptor.adapter_type,
            config: descriptor.config.clone(),
        }
    }

    pub fn port(&self) -> Option<u64> {
        self.config.get("port").and_then(Value::as_u64)
    }
}

/// The host's single debug-session slot
#[async_trait]
pub trait SessionHost: Send + Sync {
    /// Fresh snapshot of the running session, if any
    async fn active_session(&self) -> Option<ActiveSession>;

    /// Hand a descriptor over to the host to start
    fn start_session(&self, descriptor: SessionDescriptor);
}

/// User-facing warnings
pub trait NotificationSurface: Send + Sync {
    /// Show the duplicate attach target warning for `ids` (already sorted).
    /// The host reports dismissal or "Ignore" through `responder`.
    fn show_duplicate_targets_warning(&self, ids: &[String], responder: NotificationResponder);

    fn show_conflict_warning(&self, message: &str);
}

pub trait MetricsSink: Send + Sync {
    fn record_event(&self, name: &str);
}
