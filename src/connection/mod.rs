mod registry;
mod signals;
pub mod uri;

pub use registry::{observe_contexts, ConnectionAppearances};
pub use signals::{ConnectionSignals, SharedSignal};

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RemoteError};

/// A live remote signal: every item may carry a per-connection failure.
pub type SignalStream<T> = BoxStream<'static, Result<T, RemoteError>>;

/// A remote host the tool is connected to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Connection {
    /// URI of the remote root directory (e.g. "nuclide://devbox/")
    root_uri: String,
}

impl Connection {
    pub fn new(root_uri: impl Into<String>) -> Self {
        Self {
            root_uri: root_uri.into(),
        }
    }

    /// Connection rooted at `/` on the given host
    pub fn for_host(hostname: &str) -> Self {
        Self::new(uri::remote_root(hostname))
    }

    pub fn root_uri(&self) -> &str {
        &self.root_uri
    }
}

/// Where a signal came from: the local machine or one remote connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConnectionContext {
    Local,
    Remote(Connection),
}

impl ConnectionContext {
    /// Root URI used to look up services; empty for the local context
    pub fn root_uri(&self) -> &str {
        match self {
            ConnectionContext::Local => "",
            ConnectionContext::Remote(connection) => connection.root_uri(),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, ConnectionContext::Local)
    }
}

impl fmt::Display for ConnectionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionContext::Local => write!(f, "local"),
            ConnectionContext::Remote(connection) => write!(f, "{}", connection.root_uri()),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

/// A running process on a remote host that a debugger can attach to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachTarget {
    /// Identity used for duplicate detection; targets without one never collide
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub local_root: String,
    #[serde(default)]
    pub remote_root: String,
    #[serde(default)]
    pub debug_options: BTreeSet<String>,
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
}

impl AttachTarget {
    pub fn new(port: u16) -> Self {
        Self {
            id: None,
            local_root: String::new(),
            remote_root: String::new(),
            debug_options: BTreeSet::new(),
            port,
            host: default_host(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// An attach request as emitted by a remote host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDebugCommandRequest {
    pub target: AttachTarget,
}

/// An attach request tagged with the connection it arrived on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDebugCommand {
    pub context: ConnectionContext,
    pub target: AttachTarget,
}

/// Live set of remote connections known to the host.
pub trait ConnectionRegistry: Send + Sync {
    /// Snapshots of the full connection set, the current one first
    fn observe_connections(&self) -> BoxStream<'static, Result<Vec<Connection>, RegistryError>>;
}

/// Looks up the debugger command service for a root URI ("" is local).
pub trait ServiceResolver: Send + Sync {
    fn service_for(&self, root_uri: &str) -> Arc<dyn RemoteDebuggerService>;
}

/// Debugger command service running next to one connection.
#[async_trait]
pub trait RemoteDebuggerService: Send + Sync {
    /// Full inventory of attachable targets, re-sent on every change
    fn observe_attach_targets(&self) -> SignalStream<Vec<AttachTarget>>;

    /// Ad-hoc attach requests
    fn observe_debug_commands(&self) -> SignalStream<RemoteDebugCommandRequest>;

    async fn python_adapter_path(&self) -> Result<String, RemoteError>;

    async fn node_adapter_path(&self) -> Result<String, RemoteError>;
}
