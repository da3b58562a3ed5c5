use thiserror::Error;

use crate::descriptor::{AdapterType, DebugMode};

/// Failure reported by a remote debugger service.
///
/// Signals are fanned out through broadcast channels, so this has to stay
/// cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("remote service unavailable: {0}")]
    Unavailable(String),
    #[error("remote signal failed: {0}")]
    Signal(String),
}

/// The connection registry itself could not be observed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("connection registry failed: {0}")]
    Failed(String),
}

/// A session descriptor could not be assembled.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to resolve {adapter} adapter for {uri}: {source}")]
    AdapterPath {
        adapter: AdapterType,
        uri: String,
        #[source]
        source: RemoteError,
    },
    #[error("{mode} sessions are not supported by the {adapter} adapter")]
    Unsupported {
        mode: DebugMode,
        adapter: AdapterType,
    },
}

/// Errors that stop the dispatcher for good.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("dispatcher task failed: {0}")]
    Task(String),
}
