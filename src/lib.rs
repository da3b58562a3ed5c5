//! Attach debugger sessions automatically when remote hosts ask for them.
//!
//! The dispatcher watches every connection the host knows about, warns about
//! duplicate attach targets and turns remote attach commands into at most one
//! local debug session.

pub mod actions;
pub mod config;
pub mod connection;
pub mod debounce;
pub mod descriptor;
pub mod dispatcher;
pub mod duplicates;
pub mod error;
pub mod gate;
pub mod host;
pub mod notification;

pub use config::DispatcherConfig;
pub use dispatcher::{start_dispatcher, Dependencies, DispatcherHandle};
pub use error::{BuildError, DispatchError, RegistryError, RemoteError};
