mod host;

pub use host::SimulatedHost;

use serde::Deserialize;

use remote_debug_dispatch::connection::AttachTarget;

/// One line of input to the simulated host. An empty `uri` means the local
/// context.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostEvent {
    /// Replace the set of remote connections
    Connections { uris: Vec<String> },
    /// Publish a target inventory on a connection
    Targets {
        #[serde(default)]
        uri: String,
        targets: Vec<AttachTarget>,
    },
    /// Publish an attach command on a connection
    Command {
        #[serde(default)]
        uri: String,
        target: AttachTarget,
    },
    /// Break both signals of a connection
    Fail {
        #[serde(default)]
        uri: String,
    },
    /// The user stopped the running debug session
    EndSession,
    /// The user closed the duplicate-targets warning
    Dismiss,
    /// The user clicked "Ignore" on the duplicate-targets warning
    Ignore,
    /// Pause the script, e.g. to let the startup delay pass
    Wait { ms: u64 },
    Quit,
}
