//! Session descriptors for the VS Code debug adapters the tool drives.
//!
//! A descriptor names the adapter executable and carries the adapter-specific
//! launch/attach configuration. Adapter scripts for Python and Node are
//! located through the debugger service next to the target; the node runtime
//! comes from a [`BinaryResolver`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::connection::{uri, AttachTarget, ConnectionContext, ServiceResolver};
use crate::error::{BuildError, RemoteError};

pub const REACT_NATIVE_PACKAGER_DEFAULT_PORT: u16 = 8081;

const REACT_NATIVE_LAUNCH_SCRIPT: &str = ".vscode/launchReactNative.js";
const REACT_NATIVE_ENTRY_POINT: &str = "out/debugger/reactNativeDebugEntryPoint.js";

/// Options every Python session starts with
pub static DEFAULT_DEBUG_OPTIONS: Lazy<BTreeSet<&'static str>> = Lazy::new(|| {
    ["WaitOnAbnormalExit", "WaitOnNormalExit", "RedirectOutput"]
        .into_iter()
        .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugMode {
    Launch,
    Attach,
}

impl fmt::Display for DebugMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DebugMode::Launch => write!(f, "launch"),
            DebugMode::Attach => write!(f, "attach"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdapterType {
    Python,
    Node,
    ReactNative,
}

impl fmt::Display for AdapterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterType::Python => write!(f, "python"),
            AdapterType::Node => write!(f, "node"),
            AdapterType::ReactNative => write!(f, "react-native"),
        }
    }
}

/// Command line that starts a debug adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterExecutable {
    pub command: String,
    pub args: Vec<String>,
}

/// Everything the host needs to start one debug session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDescriptor {
    pub target_path: String,
    pub mode: DebugMode,
    pub adapter_type: AdapterType,
    pub adapter_executable: AdapterExecutable,
    pub show_threads: bool,
    pub config: Value,
}

impl SessionDescriptor {
    /// Port the adapter attaches to, if the config names one
    pub fn port(&self) -> Option<u64> {
        self.config.get("port").and_then(Value::as_u64)
    }
}

/// Builds the descriptor the dispatcher starts for an attach request
#[async_trait]
pub trait DescriptorBuilder: Send + Sync {
    async fn build(
        &self,
        context: &ConnectionContext,
        mode: DebugMode,
        adapter: AdapterType,
        target: &AttachTarget,
    ) -> Result<SessionDescriptor, BuildError>;
}

/// Finds the node runtime used to run adapter scripts
#[async_trait]
pub trait BinaryResolver: Send + Sync {
    async fn node_binary_path(&self, uri: &str) -> Result<String, RemoteError>;
}

/// Uses whatever `node` is on the PATH
#[derive(Debug, Default)]
pub struct PathBinaryResolver;

#[async_trait]
impl BinaryResolver for PathBinaryResolver {
    async fn node_binary_path(&self, _uri: &str) -> Result<String, RemoteError> {
        Ok("node".to_string())
    }
}

/// Launch parameters shared by the script launchers
#[derive(Debug, Clone, Default)]
pub struct ScriptLaunch {
    pub args: Vec<String>,
    pub cwd: String,
    pub env: BTreeMap<String, String>,
}

pub struct VspDescriptorBuilder {
    services: Arc<dyn ServiceResolver>,
    binaries: Arc<dyn BinaryResolver>,
    react_native_adapter_dir: PathBuf,
}

impl VspDescriptorBuilder {
    pub fn new(
        services: Arc<dyn ServiceResolver>,
        binaries: Arc<dyn BinaryResolver>,
        react_native_adapter_dir: PathBuf,
    ) -> Self {
        Self {
            services,
            binaries,
            react_native_adapter_dir,
        }
    }

    /// Launch a Python PAR; the real main module replaces `/dev/null` at runtime
    pub async fn python_par_launch(
        &self,
        par_path: &str,
        args: Vec<String>,
    ) -> Result<SessionDescriptor, BuildError> {
        let local_par = uri::local_path(par_path);
        let config = json!({
            "stopOnEntry": false,
            "console": "none",
            "program": "/dev/null",
            "args": args,
            "debugOptions": default_debug_options(),
            "pythonPath": local_par,
            "cwd": uri::dirname(local_par),
        });

        Ok(SessionDescriptor {
            target_path: par_path.to_string(),
            mode: DebugMode::Launch,
            adapter_type: AdapterType::Python,
            adapter_executable: self.python_adapter(par_path).await?,
            show_threads: true,
            config,
        })
    }

    pub async fn python_script_launch(
        &self,
        script_path: &str,
        python_path: &str,
        launch: ScriptLaunch,
    ) -> Result<SessionDescriptor, BuildError> {
        let config = json!({
            "stopOnEntry": false,
            "console": "none",
            "program": uri::local_path(script_path),
            "cwd": launch.cwd,
            "args": launch.args,
            "env": launch.env,
            "debugOptions": default_debug_options(),
            "pythonPath": python_path,
        });

        Ok(SessionDescriptor {
            target_path: script_path.to_string(),
            mode: DebugMode::Launch,
            adapter_type: AdapterType::Python,
            adapter_executable: self.python_adapter(script_path).await?,
            show_threads: true,
            config,
        })
    }

    /// Attach to a Python process that is already listening on `target.port`.
    ///
    /// The adapter always connects over the loopback, so `target.host` is not
    /// forwarded.
    pub async fn python_attach(
        &self,
        root_uri: &str,
        target: &AttachTarget,
    ) -> Result<SessionDescriptor, BuildError> {
        let config = json!({
            "localRoot": target.local_root,
            "remoteRoot": target.remote_root,
            "port": target.port,
            "host": "127.0.0.1",
        });

        Ok(SessionDescriptor {
            target_path: root_uri.to_string(),
            mode: DebugMode::Attach,
            adapter_type: AdapterType::Python,
            adapter_executable: self.python_adapter(root_uri).await?,
            show_threads: true,
            config,
        })
    }

    pub async fn node_launch(
        &self,
        script_path: &str,
        node_path: &str,
        launch: ScriptLaunch,
        out_files: &str,
    ) -> Result<SessionDescriptor, BuildError> {
        let adapter = self.node_adapter(script_path).await?;
        let runtime = if node_path.is_empty() {
            adapter.command.clone()
        } else {
            node_path.to_string()
        };
        let out_files: Vec<&str> = if out_files.is_empty() {
            Vec::new()
        } else {
            vec![out_files]
        };

        let config = json!({
            "protocol": "inspector",
            "stopOnEntry": false,
            "program": uri::local_path(script_path),
            "runtimeExecutable": runtime,
            "cwd": launch.cwd,
            "args": launch.args,
            "env": launch.env,
            "outFiles": out_files,
        });

        Ok(SessionDescriptor {
            target_path: script_path.to_string(),
            mode: DebugMode::Launch,
            adapter_type: AdapterType::Node,
            adapter_executable: adapter,
            show_threads: false,
            config,
        })
    }

    pub async fn node_attach(
        &self,
        target_uri: &str,
        port: u16,
    ) -> Result<SessionDescriptor, BuildError> {
        Ok(SessionDescriptor {
            target_path: target_uri.to_string(),
            mode: DebugMode::Attach,
            adapter_type: AdapterType::Node,
            adapter_executable: self.node_adapter(target_uri).await?,
            show_threads: false,
            config: json!({ "port": port }),
        })
    }

    pub async fn react_native_attach(
        &self,
        workspace: &str,
        port: &str,
    ) -> Result<SessionDescriptor, BuildError> {
        self.react_native(workspace, DebugMode::Attach, port, None)
            .await
    }

    pub async fn react_native_launch(
        &self,
        workspace: &str,
        port: &str,
        platform: &str,
    ) -> Result<SessionDescriptor, BuildError> {
        self.react_native(workspace, DebugMode::Launch, port, Some(platform))
            .await
    }

    async fn react_native(
        &self,
        workspace: &str,
        mode: DebugMode,
        port: &str,
        platform: Option<&str>,
    ) -> Result<SessionDescriptor, BuildError> {
        let script_uri = uri::join(workspace, REACT_NATIVE_LAUNCH_SCRIPT);
        let script_path = uri::local_path(&script_uri).to_string();
        let adapter_path = self.react_native_adapter_dir.join(REACT_NATIVE_ENTRY_POINT);

        let mut config = json!({
            "protocol": "inspector",
            "stopOnEntry": false,
            "program": script_path,
            "port": port,
        });
        if let Some(platform) = platform {
            config["platform"] = json!(platform);
        }

        Ok(SessionDescriptor {
            target_path: script_path.clone(),
            mode,
            adapter_type: AdapterType::ReactNative,
            adapter_executable: AdapterExecutable {
                command: self.node_binary(&script_path).await,
                args: vec![adapter_path.to_string_lossy().to_string()],
            },
            show_threads: false,
            config,
        })
    }

    async fn python_adapter(&self, target_uri: &str) -> Result<AdapterExecutable, BuildError> {
        let service = self.services.service_for(&uri::root_of(target_uri));
        let (adapter_path, node_path) =
            tokio::join!(service.python_adapter_path(), self.node_binary(target_uri));

        let adapter_path = adapter_path.map_err(|source| BuildError::AdapterPath {
            adapter: AdapterType::Python,
            uri: target_uri.to_string(),
            source,
        })?;

        Ok(AdapterExecutable {
            command: node_path,
            args: vec![adapter_path],
        })
    }

    async fn node_adapter(&self, target_uri: &str) -> Result<AdapterExecutable, BuildError> {
        let service = self.services.service_for(&uri::root_of(target_uri));
        let (adapter_path, node_path) =
            tokio::join!(service.node_adapter_path(), self.node_binary(target_uri));

        let adapter_path = adapter_path.map_err(|source| BuildError::AdapterPath {
            adapter: AdapterType::Node,
            uri: target_uri.to_string(),
            source,
        })?;

        Ok(AdapterExecutable {
            command: node_path,
            args: vec![adapter_path],
        })
    }

    async fn node_binary(&self, uri: &str) -> String {
        match self.binaries.node_binary_path(uri).await {
            Ok(path) => path,
            Err(err) => {
                debug!(error = %err, "Falling back to node from PATH");
                "node".to_string()
            }
        }
    }
}

#[async_trait]
impl DescriptorBuilder for VspDescriptorBuilder {
    async fn build(
        &self,
        context: &ConnectionContext,
        mode: DebugMode,
        adapter: AdapterType,
        target: &AttachTarget,
    ) -> Result<SessionDescriptor, BuildError> {
        match (mode, adapter) {
            (DebugMode::Attach, AdapterType::Python) => {
                self.python_attach(context.root_uri(), target).await
            }
            (DebugMode::Attach, AdapterType::Node) => {
                self.node_attach(context.root_uri(), target.port).await
            }
            (DebugMode::Attach, AdapterType::ReactNative) => {
                self.react_native_attach(context.root_uri(), &target.port.to_string())
                    .await
            }
            (DebugMode::Launch, _) => Err(BuildError::Unsupported { mode, adapter }),
        }
    }
}

fn default_debug_options() -> Vec<&'static str> {
    DEFAULT_DEBUG_OPTIONS.iter().copied().collect()
}
