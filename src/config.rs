//! Dispatcher configuration.
//!
//! Read from `<config dir>/remote-debug-dispatch/config.json`; every field is
//! optional and falls back to its default.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Provider name the host reports for sessions this crate starts
pub const DEFAULT_PROVIDER_NAME: &str = "vsp-debugger";

// Keeps the remote listeners out of the host's own startup work.
const DEFAULT_STARTUP_DELAY_MS: u64 = 10 * 1000;
const DEFAULT_DEBOUNCE_MS: u64 = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DispatcherConfig {
    /// Quiet period after start before any remote signal is observed
    pub startup_delay_ms: u64,
    /// Quiet window used to collapse bursts of attach commands
    pub debounce_ms: u64,
    /// Provider name of our own sessions, used to spot foreign sessions
    pub provider_name: String,
    /// Don't log per-connection signal failures (test harnesses)
    pub quiet_signal_errors: bool,
    /// Where the vscode-react-native adapter is unpacked
    pub react_native_adapter_dir: PathBuf,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            startup_delay_ms: DEFAULT_STARTUP_DELAY_MS,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            provider_name: DEFAULT_PROVIDER_NAME.to_string(),
            quiet_signal_errors: false,
            react_native_adapter_dir: PathBuf::from("VendorLib/vscode-react-native"),
        }
    }
}

impl DispatcherConfig {
    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Default location of the config file
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("remote-debug-dispatch").join("config.json"))
    }

    /// Load from the default location, using defaults when it is missing
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from `path`. A malformed file is reported and replaced by defaults.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = fs::read_to_string(path) else {
            return Self::default();
        };

        match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Ignoring malformed dispatcher config");
                Self::default()
            }
        }
    }
}
