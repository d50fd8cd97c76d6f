//! Manager configuration.
//!
//! Defaults and environment variable names live here so hosts and tests
//! share one source for them.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::signals::SignalRegistry;

/// Default values.
pub mod defaults {
    /// Name of the callback invoked last during a reset.
    pub const RESET_CALLBACK: &str = "reset";
}

/// Environment variable names.
pub mod env_vars {
    use super::defaults;
    use crate::signals::SignalRegistry;
    use tracing::warn;

    pub const RESET_CALLBACK: &str = "WARELIB_RESET_CALLBACK";
    /// JSON object of logical signal names to branded names.
    pub const SIGNAL_NAMES: &str = "WARELIB_SIGNAL_NAMES";

    /// Reset callback name from the environment, or the default.
    pub fn reset_callback() -> String {
        std::env::var(RESET_CALLBACK)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| defaults::RESET_CALLBACK.to_string())
    }

    /// Branded signal names from the environment, if set and valid.
    pub fn signal_names() -> Option<SignalRegistry> {
        let raw = std::env::var(SIGNAL_NAMES).ok()?;
        match serde_json::from_str(&raw) {
            Ok(registry) => Some(registry),
            Err(e) => {
                warn!(var = SIGNAL_NAMES, error = %e, "Ignoring malformed signal names");
                None
            }
        }
    }
}

fn default_reset_callback() -> String {
    defaults::RESET_CALLBACK.to_string()
}

/// Settings for a [`WareManager`](crate::manager::WareManager).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Callback invoked last during a reset; must be plain.
    #[serde(default = "default_reset_callback")]
    pub reset_callback: String,
    /// Signal names used by the manager and its wares. `None` uses the
    /// process-wide registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signals: Option<SignalRegistry>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            reset_callback: default_reset_callback(),
            signals: None,
        }
    }
}

impl ManagerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `WARELIB_*` environment variables.
    pub fn from_env() -> Self {
        Self {
            reset_callback: env_vars::reset_callback(),
            signals: env_vars::signal_names(),
        }
    }

    pub fn with_reset_callback(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if name.trim().is_empty() {
            warn!("Empty reset callback name, keeping '{}'", self.reset_callback);
        } else {
            self.reset_callback = name;
        }
        self
    }

    pub fn with_signals(mut self, signals: SignalRegistry) -> Self {
        self.signals = Some(signals);
        self
    }
}
