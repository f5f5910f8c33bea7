//! Configuration for the mirrorcast agent.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use mirrorcast_core::module::{Capability, ModuleDescriptor, ModuleId};
use mirrorcast_core::relay::RelayConfig;

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Streaming modules offered to the user.
    pub modules: ModulesConfig,
    /// Remote control relay settings.
    pub relay: RelayToml,
    /// Answers of the simulated device.
    pub platform: PlatformConfig,
    /// Selection supervision policy.
    pub supervisor: SupervisorConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Module catalogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModulesConfig {
    pub available: Vec<ModuleDescriptor>,
    /// Module selected at startup, if any.
    pub default: Option<ModuleId>,
}

/// Relay settings, in file units.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayToml {
    /// Hold time of a synthetic tap in milliseconds.
    pub click_duration_ms: u64,
    pub min_platform_level: u32,
    /// Validated gestures waiting for dispatch.
    pub queue_capacity: usize,
}

/// Simulated device capabilities and permissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub platform_level: u32,
    pub input_surface_connected: bool,
    pub sensitive_permission: bool,
    pub notification_permission: bool,
    pub error_notifications: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Restarts of the selection subscription after a fatal error before
    /// the agent gives up.
    pub max_restarts: u32,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            modules: ModulesConfig::default(),
            relay: RelayToml::default(),
            platform: PlatformConfig::default(),
            supervisor: SupervisorConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ModulesConfig {
    fn default() -> Self {
        Self {
            available: vec![
                ModuleDescriptor::new("local", [Capability::ScreenCapture, Capability::RemoteInput]),
                ModuleDescriptor::new(
                    "webrtc",
                    [
                        Capability::ScreenCapture,
                        Capability::AudioCapture,
                        Capability::RemoteInput,
                    ],
                ),
            ],
            default: None,
        }
    }
}

impl Default for RelayToml {
    fn default() -> Self {
        let relay = RelayConfig::default();
        Self {
            click_duration_ms: relay.click_duration.as_millis() as u64,
            min_platform_level: relay.min_platform_level,
            queue_capacity: relay.queue_capacity,
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            platform_level: 34,
            input_surface_connected: true,
            sensitive_permission: false,
            notification_permission: true,
            error_notifications: true,
        }
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self { max_restarts: 3 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl AgentConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Default configuration rendered as TOML.
    pub fn default_toml() -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(&Self::default())
    }

    /// Convert relay settings into the core `RelayConfig`.
    pub fn to_relay_config(&self) -> RelayConfig {
        RelayConfig {
            click_duration: Duration::from_millis(self.relay.click_duration_ms.max(1)),
            min_platform_level: self.relay.min_platform_level,
            queue_capacity: self.relay.queue_capacity.max(1),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
