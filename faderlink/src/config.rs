//! Surface configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use faderlink_core::{ControlSettings, HostPolicy, Release};

/// Top-level configuration for the fader surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Destination and persistence.
    pub network: NetworkConfig,
    /// Frame loop.
    pub frame: FrameConfig,
    /// Transmission policy.
    pub dispatch: DispatchConfig,
    /// Logging.
    pub logging: LoggingConfig,
    /// Faders, left to right.
    pub controls: Vec<ControlSettings>,
}

/// Network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Where the last good endpoint is kept (host line, port line).
    pub endpoint_file: PathBuf,
    /// Accept host names as well as IP literals.
    pub allow_hostnames: bool,
    /// Host applied at startup, after the saved endpoint. Empty = none.
    pub host: String,
    /// Port applied at startup, after the saved endpoint. Empty = none.
    pub port: String,
}

/// Frame loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Ticks per second.
    pub rate_hz: u32,
}

/// Dispatch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Minimum change worth sending; 0 sends on any change.
    pub threshold: f32,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            frame: FrameConfig::default(),
            dispatch: DispatchConfig::default(),
            logging: LoggingConfig::default(),
            controls: vec![
                ControlSettings::new("Mod Wheel", "/modwheel/1").auto_returning(0.0),
                ControlSettings::new("Pitch Bend", "/pitchbend/1")
                    .with_range(-1.0, 1.0)
                    .auto_returning(0.0)
                    .with_release(Release::Linear {
                        units_per_second: 4.0,
                    }),
                ControlSettings::new("Expression", "/expression/1"),
            ],
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            endpoint_file: PathBuf::from("faderlink-endpoint.txt"),
            allow_hostnames: false,
            host: String::new(),
            port: String::new(),
        }
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self { rate_hz: 60 }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { threshold: 0.0 }
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

impl NetworkConfig {
    pub fn host_policy(&self) -> HostPolicy {
        if self.allow_hostnames {
            HostPolicy::AllowHostnames
        } else {
            HostPolicy::IpLiteral
        }
    }
}

impl FrameConfig {
    /// Frame period, with the rate clamped to `1..=1000` Hz.
    pub fn period(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / f64::from(self.rate_hz.clamp(1, 1000)))
    }
}

impl SurfaceConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
