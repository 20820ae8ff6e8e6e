//! Configuration management
//!
//! Config file is stored next to the executable as `config.toml`, or
//! given explicitly with `--config`. Every section and field is optional;
//! missing values fall back to the defaults below.

use crate::constants::{
    DEFAULT_SERIAL_BAUD, DEFAULT_SETTLE_MS, DEFAULT_SHELL_PORT, DEFAULT_TIMEOUT_MS,
    DEFAULT_UDP_HOST, DEFAULT_UDP_LISTEN_PORT, DEFAULT_UDP_SEND_PORT,
};
use crate::error::{TrackError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

// =============================================================================
// Application Configuration
// =============================================================================

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub controller: ControllerConfig,
    pub transport: TransportConfig,
    pub shell: ShellConfig,
}

// =============================================================================
// Controller Configuration
// =============================================================================

/// What the controller does when the transport refuses a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SendFailurePolicy {
    /// Return the error to the caller
    #[default]
    Report,
    /// Return the error, cut track power and refuse further commands
    EmergencyStop,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Bus identity (0 = negotiate at start)
    pub hash: u16,

    /// Response wait budget per exchange (milliseconds)
    pub timeout_ms: u64,

    /// Wait after a hash probe before checking for conflicts (milliseconds)
    pub settle_ms: u64,

    /// Log every frame in and out
    pub debug: bool,

    /// Transport reflects frames, no other participants
    pub loopback: bool,

    pub send_failure: SendFailurePolicy,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            hash: 0,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            settle_ms: DEFAULT_SETTLE_MS,
            debug: false,
            loopback: false,
            send_failure: SendFailurePolicy::Report,
        }
    }
}

// =============================================================================
// Transport Configuration
// =============================================================================

/// Link to the track bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// CS2 CAN-over-UDP gateway
    #[default]
    Udp,
    /// SLCAN USB-CAN adapter
    Serial,
    /// In-memory bus, frames are reflected
    Loopback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub kind: TransportKind,

    /// Serial port name
    /// Only used when kind = Serial
    pub serial_port: String,

    /// Baud rate (ignored by most USB CDC adapters)
    pub serial_baud: u32,

    /// Gateway host name or address
    /// Only used when kind = Udp
    pub udp_host: String,

    /// Gateway port receiving frames for the bus
    pub udp_send_port: u16,

    /// Local port the gateway forwards bus frames to
    pub udp_listen_port: u16,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::Udp,
            serial_port: String::new(),
            serial_baud: DEFAULT_SERIAL_BAUD,
            udp_host: DEFAULT_UDP_HOST.to_string(),
            udp_send_port: DEFAULT_UDP_SEND_PORT,
            udp_listen_port: DEFAULT_UDP_LISTEN_PORT,
        }
    }
}

// =============================================================================
// Shell Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// TCP port for the command shell (localhost only)
    pub listen_port: u16,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            listen_port: DEFAULT_SHELL_PORT,
        }
    }
}

impl Config {
    /// Reject values the controller cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.controller.timeout_ms == 0 {
            return Err(TrackError::ConfigValidation {
                field: "controller.timeout_ms",
                reason: "must be greater than zero".into(),
            });
        }
        if self.transport.kind == TransportKind::Serial && self.transport.serial_port.is_empty()
        {
            return Err(TrackError::ConfigValidation {
                field: "transport.serial_port",
                reason: "required for the serial transport".into(),
            });
        }
        if self.transport.kind == TransportKind::Udp && self.transport.udp_host.is_empty() {
            return Err(TrackError::ConfigValidation {
                field: "transport.udp_host",
                reason: "required for the udp transport".into(),
            });
        }
        Ok(())
    }
}

/// Config file next to the executable, if there is one
pub fn default_config_file() -> Option<PathBuf> {
    config_path().ok().filter(|path| path.exists())
}

/// Get the config file path next to the executable
pub fn config_path() -> Result<PathBuf> {
    let exe = std::env::current_exe().map_err(|e| TrackError::ConfigRead {
        path: PathBuf::from("executable"),
        source: e,
    })?;
    let exe_dir = exe.parent().ok_or_else(|| TrackError::ConfigValidation {
        field: "exe_path",
        reason: "no parent directory".into(),
    })?;
    Ok(exe_dir.join("config.toml"))
}

/// Load config from a file
///
/// A missing or malformed file is an error; callers decide whether to
/// fall back to `Config::default()`.
pub fn load_from(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|e| TrackError::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    toml::from_str(&content).map_err(|e| TrackError::ConfigValidation {
        field: "config",
        reason: format!("{}: {}", path.display(), e),
    })
}

/// Save config to the given path
pub fn save(config: &Config, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config).map_err(|e| TrackError::ConfigValidation {
        field: "config",
        reason: e.to_string(),
    })?;
    fs::write(path, content).map_err(|e| TrackError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Write a config file, refusing to replace an existing one unless `overwrite`
pub fn save_new(config: &Config, path: &Path, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        return Err(TrackError::ConfigValidation {
            field: "config",
            reason: format!("{} already exists", path.display()),
        });
    }
    save(config, path)
}

// ============================================================================
// Tests
// ============================================================================
