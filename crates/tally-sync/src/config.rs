//! # Sync Configuration
//!
//! Configuration management for the recompute controller.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TALLY_SYNC_MODE=immediate                                          │
//! │     TALLY_DEBOUNCE_MS=200                                              │
//! │     TALLY_TOLERANCE=0.01                                               │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/tally/sync.toml (Linux)                                  │
//! │     ~/Library/Application Support/com.tally.tally/sync.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     SyncMode::Debounced, 120 ms, tolerance 0.01                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # sync.toml
//! [sync]
//! mode = "debounced"  # immediate | debounced
//! debounce_ms = 120
//! tolerance = "0.01"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_core::WRITE_BACK_TOLERANCE;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};

/// Default debounce window in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 120;

// =============================================================================
// Sync Mode
// =============================================================================

/// When recomputation runs after an edit.
///
/// ## Mode Comparison
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                      Sync Mode Comparison                               │
/// │                                                                         │
/// │  IMMEDIATE                          │  DEBOUNCED (Default)              │
/// │  ──────────                         │  ─────────────────────            │
/// │  • Recompute on every edit          │  • Wait for a quiet window        │
/// │  • No runtime needed                │  • Needs a tokio runtime          │
/// │  • Best for batch / CLI use         │  • Best for keystroke input       │
/// │                                                                         │
/// │  Example: user types "1", "12", "125" into quantity within 120ms       │
/// │                                                                         │
/// │  IMMEDIATE:                         │  DEBOUNCED:                       │
/// │  → recompute (qty 1)                │  → wait 120ms...                  │
/// │  → recompute (qty 12)               │  → recompute (qty 125)            │
/// │  → recompute (qty 125)              │                                   │
/// │  (3 passes)                         │  (1 pass)                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Recompute synchronously on each notification.
    Immediate,

    /// Cancel and reschedule on each notification; recompute once quiet.
    #[default]
    Debounced,
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncMode::Immediate => write!(f, "immediate"),
            SyncMode::Debounced => write!(f, "debounced"),
        }
    }
}

impl std::str::FromStr for SyncMode {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "immediate" | "sync" | "eager" => Ok(SyncMode::Immediate),
            "debounced" | "debounce" | "deferred" => Ok(SyncMode::Debounced),
            other => Err(SyncError::InvalidConfig(format!(
                "Unknown sync mode: '{}'. Valid options: immediate, debounced",
                other
            ))),
        }
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Recompute behavior settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// When recomputation runs.
    #[serde(default)]
    pub mode: SyncMode,

    /// Quiet window before a debounced recomputation (milliseconds).
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Amount changes smaller than this are not written back.
    #[serde(default = "default_tolerance")]
    pub tolerance: Decimal,
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_tolerance() -> Decimal {
    WRITE_BACK_TOLERANCE
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            mode: SyncMode::default(),
            debounce_ms: default_debounce_ms(),
            tolerance: default_tolerance(),
        }
    }
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete sync configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Recompute behavior settings.
    #[serde(default)]
    pub sync: SyncSettings,
}

impl SyncConfig {
    /// Creates a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (sync.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading sync config from file");
                let contents = std::fs::read_to_string(&path).map_err(|e| {
                    SyncError::ConfigLoadFailed(format!("{}: {}", path.display(), e))
                })?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load sync config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&path, self.to_toml()?)?;

        info!(?path, "Sync config saved");
        Ok(())
    }

    /// Renders the configuration as it would be saved.
    pub fn to_toml(&self) -> SyncResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.sync.tolerance < Decimal::ZERO {
            return Err(SyncError::InvalidConfig(format!(
                "tolerance must not be negative, got {}",
                self.sync.tolerance
            )));
        }

        if self.sync.mode == SyncMode::Debounced && self.sync.debounce_ms == 0 {
            return Err(SyncError::InvalidConfig(
                "debounce_ms must be greater than 0 in debounced mode".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(mode) = lookup("TALLY_SYNC_MODE") {
            match mode.parse() {
                Ok(parsed) => {
                    debug!(mode = %mode, "Overriding sync mode from environment");
                    self.sync.mode = parsed;
                }
                Err(_) => warn!(mode = %mode, "Unknown sync mode in environment"),
            }
        }

        if let Some(ms) = lookup("TALLY_DEBOUNCE_MS") {
            if let Ok(parsed) = ms.trim().parse::<u64>() {
                debug!(debounce_ms = parsed, "Overriding debounce window from environment");
                self.sync.debounce_ms = parsed;
            }
        }

        if let Some(tolerance) = lookup("TALLY_TOLERANCE") {
            if let Ok(parsed) = tolerance.trim().parse::<Decimal>() {
                debug!(%parsed, "Overriding tolerance from environment");
                self.sync.tolerance = parsed;
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "tally", "tally").map(|dirs| {
            let config_dir = dirs.config_dir();
            config_dir.join("sync.toml")
        })
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Returns the sync mode.
    pub fn mode(&self) -> SyncMode {
        self.sync.mode
    }

    /// Returns the debounce window.
    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.sync.debounce_ms)
    }

    /// Returns the write-back tolerance.
    pub fn tolerance(&self) -> Decimal {
        self.sync.tolerance
    }
}
