//! # Sync Error Types
//!
//! Error types for the sync layer.
//!
//! The controller itself never fails: malformed edits are coerced, unknown
//! line ids are logged. Errors only come from loading and saving
//! configuration.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌──────────────────────────────┐  ┌──────────────────────────────┐    │
//! │  │  Configuration               │  │  File / TOML                 │    │
//! │  │                              │  │                              │    │
//! │  │  InvalidConfig               │  │  Io                          │    │
//! │  │  ConfigLoadFailed (read)     │  │  TomlDe                      │    │
//! │  │  ConfigSaveFailed            │  │  TomlSer                     │    │
//! │  └──────────────────────────────┘  └──────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid sync configuration.
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // File Errors
    // =========================================================================
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Could not serialize config: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl SyncError {
    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
                | SyncError::TomlDe(_)
                | SyncError::TomlSer(_)
        )
    }
}
