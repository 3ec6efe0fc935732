//! Path utilities for paygate.
//!
//! All data lives under `~/.paygate/`:
//! - `~/.paygate/config.toml` - main configuration

use std::path::PathBuf;

/// Returns the paygate home directory (`~/.paygate/`).
pub fn home_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".paygate")
}

/// Returns the default config file path (`~/.paygate/config.toml`).
pub fn default_config() -> PathBuf {
    home_dir().join("config.toml")
}
