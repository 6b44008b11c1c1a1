//! Config file parsing for `~/.config/epub-thumb/config.toml`.
//!
//! Use `extract_options_from_config` to turn the loaded config into the
//! options `extract_thumbnail` takes.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::extract::ExtractOptions;
use crate::security::SecurityLimits;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    /// Replace an existing thumbnail instead of leaving it alone.
    #[serde(default)]
    pub overwrite: bool,
    #[serde(default)]
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SecurityConfig {
    pub max_file_count: Option<u64>,
    pub max_resource_size_mb: Option<u64>,
}

/// Return the default config file path.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|mut p| {
        p.push("epub-thumb");
        p.push("config.toml");
        p
    })
}

/// Load config from the default path. A missing or unreadable file yields defaults.
pub fn load_config() -> AppConfig {
    let Some(path) = config_path() else {
        return AppConfig::default();
    };
    if !path.exists() {
        return AppConfig::default();
    }

    match load_config_from(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!("Ignoring config: {e}");
            AppConfig::default()
        }
    }
}

/// Load an explicitly named config file. Unlike `load_config`, failures are errors.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Build security limits from config. Uses defaults for any unset values.
pub fn security_limits_from_config(c: &SecurityConfig) -> SecurityLimits {
    let mut limits = SecurityLimits::default();
    if let Some(count) = c.max_file_count {
        limits.max_file_count = count;
    }
    if let Some(mb) = c.max_resource_size_mb {
        limits.max_resource_size_bytes = mb.saturating_mul(1024).saturating_mul(1024);
    }
    limits
}

pub fn extract_options_from_config(cfg: &AppConfig) -> ExtractOptions {
    ExtractOptions {
        security: security_limits_from_config(&cfg.security),
        overwrite: cfg.overwrite,
    }
}
