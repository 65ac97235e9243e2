//! Core TOML config loading: read from path or platform default.

use std::io::ErrorKind;
use std::path::Path;

use lantern_common::ConfigError;
use tracing::{info, warn};

use super::paths::{create_default_config, default_config_path};
use crate::schema::LanternConfig;
use crate::validation;

/// Load config from a specific TOML file path.
///
/// Missing fields take their defaults. Validation problems are logged but do
/// not fail the load; callers that need a valid config run
/// [`validation::validate`] themselves.
pub fn load_from_path(path: &Path) -> Result<LanternConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ConfigError::FileNotFound(path.to_path_buf()),
        _ => ConfigError::ParseError(format!("failed to read {}: {e}", path.display())),
    })?;

    let config: LanternConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;

    if let Err(e) = validation::validate(&config) {
        warn!(path = %path.display(), "config validation warning: {e}");
    }

    info!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Load config from the platform-specific default path.
///
/// On macOS: `~/Library/Application Support/lantern/config.toml`
/// On Linux: `~/.config/lantern/config.toml`
///
/// If the file does not exist, writes the commented template there and
/// returns defaults.
pub fn load_default() -> Result<LanternConfig, ConfigError> {
    load_default_from(&default_config_path()?)
}

/// Like [`load_default`], with an explicit location for the file.
pub fn load_default_from(path: &Path) -> Result<LanternConfig, ConfigError> {
    match load_from_path(path) {
        Err(ConfigError::FileNotFound(_)) => {
            info!(path = %path.display(), "no config found, creating default");
            create_default_config(path)?;
            Ok(LanternConfig::default())
        }
        other => other,
    }
}
