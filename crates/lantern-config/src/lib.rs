//! Lantern configuration system.
//!
//! Provides TOML-based configuration with full validation. All config
//! sections use sensible defaults so partial configs work out of the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use lantern_config::load_config;
//!
//! let config = load_config().expect("failed to load config");
//! println!("{}", config.gateway.url);
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::LanternConfig;

use std::path::Path;

use lantern_common::ConfigError;

/// Load config from the platform default path, creating it if missing, and
/// validate the result.
pub fn load_config() -> Result<LanternConfig, ConfigError> {
    let config = toml_loader::load_default()?;
    validation::validate(&config)?;
    Ok(config)
}

/// Load and validate config from an explicit path.
pub fn load_config_from(path: &Path) -> Result<LanternConfig, ConfigError> {
    let config = toml_loader::load_from_path(path)?;
    validation::validate(&config)?;
    Ok(config)
}
