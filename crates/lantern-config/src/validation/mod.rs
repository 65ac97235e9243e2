//! Full configuration validation.
//!
//! Checks numeric ranges and URL schemes, collecting every problem into a
//! single `ConfigError`.

mod gateway;
mod helpers;


use crate::schema::LanternConfig;
use lantern_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &LanternConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    gateway::validate_gateway(&mut errors, config);
    gateway::validate_reconnect(&mut errors, config);
    gateway::validate_snapshot(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
