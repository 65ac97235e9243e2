//! Maps the on-disk config onto the presence client's settings.

use std::time::Duration;

use lantern_config::LanternConfig;
use lantern_presence::ClientConfig;

/// Build the client config, letting `url_override` (from `--url`) win over
/// the file.
pub fn client_config(config: &LanternConfig, url_override: Option<&str>) -> ClientConfig {
    ClientConfig {
        url: url_override.unwrap_or(&config.gateway.url).to_string(),
        connect_timeout: Duration::from_millis(config.gateway.connect_timeout_ms),
        hello_timeout: Duration::from_millis(config.gateway.hello_timeout_ms),
        reconnect_base_delay: Duration::from_millis(config.reconnect.base_delay_ms),
        max_reconnect_delay: Duration::from_millis(config.reconnect.max_delay_ms),
    }
}

/// Fallback `tracing` filter when `RUST_LOG` is unset.
pub fn default_log_filter(config: &LanternConfig) -> String {
    let level = config.logging.level.as_filter();
    format!("lantern_watch={level},lantern_presence={level}")
}
