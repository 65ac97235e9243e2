//! Gateway connection and reconnect settings.

pub use lantern_common::DEFAULT_GATEWAY_URL;
use serde::{Deserialize, Serialize};

/// Presence gateway connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// WebSocket URL (`ws://` or `wss://`).
    pub url: String,
    /// Connect timeout in milliseconds (valid range: 1000-120000).
    pub connect_timeout_ms: u64,
    /// Time allowed for the gateway's hello after the socket opens
    /// (valid range: 1000-60000).
    pub hello_timeout_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_GATEWAY_URL.into(),
            connect_timeout_ms: 15_000,
            hello_timeout_ms: 10_000,
        }
    }
}

/// Exponential reconnect backoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Delay before the first retry (valid range: 100-60000).
    pub base_delay_ms: u64,
    /// Cap on the doubled delay (at least `base_delay_ms`, at most 600000).
    pub max_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
        }
    }
}
