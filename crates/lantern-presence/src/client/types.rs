//! Configuration for the presence client.

use std::time::Duration;

use crate::supervisor::{Backoff, SupervisorConfig};

pub use lantern_common::DEFAULT_GATEWAY_URL;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the presence client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// WebSocket URL of the presence gateway.
    pub url: String,
    /// Upper bound on opening the socket.
    pub connect_timeout: Duration,
    /// How long to wait for the gateway's hello after the socket opens.
    pub hello_timeout: Duration,
    /// Reconnect delay after the first failure.
    pub reconnect_base_delay: Duration,
    /// Maximum reconnect delay.
    pub max_reconnect_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let supervisor = SupervisorConfig::default();
        Self {
            url: DEFAULT_GATEWAY_URL.to_string(),
            connect_timeout: supervisor.connect_timeout,
            hello_timeout: supervisor.hello_timeout,
            reconnect_base_delay: supervisor.backoff.base,
            max_reconnect_delay: supervisor.backoff.max,
        }
    }
}

impl ClientConfig {
    pub(crate) fn supervisor(&self) -> SupervisorConfig {
        SupervisorConfig {
            connect_timeout: self.connect_timeout,
            hello_timeout: self.hello_timeout,
            backoff: Backoff {
                base: self.reconnect_base_delay,
                // A cap below the base would shrink every delay to the cap.
                max: self.max_reconnect_delay.max(self.reconnect_base_delay),
            },
        }
    }
}
