//! Configuration, connection state and command enums for the supervisor.

use std::time::Duration;

use crate::codec::OutboundMessage;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Exponential reconnect backoff: `base * 2^(attempt - 1)`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
}

impl Backoff {
    /// Delay before reconnect attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max)
            .min(self.max)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            max: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Upper bound on opening the socket.
    pub connect_timeout: Duration,
    /// How long an opened socket may stay silent before its hello.
    pub hello_timeout: Duration,
    pub backoff: Backoff,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            hello_timeout: Duration::from_secs(10),
            backoff: Backoff::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Process-wide connection state. Only the supervisor task writes it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    AwaitingHello,
    Connected {
        heartbeat_interval: Duration,
    },
    Reconnecting {
        attempt: u32,
        delay: Duration,
    },
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected { .. })
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub(crate) enum Command {
    EnsureConnected,
    /// The desired identity set changed; resend it if connected.
    SyncSubscriptions,
    Send(OutboundMessage),
    Shutdown,
}
