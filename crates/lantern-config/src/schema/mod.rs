//! Configuration schema types for Lantern.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod gateway;
mod snapshot;
mod system;

pub use gateway::*;
pub use snapshot::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Root configuration for Lantern.
///
/// Only override what you want to change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanternConfig {
    pub gateway: GatewayConfig,
    pub reconnect: ReconnectConfig,
    pub snapshot: SnapshotConfig,
    pub logging: LoggingConfig,
}
