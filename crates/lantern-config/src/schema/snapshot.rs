use serde::{Deserialize, Serialize};

pub const DEFAULT_REST_URL: &str = "https://api.lanyard.rest/v1";

/// REST snapshot used to paint presence before the gateway delivers it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub enabled: bool,
    /// Base URL; users are fetched from `{rest_url}/users/{id}`.
    pub rest_url: String,
    /// Request timeout in milliseconds (valid range: 100-60000).
    pub timeout_ms: u64,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rest_url: DEFAULT_REST_URL.into(),
            timeout_ms: 5_000,
        }
    }
}
