//! REST snapshot fetch used to paint presence before the gateway answers.

use std::time::Duration;

use lantern_common::{LanternError, Result};
use lantern_config::schema::SnapshotConfig;
use lantern_presence::{parse_presence, Identity, PresenceState};
use serde_json::Value;
use tracing::debug;

pub struct SnapshotClient {
    http: reqwest::Client,
    base_url: String,
}

impl SnapshotClient {
    pub fn new(config: &SnapshotConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| LanternError::Snapshot(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.rest_url.trim_end_matches('/').to_string(),
        })
    }

    /// `GET {rest_url}/users/{id}`.
    pub async fn fetch(&self, identity: &Identity) -> Result<PresenceState> {
        let url = format!("{}/users/{}", self.base_url, identity);
        debug!(url = %url, "Fetching presence snapshot");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| LanternError::Snapshot(e.to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| LanternError::Snapshot(format!("HTTP {status}: {e}")))?;

        parse_body(&body)
    }
}

/// Unwrap the `{success, data}` envelope.
fn parse_body(body: &Value) -> Result<PresenceState> {
    if body.get("success").and_then(Value::as_bool) != Some(true) {
        let message = body
            .pointer("/error/message")
            .and_then(Value::as_str)
            .unwrap_or("request failed");
        return Err(LanternError::Snapshot(message.to_string()));
    }

    let data = body
        .get("data")
        .ok_or_else(|| LanternError::Snapshot("response has no data".into()))?;
    Ok(parse_presence(data)?)
}
