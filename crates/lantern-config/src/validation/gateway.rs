//! Validation for the gateway, reconnect and snapshot sections.

use crate::schema::LanternConfig;

use super::helpers::{validate_range, validate_scheme};

pub(crate) fn validate_gateway(errors: &mut Vec<String>, config: &LanternConfig) {
    let gateway = &config.gateway;
    validate_scheme(errors, "gateway.url", &gateway.url, &["ws://", "wss://"]);
    validate_range(
        errors,
        "gateway.connect_timeout_ms",
        gateway.connect_timeout_ms,
        1_000,
        120_000,
    );
    validate_range(
        errors,
        "gateway.hello_timeout_ms",
        gateway.hello_timeout_ms,
        1_000,
        60_000,
    );
}

pub(crate) fn validate_reconnect(errors: &mut Vec<String>, config: &LanternConfig) {
    let reconnect = &config.reconnect;
    validate_range(
        errors,
        "reconnect.base_delay_ms",
        reconnect.base_delay_ms,
        100,
        60_000,
    );
    // The cap may never undercut the base delay.
    validate_range(
        errors,
        "reconnect.max_delay_ms",
        reconnect.max_delay_ms,
        reconnect.base_delay_ms,
        600_000,
    );
}

/// The REST endpoint only matters while snapshots are enabled.
pub(crate) fn validate_snapshot(errors: &mut Vec<String>, config: &LanternConfig) {
    let snapshot = &config.snapshot;
    if !snapshot.enabled {
        return;
    }
    validate_scheme(
        errors,
        "snapshot.rest_url",
        &snapshot.rest_url,
        &["http://", "https://"],
    );
    validate_range(errors, "snapshot.timeout_ms", snapshot.timeout_ms, 100, 60_000);
}
