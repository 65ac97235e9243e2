//! Wire codec for the presence gateway's JSON envelope.
//!
//! Inbound frames look like `{"op": 1, "d": {...}}` (hello) or
//! `{"op": 0, "t": "PRESENCE_UPDATE", "d": {...}}` (dispatch). Anything the
//! codec does not recognise is surfaced as `InboundMessage::Unknown` rather
//! than treated as an error, so new gateway features never break the stream.

use std::time::Duration;

use lantern_common::DecodeError;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::identity::Identity;
use crate::protocol::{Activity, ActivityKind, PresenceState, Status};

// ---------------------------------------------------------------------------
// Op codes and event names
// ---------------------------------------------------------------------------

pub mod ops {
    pub const EVENT: u64 = 0;
    pub const HELLO: u64 = 1;
    pub const INITIALIZE: u64 = 2;
    pub const HEARTBEAT: u64 = 3;
}

pub mod events {
    pub const INIT_STATE: &str = "INIT_STATE";
    pub const PRESENCE_UPDATE: &str = "PRESENCE_UPDATE";
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Hello { heartbeat_interval: Duration },
    /// Full state delivered right after (re)subscribing.
    PresenceSnapshot { identity: Identity, state: PresenceState },
    /// Live change. Also a full snapshot; applied the same way.
    PresenceDelta { identity: Identity, state: PresenceState },
    Unknown { raw: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    SubscribeAll { identities: Vec<Identity> },
    Heartbeat,
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    op: Option<u64>,
    #[serde(default)]
    t: Option<String>,
    #[serde(default)]
    d: Option<Value>,
}

#[derive(Deserialize)]
struct WirePresence {
    #[serde(default)]
    discord_status: Status,
    #[serde(default)]
    active_on_discord_mobile: bool,
    #[serde(default)]
    active_on_discord_desktop: bool,
    #[serde(default)]
    active_on_discord_web: bool,
    #[serde(default)]
    activities: Vec<WireActivity>,
    #[serde(default)]
    discord_user: Option<Value>,
}

#[derive(Deserialize)]
struct WireActivity {
    #[serde(rename = "type", default)]
    kind: u64,
    #[serde(default)]
    name: String,
    details: Option<String>,
    state: Option<String>,
}

impl From<WirePresence> for PresenceState {
    fn from(wire: WirePresence) -> Self {
        Self {
            status: wire.discord_status,
            is_mobile: wire.active_on_discord_mobile,
            is_desktop: wire.active_on_discord_desktop,
            is_web: wire.active_on_discord_web,
            activities: wire
                .activities
                .into_iter()
                .map(|a| Activity {
                    kind: ActivityKind::from_code(a.kind),
                    name: a.name,
                    details: a.details,
                    state: a.state,
                })
                .collect(),
            raw_user: wire.discord_user.filter(|u| !u.is_null()),
        }
    }
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

/// Decode one text frame.
///
/// A multi-identity `INIT_STATE` carries one snapshot per subscribed
/// identity, so a single frame can produce several messages.
pub fn decode(raw: &str) -> Result<Vec<InboundMessage>, DecodeError> {
    let envelope: Envelope = serde_json::from_str(raw)?;

    match (envelope.op, envelope.t.as_deref()) {
        (Some(ops::HELLO), _) => {
            let interval = envelope
                .d
                .as_ref()
                .and_then(|d| d.get("heartbeat_interval"))
                .and_then(Value::as_u64)
                .ok_or(DecodeError::MissingField("heartbeat_interval"))?;
            if interval == 0 {
                return Err(DecodeError::Payload(
                    "heartbeat_interval must be positive".into(),
                ));
            }
            Ok(vec![InboundMessage::Hello {
                heartbeat_interval: Duration::from_millis(interval),
            }])
        }
        (Some(ops::EVENT) | None, Some(events::INIT_STATE)) => {
            let d = envelope.d.ok_or(DecodeError::MissingField("d"))?;
            decode_init_state(&d)
        }
        (Some(ops::EVENT) | None, Some(events::PRESENCE_UPDATE)) => {
            let d = envelope.d.ok_or(DecodeError::MissingField("d"))?;
            let identity = identity_of(&d).ok_or(DecodeError::MissingIdentity)?;
            let state = parse_presence(&d)?;
            Ok(vec![InboundMessage::PresenceDelta { identity, state }])
        }
        _ => Ok(vec![InboundMessage::Unknown {
            raw: raw.to_string(),
        }]),
    }
}

fn decode_init_state(d: &Value) -> Result<Vec<InboundMessage>, DecodeError> {
    // Single-identity subscriptions get the presence itself as `d`.
    if d.get("discord_status").is_some() {
        let identity = identity_of(d).ok_or(DecodeError::MissingIdentity)?;
        let state = parse_presence(d)?;
        return Ok(vec![InboundMessage::PresenceSnapshot { identity, state }]);
    }

    let map = d
        .as_object()
        .ok_or_else(|| DecodeError::Payload("INIT_STATE payload is not an object".into()))?;
    // A bad entry only costs that identity its snapshot.
    let messages = map
        .iter()
        .filter_map(|(id, presence)| match parse_presence(presence) {
            Ok(state) => Some(InboundMessage::PresenceSnapshot {
                identity: Identity::from(id.as_str()),
                state,
            }),
            Err(e) => {
                warn!(identity = %id, error = %e, "Skipping malformed INIT_STATE entry");
                None
            }
        })
        .collect();
    Ok(messages)
}

/// Parse a presence object as sent by the gateway or the REST snapshot
/// endpoint.
pub fn parse_presence(value: &Value) -> Result<PresenceState, DecodeError> {
    let wire = WirePresence::deserialize(value)
        .map_err(|e| DecodeError::Payload(e.to_string()))?;
    Ok(wire.into())
}

fn identity_of(d: &Value) -> Option<Identity> {
    d.get("user_id")
        .and_then(Value::as_str)
        .or_else(|| {
            d.get("discord_user")
                .and_then(|u| u.get("id"))
                .and_then(Value::as_str)
        })
        .map(Identity::from)
}

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

pub fn encode(msg: &OutboundMessage) -> String {
    match msg {
        OutboundMessage::SubscribeAll { identities } => {
            let ids: Vec<&str> = identities.iter().map(Identity::as_str).collect();
            json!({
                "op": ops::INITIALIZE,
                "d": { "subscribe_to_ids": ids }
            })
            .to_string()
        }
        OutboundMessage::Heartbeat => json!({ "op": ops::HEARTBEAT }).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn presence_json(user_id: &str, status: &str) -> Value {
        json!({
            "discord_status": status,
            "active_on_discord_mobile": true,
            "active_on_discord_desktop": false,
            "active_on_discord_web": false,
            "listening_to_spotify": false,
            "kv": {},
            "activities": [
                { "type": 4, "name": "Custom Status", "state": "shipping" },
                { "type": 0, "name": "Factorio", "details": "Building rails", "created_at": 1 }
            ],
            "discord_user": { "id": user_id, "username": "someone" }
        })
    }

    #[test]
    fn decodes_hello() {
        let msgs = decode(r#"{"op":1,"d":{"heartbeat_interval":30000}}"#).unwrap();
        assert_eq!(
            msgs,
            vec![InboundMessage::Hello {
                heartbeat_interval: Duration::from_millis(30_000)
            }]
        );
    }

    #[test]
    fn hello_without_interval_is_an_error() {
        let err = decode(r#"{"op":1,"d":{}}"#).unwrap_err();
        assert!(matches!(err, DecodeError::MissingField("heartbeat_interval")));

        let err = decode(r#"{"op":1,"d":{"heartbeat_interval":0}}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Payload(_)));
    }

    #[test]
    fn decodes_multi_identity_init_state() {
        let frame = json!({
            "op": 0,
            "seq": 1,
            "t": "INIT_STATE",
            "d": {
                "1": presence_json("1", "online"),
                "2": presence_json("2", "dnd"),
            }
        })
        .to_string();

        let msgs = decode(&frame).unwrap();
        assert_eq!(msgs.len(), 2);
        let statuses: Vec<(String, Status)> = msgs
            .iter()
            .map(|m| match m {
                InboundMessage::PresenceSnapshot { identity, state } => {
                    (identity.to_string(), state.status)
                }
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert!(statuses.contains(&("1".into(), Status::Online)));
        assert!(statuses.contains(&("2".into(), Status::DoNotDisturb)));
    }

    #[test]
    fn decodes_single_identity_init_state() {
        let frame = json!({"op": 0, "t": "INIT_STATE", "d": presence_json("42", "idle")}).to_string();
        let msgs = decode(&frame).unwrap();
        match &msgs[..] {
            [InboundMessage::PresenceSnapshot { identity, state }] => {
                assert_eq!(identity.as_str(), "42");
                assert_eq!(state.status, Status::Idle);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn decodes_presence_update_with_full_state() {
        let mut d = presence_json("42", "online");
        d["user_id"] = json!("42");
        let frame = json!({"op": 0, "seq": 7, "t": "PRESENCE_UPDATE", "d": d}).to_string();

        let msgs = decode(&frame).unwrap();
        let [InboundMessage::PresenceDelta { identity, state }] = &msgs[..] else {
            panic!("unexpected {msgs:?}");
        };
        assert_eq!(identity.as_str(), "42");
        assert!(state.is_mobile);
        assert!(!state.is_desktop);
        assert_eq!(state.activities.len(), 2);
        assert_eq!(state.activities[0].kind, ActivityKind::Custom);
        assert_eq!(state.activities[0].state.as_deref(), Some("shipping"));
        assert_eq!(state.activities[1].details.as_deref(), Some("Building rails"));
        assert_eq!(state.headline_activity().unwrap().name, "Factorio");
        assert_eq!(state.raw_user.as_ref().unwrap()["username"], "someone");
    }

    #[test]
    fn presence_update_without_identity_is_an_error() {
        let frame = json!({
            "op": 0,
            "t": "PRESENCE_UPDATE",
            "d": { "discord_status": "online", "activities": [] }
        })
        .to_string();
        assert!(matches!(decode(&frame), Err(DecodeError::MissingIdentity)));
    }

    #[test]
    fn missing_optional_fields_default() {
        let state = parse_presence(&json!({ "discord_user": null })).unwrap();
        assert_eq!(state.status, Status::Offline);
        assert!(state.activities.is_empty());
        assert!(state.raw_user.is_none());
    }

    #[test]
    fn malformed_init_state_entry_keeps_the_others() {
        let frame = json!({
            "op": 0,
            "t": "INIT_STATE",
            "d": {
                "1": { "discord_status": "online", "activities": "nope" },
                "2": presence_json("2", "idle"),
            }
        })
        .to_string();

        let msgs = decode(&frame).unwrap();
        assert_eq!(msgs.len(), 1);
        assert!(matches!(
            &msgs[0],
            InboundMessage::PresenceSnapshot { identity, state }
                if identity.as_str() == "2" && state.status == Status::Idle
        ));
    }

    #[test]
    fn bad_activity_list_is_a_payload_error() {
        let err = parse_presence(&json!({ "activities": "nope" })).unwrap_err();
        assert!(matches!(err, DecodeError::Payload(_)));
    }

    #[test]
    fn unknown_ops_and_events_are_surfaced() {
        let msgs = decode(r#"{"op":9,"d":null}"#).unwrap();
        assert!(matches!(&msgs[..], [InboundMessage::Unknown { .. }]));

        let raw = r#"{"op":0,"t":"SOMETHING_NEW","d":{"x":1}}"#;
        let msgs = decode(raw).unwrap();
        assert_eq!(msgs, vec![InboundMessage::Unknown { raw: raw.to_string() }]);
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        assert!(matches!(decode("{\"op\":"), Err(DecodeError::Json(_))));
        assert!(matches!(decode("not json"), Err(DecodeError::Json(_))));
    }

    #[test]
    fn encodes_subscribe_all() {
        let msg = OutboundMessage::SubscribeAll {
            identities: vec![Identity::from("1"), Identity::from("2")],
        };
        let value: Value = serde_json::from_str(&encode(&msg)).unwrap();
        assert_eq!(value, json!({"op": 2, "d": {"subscribe_to_ids": ["1", "2"]}}));
    }

    #[test]
    fn encodes_heartbeat() {
        let value: Value = serde_json::from_str(&encode(&OutboundMessage::Heartbeat)).unwrap();
        assert_eq!(value, json!({"op": 3}));
    }
}
