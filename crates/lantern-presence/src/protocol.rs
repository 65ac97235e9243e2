//! Presence data model shared by the codec, the store and subscribers.
//!
//! A `PresenceState` is always a full snapshot: the gateway never sends
//! partial updates, so every update replaces the previous state wholesale.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Online status reported by the gateway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Online,
    Idle,
    #[serde(rename = "dnd")]
    DoNotDisturb,
    /// Also used for any status string this client does not recognise.
    #[default]
    #[serde(other)]
    Offline,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Online => "online",
            Status::Idle => "idle",
            Status::DoNotDisturb => "dnd",
            Status::Offline => "offline",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Activities
// ---------------------------------------------------------------------------

/// Kind of an activity, derived from the gateway's numeric activity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Game,
    Listening,
    Custom,
    Other,
}

impl ActivityKind {
    pub fn from_code(code: u64) -> Self {
        match code {
            0 => ActivityKind::Game,
            2 => ActivityKind::Listening,
            4 => ActivityKind::Custom,
            _ => ActivityKind::Other,
        }
    }

    /// Headline priority; lower wins. `None` means never a headline.
    fn priority(&self) -> Option<u8> {
        match self {
            ActivityKind::Game => Some(0),
            ActivityKind::Listening => Some(1),
            ActivityKind::Custom => Some(2),
            ActivityKind::Other => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub kind: ActivityKind,
    pub name: String,
    pub details: Option<String>,
    pub state: Option<String>,
}

// ---------------------------------------------------------------------------
// Presence state
// ---------------------------------------------------------------------------

/// Last known presence of one identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresenceState {
    pub status: Status,
    pub is_mobile: bool,
    pub is_desktop: bool,
    pub is_web: bool,
    /// Gateway order is preserved.
    pub activities: Vec<Activity>,
    pub raw_user: Option<serde_json::Value>,
}

impl PresenceState {
    /// The single activity a widget should show: Game, then Listening, then
    /// Custom. Ties go to whichever the gateway listed first.
    pub fn headline_activity(&self) -> Option<&Activity> {
        self.activities
            .iter()
            .filter_map(|a| a.kind.priority().map(|p| (p, a)))
            .min_by_key(|(p, _)| *p)
            .map(|(_, a)| a)
    }
}

/// What a subscriber observes for an identity.
#[derive(Debug, Clone, PartialEq)]
pub enum Presence {
    /// No update or seed has been received for this identity yet.
    Unknown,
    Known(Arc<PresenceState>),
}

impl Presence {
    pub fn state(&self) -> Option<&PresenceState> {
        match self {
            Presence::Unknown => None,
            Presence::Known(state) => Some(state),
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Presence::Known(_))
    }
}
