//! One-line text rendering of a presence.

use lantern_presence::{Activity, ActivityKind, Identity, Presence, PresenceState};

/// `identity status [devices] headline`, e.g.
/// `94490510688792576 online [desktop,mobile] playing Minecraft`.
pub fn describe(identity: &Identity, presence: &Presence) -> String {
    match presence.state() {
        None => format!("{identity} unknown"),
        Some(state) => {
            let mut line = format!("{identity} {} [{}]", state.status, devices(state));
            if let Some(headline) = state.headline_activity().map(headline) {
                line.push(' ');
                line.push_str(&headline);
            }
            line
        }
    }
}

fn devices(state: &PresenceState) -> String {
    let active: Vec<&str> = [
        (state.is_desktop, "desktop"),
        (state.is_mobile, "mobile"),
        (state.is_web, "web"),
    ]
    .into_iter()
    .filter_map(|(on, name)| on.then_some(name))
    .collect();

    if active.is_empty() {
        "-".to_string()
    } else {
        active.join(",")
    }
}

fn headline(activity: &Activity) -> String {
    match activity.kind {
        ActivityKind::Game => format!("playing {}", activity.name),
        ActivityKind::Listening => match &activity.details {
            Some(track) => format!("listening to {track} on {}", activity.name),
            None => format!("listening to {}", activity.name),
        },
        // Custom statuses keep their text in `state`.
        ActivityKind::Custom | ActivityKind::Other => activity
            .state
            .clone()
            .unwrap_or_else(|| activity.name.clone()),
    }
}
