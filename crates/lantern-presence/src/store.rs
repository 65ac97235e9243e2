//! Last known presence per identity.

use std::collections::HashMap;
use std::sync::Arc;

use crate::identity::Identity;
use crate::protocol::{Presence, PresenceState};

/// Every stored state carries a version from one counter shared by all
/// identities. Version 0 stands for `Presence::Unknown`.
#[derive(Debug, Default)]
pub struct PresenceStore {
    states: HashMap<Identity, (u64, Arc<PresenceState>)>,
    last_version: u64,
}

impl PresenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, identity: Identity, state: PresenceState) -> (u64, Presence) {
        self.last_version += 1;
        let state = Arc::new(state);
        self.states.insert(identity, (self.last_version, Arc::clone(&state)));
        (self.last_version, Presence::Known(state))
    }

    /// Replace the state for `identity` and return what subscribers should
    /// now observe, with its version.
    pub fn apply_update(&mut self, identity: Identity, state: PresenceState) -> (u64, Presence) {
        self.insert(identity, state)
    }

    /// Pre-populate `identity` from an out-of-band snapshot. Ignored once the
    /// stream has delivered anything for it, since a REST snapshot is never
    /// fresher than the stream. Returns the stored version when applied.
    pub fn seed(&mut self, identity: Identity, state: PresenceState) -> Option<(u64, Presence)> {
        if self.states.contains_key(&identity) {
            return None;
        }
        Some(self.insert(identity, state))
    }

    /// Forget `identity`, e.g. once nobody is subscribed to it.
    pub fn remove(&mut self, identity: &Identity) -> bool {
        self.states.remove(identity).is_some()
    }

    pub fn get_current(&self, identity: &Identity) -> Presence {
        self.versioned(identity).1
    }

    /// Current presence together with its version.
    pub fn versioned(&self, identity: &Identity) -> (u64, Presence) {
        self.states
            .get(identity)
            .map(|(version, state)| (*version, Presence::Known(Arc::clone(state))))
            .unwrap_or((0, Presence::Unknown))
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
