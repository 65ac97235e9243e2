//! Applies decoded gateway messages to the store and fans them out.
//!
//! Runs on the supervisor task, so messages are handled one at a time in
//! gateway order. Listeners are always run after the hub lock is released;
//! a callback may subscribe or unsubscribe freely.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::codec::InboundMessage;
use crate::delivery::Listener;
use crate::protocol::Presence;
use crate::registry::SubscriptionRegistry;
use crate::store::PresenceStore;
use crate::supervisor::SupervisorHandle;

/// Registry and store, behind one lock.
pub(super) struct Hub {
    pub(super) registry: SubscriptionRegistry,
    pub(super) store: PresenceStore,
}

pub(super) struct Shared {
    hub: Mutex<Hub>,
    pub(super) supervisor: SupervisorHandle,
}

impl Shared {
    pub(super) fn new(hub: Hub, supervisor: SupervisorHandle) -> Self {
        Self {
            hub: Mutex::new(hub),
            supervisor,
        }
    }

    pub(super) fn hub(&self) -> MutexGuard<'_, Hub> {
        self.hub.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(super) fn dispatch(&self, msg: InboundMessage) {
        match msg {
            InboundMessage::PresenceSnapshot { identity, state }
            | InboundMessage::PresenceDelta { identity, state } => {
                let (version, presence, listeners) = {
                    let mut hub = self.hub();
                    let (version, presence) = hub.store.apply_update(identity.clone(), state);
                    (version, presence, hub.registry.listeners_for(&identity))
                };
                debug!(
                    identity = %identity,
                    subscribers = listeners.len(),
                    "Presence update"
                );
                notify(&listeners, version, &presence);
            }
            InboundMessage::Unknown { raw } => {
                debug!(len = raw.len(), "Ignoring unrecognised gateway message");
            }
            // Consumed by the supervisor.
            InboundMessage::Hello { .. } => {}
        }
    }
}

pub(super) fn notify(listeners: &[Arc<Listener>], version: u64, presence: &Presence) {
    for listener in listeners {
        listener.deliver(version, presence.clone());
    }
}
