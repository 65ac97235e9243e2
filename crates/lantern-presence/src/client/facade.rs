//! `PresenceClient` and the `Subscription` guard it hands out.

use std::sync::{Arc, Weak};

use tokio::sync::watch;
use tracing::{debug, info};

use super::dispatch::{self, Hub, Shared};
use super::types::ClientConfig;
use crate::delivery::Listener;
use crate::identity::Identity;
use crate::protocol::{Presence, PresenceState};
use crate::registry::{DesiredSet, SubscriberId, SubscriptionRegistry, Upstream};
use crate::store::PresenceStore;
use crate::supervisor::{ConnectionState, Connector, Supervisor, WsConnector};

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Multiplexes presence subscriptions for any number of identities over one
/// gateway connection.
///
/// Cloning is cheap; clones share the connection, the registry and the
/// store. The connection is opened by the first subscription and closed when
/// the last one is dropped.
#[derive(Clone)]
pub struct PresenceClient {
    shared: Arc<Shared>,
}

impl PresenceClient {
    /// Create a client for the gateway at `config.url`.
    ///
    /// Must be called from within a tokio runtime; the connection supervisor
    /// is spawned onto it.
    pub fn new(config: ClientConfig) -> Self {
        let connector = WsConnector::new(config.url.clone());
        Self::with_connector(config, connector)
    }

    /// Create a client that opens sockets through `connector`.
    pub fn with_connector<C: Connector>(config: ClientConfig, connector: C) -> Self {
        let desired = DesiredSet::default();
        let supervisor_config = config.supervisor();

        let shared = Arc::new_cyclic(|weak: &Weak<Shared>| {
            let weak = weak.clone();
            let supervisor =
                Supervisor::spawn(connector, supervisor_config, desired.clone(), move |msg| {
                    if let Some(shared) = weak.upgrade() {
                        shared.dispatch(msg);
                    }
                });
            let upstream: Arc<dyn Upstream> = Arc::new(supervisor.clone());
            let hub = Hub {
                registry: SubscriptionRegistry::new(desired, upstream),
                store: PresenceStore::new(),
            };
            Shared::new(hub, supervisor)
        });

        info!(url = %config.url, "Presence client ready");
        Self { shared }
    }

    /// Subscribe `on_update` to `identity`.
    ///
    /// The callback runs once right away with the current presence
    /// (`Presence::Unknown` if nothing is known yet), then after every update
    /// until the returned `Subscription` is unsubscribed or dropped. Calls for
    /// one subscription never overlap and never go back to an older state,
    /// even when an update races with `subscribe` itself.
    pub fn subscribe<F>(&self, identity: impl Into<Identity>, on_update: F) -> Subscription
    where
        F: Fn(Presence) + Send + Sync + 'static,
    {
        let identity = identity.into();
        let listener = Arc::new(Listener::new(on_update));

        let (id, (version, current)) = {
            let mut hub = self.shared.hub();
            let id = hub.registry.subscribe(identity.clone(), Arc::clone(&listener));
            (id, hub.store.versioned(&identity))
        };
        listener.deliver(version, current);

        Subscription {
            shared: Arc::clone(&self.shared),
            identity,
            id,
            listener,
        }
    }

    /// Pre-populate `identity` from an out-of-band snapshot (e.g. a REST
    /// fetch). Only applies while nothing has arrived from the gateway for
    /// that identity; existing subscribers are notified when it does.
    pub fn seed(&self, identity: impl Into<Identity>, state: PresenceState) -> bool {
        let identity = identity.into();
        let (version, presence, listeners) = {
            let mut hub = self.shared.hub();
            let Some((version, presence)) = hub.store.seed(identity.clone(), state) else {
                debug!(identity = %identity, "Seed ignored, gateway state already present");
                return false;
            };
            (version, presence, hub.registry.listeners_for(&identity))
        };
        dispatch::notify(&listeners, version, &presence);
        true
    }

    /// Last known presence for `identity`.
    pub fn current(&self, identity: &Identity) -> Presence {
        self.shared.hub().store.get_current(identity)
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.shared.supervisor.current_state()
    }

    /// Observe connection state changes, e.g. to show a "stream degraded"
    /// indicator.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.shared.supervisor.state()
    }

    /// Number of live subscriptions across all identities.
    pub fn subscription_count(&self) -> usize {
        self.shared.hub().registry.total_refcount()
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// Keeps a callback registered. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    shared: Arc<Shared>,
    identity: Identity,
    id: SubscriberId,
    listener: Arc<Listener>,
}

impl Subscription {
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Stop receiving updates. Calling it again is a no-op.
    ///
    /// Once this returns no new call of the callback starts, including
    /// updates already being fanned out on another thread. The last
    /// subscription for an identity also drops its stored presence.
    pub fn unsubscribe(&self) {
        self.listener.close();

        let mut hub = self.shared.hub();
        if !hub.registry.unsubscribe(&self.identity, self.id) {
            return;
        }
        if hub.registry.refcount(&self.identity) == 0 {
            hub.store.remove(&self.identity);
        }
        drop(hub);
        debug!(identity = %self.identity, "Unsubscribed");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("identity", &self.identity)
            .field("id", &self.id)
            .finish()
    }
}
