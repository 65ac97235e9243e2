//! Reference-counted subscription registry.
//!
//! Maps each identity to the listeners interested in it. The set of
//! identities with at least one listener is mirrored into a `DesiredSet`,
//! which the supervisor reads whenever it builds a subscribe message.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::delivery::Listener;
use crate::identity::Identity;

/// Registry-assigned id for one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// The upstream side of the registry: what it asks of the connection when
/// the wanted identities change.
pub trait Upstream: Send + Sync {
    fn ensure_connected(&self);
    fn sync_subscriptions(&self);
    fn shutdown(&self);
}

// ---------------------------------------------------------------------------
// Desired set
// ---------------------------------------------------------------------------

/// Identities that should currently be subscribed upstream.
///
/// Written only by the registry; read by the supervisor at send time.
#[derive(Debug, Clone, Default)]
pub struct DesiredSet(Arc<Mutex<BTreeSet<Identity>>>);

impl DesiredSet {
    fn lock(&self) -> MutexGuard<'_, BTreeSet<Identity>> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn insert(&self, identity: Identity) {
        self.lock().insert(identity);
    }

    pub(crate) fn remove(&self, identity: &Identity) {
        self.lock().remove(identity);
    }

    /// Sorted copy of the current set.
    pub fn snapshot(&self) -> Vec<Identity> {
        self.lock().iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

pub struct SubscriptionRegistry {
    subscribers: HashMap<Identity, Vec<(SubscriberId, Arc<Listener>)>>,
    total: usize,
    next_id: u64,
    desired: DesiredSet,
    upstream: Arc<dyn Upstream>,
}

impl SubscriptionRegistry {
    pub fn new(desired: DesiredSet, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            subscribers: HashMap::new(),
            total: 0,
            next_id: 0,
            desired,
            upstream,
        }
    }

    /// Register `listener` for `identity`. The first listener for an
    /// identity adds it upstream and makes sure a connection exists.
    pub fn subscribe(&mut self, identity: Identity, listener: Arc<Listener>) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;

        let entries = self.subscribers.entry(identity.clone()).or_default();
        let first_for_identity = entries.is_empty();
        entries.push((id, listener));
        self.total += 1;

        if first_for_identity {
            debug!(identity = %identity, "First subscriber, adding upstream");
            self.desired.insert(identity);
            self.upstream.ensure_connected();
            self.upstream.sync_subscriptions();
        }
        id
    }

    /// Remove one subscription. Returns `false` if it was already removed,
    /// in which case nothing changes.
    pub fn unsubscribe(&mut self, identity: &Identity, id: SubscriberId) -> bool {
        let Some(entries) = self.subscribers.get_mut(identity) else {
            return false;
        };
        let Some(pos) = entries.iter().position(|(sid, _)| *sid == id) else {
            return false;
        };
        entries.remove(pos);
        self.total -= 1;

        if entries.is_empty() {
            self.subscribers.remove(identity);
            self.desired.remove(identity);
            debug!(identity = %identity, "Last subscriber gone, removing upstream");

            if self.total == 0 {
                self.upstream.shutdown();
            } else {
                self.upstream.sync_subscriptions();
            }
        }
        true
    }

    /// Listeners for one identity, in subscription order.
    pub fn listeners_for(&self, identity: &Identity) -> Vec<Arc<Listener>> {
        self.subscribers
            .get(identity)
            .map(|entries| entries.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default()
    }

    pub fn refcount(&self, identity: &Identity) -> usize {
        self.subscribers.get(identity).map_or(0, Vec::len)
    }

    pub fn total_refcount(&self) -> usize {
        self.total
    }

    pub fn desired(&self) -> &DesiredSet {
        &self.desired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingUpstream;

    fn noop() -> Arc<Listener> {
        Arc::new(Listener::new(|_| {}))
    }

    fn registry() -> (SubscriptionRegistry, Arc<RecordingUpstream>) {
        let upstream = Arc::new(RecordingUpstream::default());
        let registry = SubscriptionRegistry::new(DesiredSet::default(), upstream.clone());
        (registry, upstream)
    }

    fn ids(set: &DesiredSet) -> Vec<String> {
        set.snapshot().iter().map(Identity::to_string).collect()
    }

    #[test]
    fn first_subscriber_adds_identity_and_connects() {
        let (mut reg, upstream) = registry();
        reg.subscribe("1".into(), noop());

        assert_eq!(ids(reg.desired()), vec!["1"]);
        assert_eq!(upstream.ensure_connected_calls(), 1);
        assert_eq!(upstream.sync_calls(), 1);
    }

    #[test]
    fn second_subscriber_for_same_identity_only_bumps_refcount() {
        let (mut reg, upstream) = registry();
        let id: Identity = "1".into();
        reg.subscribe(id.clone(), noop());
        reg.subscribe(id.clone(), noop());

        assert_eq!(reg.refcount(&id), 2);
        assert_eq!(reg.total_refcount(), 2);
        assert_eq!(upstream.ensure_connected_calls(), 1);
        assert_eq!(upstream.sync_calls(), 1);
    }

    #[test]
    fn removing_last_subscriber_of_one_identity_keeps_connection() {
        let (mut reg, upstream) = registry();
        let a = reg.subscribe("1".into(), noop());
        reg.subscribe("2".into(), noop());

        assert!(reg.unsubscribe(&"1".into(), a));
        assert_eq!(ids(reg.desired()), vec!["2"]);
        assert_eq!(upstream.shutdown_calls(), 0);
        assert_eq!(upstream.sync_calls(), 3);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let (mut reg, upstream) = registry();
        let id: Identity = "1".into();
        let a = reg.subscribe(id.clone(), noop());
        reg.subscribe(id.clone(), noop());

        assert!(reg.unsubscribe(&id, a));
        assert!(!reg.unsubscribe(&id, a));
        assert!(!reg.unsubscribe(&id, a));
        assert_eq!(reg.refcount(&id), 1);
        assert_eq!(reg.total_refcount(), 1);
        assert_eq!(upstream.shutdown_calls(), 0);
    }

    #[test]
    fn unknown_identity_unsubscribe_is_a_noop() {
        let (mut reg, upstream) = registry();
        let a = reg.subscribe("1".into(), noop());
        assert!(!reg.unsubscribe(&"2".into(), a));
        assert_eq!(reg.total_refcount(), 1);
        assert_eq!(upstream.shutdown_calls(), 0);
    }

    #[test]
    fn global_zero_shuts_down_exactly_once() {
        let (mut reg, upstream) = registry();
        let a = reg.subscribe("1".into(), noop());
        let b = reg.subscribe("2".into(), noop());
        let c = reg.subscribe("2".into(), noop());

        reg.unsubscribe(&"1".into(), a);
        reg.unsubscribe(&"2".into(), b);
        reg.unsubscribe(&"2".into(), c);
        // Late duplicate unsubscribes in the same tick.
        reg.unsubscribe(&"2".into(), c);
        reg.unsubscribe(&"1".into(), a);

        assert_eq!(reg.total_refcount(), 0);
        assert!(reg.desired().is_empty());
        assert_eq!(upstream.shutdown_calls(), 1);
    }

    #[test]
    fn resubscribing_after_shutdown_reconnects() {
        let (mut reg, upstream) = registry();
        let a = reg.subscribe("1".into(), noop());
        reg.unsubscribe(&"1".into(), a);
        reg.subscribe("1".into(), noop());

        assert_eq!(upstream.shutdown_calls(), 1);
        assert_eq!(upstream.ensure_connected_calls(), 2);
        assert_eq!(ids(reg.desired()), vec!["1"]);
    }

    #[test]
    fn desired_set_tracks_positive_refcounts() {
        let (mut reg, _upstream) = registry();
        let mut handles = Vec::new();
        for id in ["3", "1", "2", "1", "3"] {
            handles.push((Identity::from(id), reg.subscribe(id.into(), noop())));
        }
        assert_eq!(ids(reg.desired()), vec!["1", "2", "3"]);

        // Drop every "1" and one of the "3"s.
        for (identity, sid) in handles.iter().filter(|(i, _)| i.as_str() == "1") {
            reg.unsubscribe(identity, *sid);
        }
        reg.unsubscribe(&handles[0].0, handles[0].1);

        assert_eq!(ids(reg.desired()), vec!["2", "3"]);
        for (identity, expected) in [("1", 0), ("2", 1), ("3", 1)] {
            assert_eq!(reg.refcount(&identity.into()), expected);
        }
    }

    #[test]
    fn listeners_for_only_returns_that_identity() {
        let (mut reg, _upstream) = registry();
        reg.subscribe("42".into(), noop());
        reg.subscribe("42".into(), noop());
        reg.subscribe("7".into(), noop());

        assert_eq!(reg.listeners_for(&"42".into()).len(), 2);
        assert_eq!(reg.listeners_for(&"7".into()).len(), 1);
        assert!(reg.listeners_for(&"8".into()).is_empty());
    }
}
