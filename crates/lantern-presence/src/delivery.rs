//! Per-subscriber delivery.
//!
//! Presence for one identity can reach a subscriber from the supervisor task
//! (gateway updates) and from caller threads (`subscribe`, `seed`) at the
//! same time. Each `Listener` owns a small mailbox so its callback runs one
//! call at a time, sees store versions in increasing order, and starts no new
//! call once it has been closed.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use crate::protocol::Presence;

type Callback = Box<dyn Fn(Presence) + Send + Sync>;

#[derive(Default)]
struct Mailbox {
    queue: VecDeque<Presence>,
    last_version: Option<u64>,
    running: bool,
    closed: bool,
}

/// One subscriber's callback plus its pending deliveries.
pub struct Listener {
    callback: Callback,
    mailbox: Mutex<Mailbox>,
}

impl Listener {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(Presence) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
            mailbox: Mutex::new(Mailbox::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Mailbox> {
        self.mailbox.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Hand `presence`, stamped with its store `version`, to the callback.
    ///
    /// Versions at or below the last one accepted are dropped. If another
    /// thread is already running this listener, the item is queued for it and
    /// this call returns at once; otherwise the queue is drained here. No lock
    /// is held while the callback runs, so it may subscribe, unsubscribe or
    /// seed freely.
    pub fn deliver(&self, version: u64, presence: Presence) {
        {
            let mut mailbox = self.lock();
            if mailbox.closed || mailbox.last_version.is_some_and(|last| version <= last) {
                return;
            }
            mailbox.last_version = Some(version);
            mailbox.queue.push_back(presence);
            if mailbox.running {
                return;
            }
            mailbox.running = true;
        }

        let _unwind = ResetOnUnwind(self);
        loop {
            let next = {
                let mut mailbox = self.lock();
                match mailbox.queue.pop_front() {
                    Some(presence) if !mailbox.closed => presence,
                    _ => {
                        mailbox.queue.clear();
                        mailbox.running = false;
                        return;
                    }
                }
            };
            (self.callback)(next);
        }
    }

    /// Drop anything queued and refuse further deliveries. A call already
    /// in progress on another thread runs to completion.
    pub fn close(&self) {
        let mut mailbox = self.lock();
        mailbox.closed = true;
        mailbox.queue.clear();
    }
}

/// Releases the running flag if a callback panics mid-drain.
struct ResetOnUnwind<'a>(&'a Listener);

impl Drop for ResetOnUnwind<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let mut mailbox = self.0.lock();
            mailbox.queue.clear();
            mailbox.running = false;
        }
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mailbox = self.lock();
        f.debug_struct("Listener")
            .field("queued", &mailbox.queue.len())
            .field("last_version", &mailbox.last_version)
            .field("closed", &mailbox.closed)
            .finish()
    }
}
