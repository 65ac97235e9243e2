//! Cloneable handle to the supervisor task.

use tokio::sync::{mpsc, watch};

use super::types::{Command, ConnectionState};
use crate::codec::OutboundMessage;
use crate::registry::Upstream;

/// Handle for driving the supervisor task.
///
/// Every method is non-blocking: it only enqueues a command for the
/// background task. If the task is gone the command is silently dropped.
#[derive(Clone)]
pub struct SupervisorHandle {
    command_tx: mpsc::UnboundedSender<Command>,
    state_rx: watch::Receiver<ConnectionState>,
}

impl SupervisorHandle {
    pub(crate) fn new(
        command_tx: mpsc::UnboundedSender<Command>,
        state_rx: watch::Receiver<ConnectionState>,
    ) -> Self {
        Self {
            command_tx,
            state_rx,
        }
    }

    /// Open the socket unless one is already connecting or connected.
    pub fn ensure_connected(&self) {
        let _ = self.command_tx.send(Command::EnsureConnected);
    }

    /// Resend the desired identity set if it differs from what the gateway
    /// last received.
    pub fn sync_subscriptions(&self) {
        let _ = self.command_tx.send(Command::SyncSubscriptions);
    }

    /// Send a message, queueing it until the connection reaches `Connected`.
    pub fn send(&self, msg: OutboundMessage) {
        let _ = self.command_tx.send(Command::Send(msg));
    }

    /// Close the socket, stop heartbeats and cancel pending reconnects.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(Command::Shutdown);
    }

    /// Observe connection state changes.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    pub fn current_state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }
}

impl Upstream for SupervisorHandle {
    fn ensure_connected(&self) {
        SupervisorHandle::ensure_connected(self);
    }

    fn sync_subscriptions(&self) {
        SupervisorHandle::sync_subscriptions(self);
    }

    fn shutdown(&self) {
        SupervisorHandle::shutdown(self);
    }
}
