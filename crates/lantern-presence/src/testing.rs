//! In-memory gateway and upstream doubles for unit tests.

use std::collections::VecDeque;
use std::future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::{sink, stream};
use lantern_common::ConnectionError;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::registry::Upstream;
use crate::supervisor::{Connector, Transport};

// ---------------------------------------------------------------------------
// Upstream recorder
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct RecordingUpstream {
    ensure_connected: AtomicUsize,
    sync: AtomicUsize,
    shutdown: AtomicUsize,
}

impl RecordingUpstream {
    pub(crate) fn ensure_connected_calls(&self) -> usize {
        self.ensure_connected.load(Ordering::SeqCst)
    }

    pub(crate) fn sync_calls(&self) -> usize {
        self.sync.load(Ordering::SeqCst)
    }

    pub(crate) fn shutdown_calls(&self) -> usize {
        self.shutdown.load(Ordering::SeqCst)
    }
}

impl Upstream for RecordingUpstream {
    fn ensure_connected(&self) {
        self.ensure_connected.fetch_add(1, Ordering::SeqCst);
    }

    fn sync_subscriptions(&self) {
        self.sync.fetch_add(1, Ordering::SeqCst);
    }

    fn shutdown(&self) {
        self.shutdown.fetch_add(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Scripted gateway
// ---------------------------------------------------------------------------

/// What the next connection attempt does. Unscripted attempts accept.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Step {
    Accept,
    Refuse,
    Hang,
}

pub(crate) struct MockConnector {
    script: Arc<Mutex<VecDeque<Step>>>,
    attempts: Arc<AtomicUsize>,
    servers: mpsc::UnboundedSender<ServerEnd>,
}

/// Test-side view of the mock gateway.
pub(crate) struct MockGateway {
    script: Arc<Mutex<VecDeque<Step>>>,
    attempts: Arc<AtomicUsize>,
    servers: mpsc::UnboundedReceiver<ServerEnd>,
}

pub(crate) fn mock_gateway() -> (MockConnector, MockGateway) {
    let script = Arc::new(Mutex::new(VecDeque::new()));
    let attempts = Arc::new(AtomicUsize::new(0));
    let (servers_tx, servers_rx) = mpsc::unbounded_channel();
    (
        MockConnector {
            script: Arc::clone(&script),
            attempts: Arc::clone(&attempts),
            servers: servers_tx,
        },
        MockGateway {
            script,
            attempts,
            servers: servers_rx,
        },
    )
}

impl MockGateway {
    pub(crate) fn script(&self, steps: &[Step]) {
        self.script.lock().unwrap().extend(steps.iter().copied());
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Wait for the client to open the next socket.
    pub(crate) async fn accept(&mut self) -> ServerEnd {
        self.servers.recv().await.expect("connector dropped")
    }

    pub(crate) fn try_accept(&mut self) -> Option<ServerEnd> {
        self.servers.try_recv().ok()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self) -> Result<Transport, ConnectionError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Step::Accept);

        match step {
            Step::Refuse => Err(ConnectionError::Connect("connection refused".into())),
            Step::Hang => future::pending::<Result<Transport, ConnectionError>>().await,
            Step::Accept => {
                let (to_client_tx, to_client_rx) = mpsc::unbounded_channel();
                let (to_server_tx, to_server_rx) = mpsc::unbounded_channel();

                let sink = sink::unfold(to_server_tx, |tx: mpsc::UnboundedSender<String>, frame: String| async move {
                    tx.send(frame).map_err(|_| ConnectionError::Closed)?;
                    Ok::<_, ConnectionError>(tx)
                });
                let stream = stream::unfold(
                    to_client_rx,
                    |mut rx: mpsc::UnboundedReceiver<Result<String, ConnectionError>>| async move {
                        rx.recv().await.map(|item| (item, rx))
                    },
                );

                let _ = self.servers.send(ServerEnd {
                    inbound: Some(to_client_tx),
                    outbound: to_server_rx,
                });
                Ok(Transport {
                    sink: Box::pin(sink),
                    stream: Box::pin(stream),
                })
            }
        }
    }
}

/// Server half of one accepted socket.
pub(crate) struct ServerEnd {
    inbound: Option<mpsc::UnboundedSender<Result<String, ConnectionError>>>,
    outbound: mpsc::UnboundedReceiver<String>,
}

impl ServerEnd {
    pub(crate) fn push_raw(&self, frame: &str) {
        if let Some(tx) = &self.inbound {
            let _ = tx.send(Ok(frame.to_string()));
        }
    }

    pub(crate) fn push(&self, frame: Value) {
        self.push_raw(&frame.to_string());
    }

    pub(crate) fn hello(&self, interval_ms: u64) {
        self.push(json!({ "op": 1, "d": { "heartbeat_interval": interval_ms } }));
    }

    pub(crate) fn presence_update(&self, user_id: &str, status: &str) {
        self.push(json!({
            "op": 0,
            "t": "PRESENCE_UPDATE",
            "d": {
                "user_id": user_id,
                "discord_status": status,
                "active_on_discord_desktop": true,
                "activities": [],
                "discord_user": { "id": user_id }
            }
        }));
    }

    /// Remote close: the client's frame stream ends.
    pub(crate) fn close(&mut self) {
        self.inbound = None;
    }

    pub(crate) fn fail(&self, error: ConnectionError) {
        if let Some(tx) = &self.inbound {
            let _ = tx.send(Err(error));
        }
    }

    /// Next frame the client sent, or `None` once the client dropped its
    /// side of the socket.
    pub(crate) async fn next_frame(&mut self) -> Option<Value> {
        let text = self.outbound.recv().await?;
        Some(serde_json::from_str(&text).expect("client sent invalid json"))
    }
}

pub(crate) fn subscribe_frame(ids: &[&str]) -> Value {
    json!({ "op": 2, "d": { "subscribe_to_ids": ids } })
}

pub(crate) fn heartbeat_frame() -> Value {
    json!({ "op": 3 })
}
