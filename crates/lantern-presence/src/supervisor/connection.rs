//! Background task owning the upstream socket, with auto-reconnect.
//!
//! Everything that touches the socket, the heartbeat timer or the connection
//! state happens inside this one task, serialized through a single
//! `select!` loop. Facade calls reach it only as queued commands.

use std::collections::VecDeque;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use lantern_common::{new_correlation_id, ConnectionError};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, watch};
use tokio::time;
use tracing::{debug, info, info_span, warn, Instrument};

use super::handle::SupervisorHandle;
use super::transport::{Connector, FrameSink, Transport};
use super::types::{Command, ConnectionState, SupervisorConfig};
use crate::codec::{self, InboundMessage, OutboundMessage};
use crate::heartbeat::HeartbeatScheduler;
use crate::identity::Identity;
use crate::registry::DesiredSet;

type MessageCallback = Box<dyn FnMut(InboundMessage) + Send>;

/// Why the supervisor left the connected/reconnecting cycle.
enum Stop {
    Shutdown,
    HandlesDropped,
}

/// How one socket's lifetime ended.
enum SessionEnd {
    Stopped(Stop),
    Lost {
        error: ConnectionError,
        /// Whether a hello was received on this socket.
        established: bool,
    },
}

pub struct Supervisor {
    connector: Arc<dyn Connector>,
    config: SupervisorConfig,
    desired: DesiredSet,
    on_message: MessageCallback,
    command_rx: mpsc::UnboundedReceiver<Command>,
    state_tx: watch::Sender<ConnectionState>,
    /// Messages waiting for the connection to reach `Connected`.
    outbox: VecDeque<OutboundMessage>,
    /// Identity set most recently sent on the current socket.
    last_sent: Option<Vec<Identity>>,
    subscriptions_dirty: bool,
}

impl Supervisor {
    /// Spawn the supervisor task on the current tokio runtime.
    ///
    /// `on_message` receives every decoded presence/unknown message in
    /// gateway order. The task starts `Disconnected` and exits once every
    /// `SupervisorHandle` has been dropped.
    pub fn spawn<C, F>(
        connector: C,
        config: SupervisorConfig,
        desired: DesiredSet,
        on_message: F,
    ) -> SupervisorHandle
    where
        C: Connector,
        F: FnMut(InboundMessage) + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        let supervisor = Self {
            connector: Arc::new(connector),
            config,
            desired,
            on_message: Box::new(on_message),
            command_rx,
            state_tx,
            outbox: VecDeque::new(),
            last_sent: None,
            subscriptions_dirty: false,
        };
        tokio::spawn(supervisor.run());

        SupervisorHandle::new(command_tx, state_rx)
    }

    // -----------------------------------------------------------------------
    // Disconnected
    // -----------------------------------------------------------------------

    async fn run(mut self) {
        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                Command::EnsureConnected => match self.maintain().await {
                    Stop::HandlesDropped => break,
                    Stop::Shutdown => self.reset(),
                },
                Command::Send(msg) => self.outbox.push_back(msg),
                // Nothing to sync or shut down while disconnected.
                Command::SyncSubscriptions | Command::Shutdown => {}
            }
        }
        self.set_state(ConnectionState::Disconnected);
        debug!("Presence supervisor stopped");
    }

    fn reset(&mut self) {
        self.outbox.clear();
        self.last_sent = None;
        self.subscriptions_dirty = false;
        self.set_state(ConnectionState::Disconnected);
        info!("Presence connection shut down");
    }

    // -----------------------------------------------------------------------
    // Connect / reconnect cycle
    // -----------------------------------------------------------------------

    /// Keep a socket up until shutdown. Every failure goes through
    /// `Reconnecting` with exponential backoff.
    async fn maintain(&mut self) -> Stop {
        let mut attempt: u32 = 0;

        loop {
            let conn_id = new_correlation_id();
            self.set_state(ConnectionState::Connecting);
            info!(conn = %conn_id, "Connecting to presence gateway");

            let connector = Arc::clone(&self.connector);
            let connect_timeout = self.config.connect_timeout;
            let connecting = async move { time::timeout(connect_timeout, connector.connect()).await };

            let result = tokio::select! {
                biased;
                stop = self.wait_for_stop() => return stop,
                result = connecting => result,
            };

            let error = match result {
                Ok(Ok(transport)) => {
                    self.set_state(ConnectionState::AwaitingHello);
                    let span = info_span!("gateway", conn = %conn_id);
                    match self.drive(transport).instrument(span).await {
                        SessionEnd::Stopped(stop) => return stop,
                        SessionEnd::Lost { error, established } => {
                            if established {
                                attempt = 0;
                            }
                            error
                        }
                    }
                }
                Ok(Err(error)) => error,
                Err(_elapsed) => ConnectionError::ConnectTimeout(connect_timeout.as_millis() as u64),
            };

            attempt = attempt.saturating_add(1);
            let delay = self.config.backoff.delay_for(attempt);
            warn!(
                conn = %conn_id,
                error = %error,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Presence connection lost, reconnecting"
            );
            self.set_state(ConnectionState::Reconnecting { attempt, delay });

            tokio::select! {
                biased;
                stop = self.wait_for_stop() => return stop,
                _ = time::sleep(delay) => {}
            }
        }
    }

    // -----------------------------------------------------------------------
    // Open socket
    // -----------------------------------------------------------------------

    async fn drive(&mut self, transport: Transport) -> SessionEnd {
        let Transport {
            mut sink,
            mut stream,
        } = transport;
        let mut heartbeat = HeartbeatScheduler::new();
        let mut established = false;
        let hello_timeout = self.config.hello_timeout;
        let hello_deadline = time::sleep(hello_timeout);
        tokio::pin!(hello_deadline);
        self.last_sent = None;

        let end = loop {
            tokio::select! {
                biased;
                cmd = self.command_rx.recv() => {
                    if let Some(stop) = self.absorb(cmd) {
                        break SessionEnd::Stopped(stop);
                    }
                }
                frame = stream.next() => match frame {
                    Some(Ok(text)) => self.handle_frame(&text, &mut heartbeat, &mut established),
                    Some(Err(error)) => break SessionEnd::Lost { error, established },
                    None => break SessionEnd::Lost { error: ConnectionError::Closed, established },
                },
                _ = &mut hello_deadline, if !established => {
                    let error = ConnectionError::HelloTimeout(hello_timeout.as_millis() as u64);
                    break SessionEnd::Lost { error, established };
                }
                _ = heartbeat.tick() => {
                    debug!("Sending heartbeat");
                    if let Err(error) = sink.send(codec::encode(&OutboundMessage::Heartbeat)).await {
                        break SessionEnd::Lost { error, established };
                    }
                }
            }

            // Coalesce everything already queued before touching the socket.
            if let Some(stop) = self.drain_commands() {
                break SessionEnd::Stopped(stop);
            }

            if established {
                if let Err(error) = self.flush(&mut sink).await {
                    break SessionEnd::Lost { error, established };
                }
            }
        };

        heartbeat.stop();
        if let SessionEnd::Stopped(_) = end {
            let _ = sink.close().await;
        }
        end
    }

    fn handle_frame(
        &mut self,
        text: &str,
        heartbeat: &mut HeartbeatScheduler,
        established: &mut bool,
    ) {
        let messages = match codec::decode(text) {
            Ok(messages) => messages,
            Err(e) => {
                warn!(error = %e, "Dropping undecodable gateway frame");
                return;
            }
        };

        for msg in messages {
            match msg {
                InboundMessage::Hello { heartbeat_interval } => {
                    heartbeat.start(heartbeat_interval);
                    if *established {
                        debug!(
                            interval_ms = heartbeat_interval.as_millis() as u64,
                            "Heartbeat interval updated"
                        );
                    } else {
                        *established = true;
                        // Fresh socket: the replay supersedes any queued set.
                        self.subscriptions_dirty = true;
                        self.outbox
                            .retain(|m| !matches!(m, OutboundMessage::SubscribeAll { .. }));
                        info!(
                            interval_ms = heartbeat_interval.as_millis() as u64,
                            "Presence gateway ready"
                        );
                    }
                    self.set_state(ConnectionState::Connected { heartbeat_interval });
                }
                other => (self.on_message)(other),
            }
        }
    }

    async fn flush(&mut self, sink: &mut FrameSink) -> Result<(), ConnectionError> {
        if std::mem::take(&mut self.subscriptions_dirty) {
            let identities = self.desired.snapshot();
            let changed = self.last_sent.as_ref() != Some(&identities);
            let fresh_and_empty = self.last_sent.is_none() && identities.is_empty();
            if changed && !fresh_and_empty {
                debug!(count = identities.len(), "Sending subscription set");
                let msg = OutboundMessage::SubscribeAll {
                    identities: identities.clone(),
                };
                sink.send(codec::encode(&msg)).await?;
                self.last_sent = Some(identities);
            }
        }

        while let Some(msg) = self.outbox.pop_front() {
            if let OutboundMessage::SubscribeAll { identities } = &msg {
                self.last_sent = Some(identities.clone());
            }
            sink.send(codec::encode(&msg)).await?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Apply a command that does not need the socket. Returns `Some` when the
    /// command ends the current cycle.
    fn absorb(&mut self, cmd: Option<Command>) -> Option<Stop> {
        match cmd {
            None => Some(Stop::HandlesDropped),
            Some(Command::Shutdown) => Some(Stop::Shutdown),
            Some(Command::EnsureConnected) => None,
            Some(Command::SyncSubscriptions) => {
                self.subscriptions_dirty = true;
                None
            }
            Some(Command::Send(msg)) => {
                self.outbox.push_back(msg);
                None
            }
        }
    }

    async fn wait_for_stop(&mut self) -> Stop {
        loop {
            let cmd = self.command_rx.recv().await;
            if let Some(stop) = self.absorb(cmd) {
                return stop;
            }
        }
    }

    fn drain_commands(&mut self) -> Option<Stop> {
        loop {
            match self.command_rx.try_recv() {
                Ok(cmd) => {
                    if let Some(stop) = self.absorb(Some(cmd)) {
                        return Some(stop);
                    }
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => return Some(Stop::HandlesDropped),
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!(from = ?previous, to = ?state, "Connection state changed");
        }
    }
}
