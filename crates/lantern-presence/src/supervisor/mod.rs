//! Connection supervisor for the presence gateway.
//!
//! Owns the single upstream WebSocket: connect, hello handshake, heartbeats,
//! subscription replay, and auto-reconnect with exponential backoff. The
//! socket is driven by one background task; `SupervisorHandle` is the only
//! way in.

mod connection;
mod handle;
mod transport;
mod types;


pub use connection::Supervisor;
pub use handle::SupervisorHandle;
pub use transport::{Connector, FrameSink, FrameStream, Transport, WsConnector};
pub use types::{Backoff, ConnectionState, SupervisorConfig};
