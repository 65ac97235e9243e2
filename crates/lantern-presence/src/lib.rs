//! Presence multiplexing client for a Lanyard-style gateway.
//!
//! One WebSocket connection, any number of subscribers per identity. See
//! [`PresenceClient`] for the entry point.

pub mod client;
pub mod codec;
pub mod delivery;
pub mod heartbeat;
pub mod identity;
pub mod protocol;
pub mod registry;
pub mod store;
pub mod supervisor;

#[cfg(test)]
mod testing;

pub use client::{ClientConfig, PresenceClient, Subscription, DEFAULT_GATEWAY_URL};
pub use codec::{parse_presence, InboundMessage, OutboundMessage};
pub use identity::Identity;
pub use protocol::{Activity, ActivityKind, Presence, PresenceState, Status};
pub use supervisor::{ConnectionState, Connector, Transport, WsConnector};
