//! Public entry point: one shared gateway connection, many subscribers.

mod dispatch;
mod facade;
mod types;


pub use facade::{PresenceClient, Subscription};
pub use types::{ClientConfig, DEFAULT_GATEWAY_URL};
