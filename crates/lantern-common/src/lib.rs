pub mod errors;
pub mod id;

pub use errors::{ConfigError, ConnectionError, DecodeError, LanternError};
pub use id::new_correlation_id;

pub type Result<T> = std::result::Result<T, LanternError>;

/// Public Lanyard gateway.
pub const DEFAULT_GATEWAY_URL: &str = "wss://api.lanyard.rest/socket";
