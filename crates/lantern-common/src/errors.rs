use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// A gateway frame that could not be turned into an inbound message.
///
/// Always non-fatal: the frame is logged and dropped.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("presence payload carries no identity")]
    MissingIdentity,

    #[error("invalid presence payload: {0}")]
    Payload(String),
}

/// Anything that takes the upstream socket down. Every variant routes the
/// supervisor into `Reconnecting`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("connect timed out after {0}ms")]
    ConnectTimeout(u64),

    #[error("socket error: {0}")]
    Socket(String),

    #[error("connection closed by remote")]
    Closed,

    #[error("no hello received within {0}ms")]
    HelloTimeout(u64),
}

#[derive(Debug, thiserror::Error)]
pub enum LanternError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("snapshot error: {0}")]
    Snapshot(String),
}
