//! Socket abstraction the supervisor drives, plus the WebSocket implementation.

use std::future;
use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use lantern_common::ConnectionError;
use tokio_tungstenite::tungstenite::Message as WsMessage;

pub type FrameSink = Pin<Box<dyn Sink<String, Error = ConnectionError> + Send>>;
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, ConnectionError>> + Send>>;

/// One open socket, split into its text-frame halves. The stream ending or
/// yielding an error means the socket is gone.
pub struct Transport {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

/// Opens sockets to the gateway. The supervisor calls this once per
/// connection attempt.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self) -> Result<Transport, ConnectionError>;
}

// ---------------------------------------------------------------------------
// WebSocket
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> Result<Transport, ConnectionError> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| ConnectionError::Connect(e.to_string()))?;

        let (ws_write, ws_read) = ws_stream.split();

        let sink = ws_write
            .sink_map_err(|e| ConnectionError::Socket(e.to_string()))
            .with(|text: String| {
                future::ready(Ok::<_, ConnectionError>(WsMessage::Text(text.into())))
            });

        // Pings are answered by tungstenite itself; only text frames and the
        // close handshake matter here.
        let stream = ws_read.filter_map(|msg| {
            future::ready(match msg {
                Ok(WsMessage::Text(text)) => Some(Ok(text.as_str().to_owned())),
                Ok(WsMessage::Close(frame)) => {
                    tracing::debug!(frame = ?frame, "Gateway sent close frame");
                    Some(Err(ConnectionError::Closed))
                }
                Ok(_) => None,
                Err(e) => Some(Err(ConnectionError::Socket(e.to_string()))),
            })
        });

        Ok(Transport {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        })
    }
}
