//! Swappable WebSocket transport

use std::pin::Pin;

use async_trait::async_trait;
use futures::{future, Sink, SinkExt, Stream, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

use crate::common::error::SocketError;

/// Outbound half of a live connection, accepting text frames
pub type FrameSink = Pin<Box<dyn Sink<String, Error = SocketError> + Send>>;

/// Inbound half of a live connection. Ends when the connection closes.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, SocketError>> + Send>>;

pub struct Connection {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

impl Connection {
    pub fn new(sink: FrameSink, stream: FrameStream) -> Self {
        Self { sink, stream }
    }
}

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn connect(&self, url: &str) -> Result<Connection, SocketError>;
}

/// `tokio-tungstenite` backed transport
#[derive(Debug, Default, Clone)]
pub struct TungsteniteTransport;

#[async_trait]
impl Transport for TungsteniteTransport {
    async fn connect(&self, url: &str) -> Result<Connection, SocketError> {
        let (ws, response) = connect_async(url)
            .await
            .map_err(|e| SocketError::Connect(e.to_string()))?;
        debug!(status = %response.status(), "WebSocket handshake complete");

        let (sink, stream) = ws.split();

        let sink = sink
            .sink_map_err(SocketError::from)
            .with(|text: String| async move { Ok::<_, SocketError>(Message::Text(text)) });

        // A read error is fatal for tungstenite: surface it once, then end the
        // stream so the driver runs its close path. Control frames are answered
        // by tungstenite itself; only payloads surface.
        let stream = stream
            .scan(false, |failed, frame| {
                if *failed {
                    return future::ready(None);
                }
                *failed = frame.is_err();
                future::ready(Some(frame))
            })
            .filter_map(|frame| async move {
                match frame {
                    Ok(Message::Text(text)) => Some(Ok(text)),
                    Ok(Message::Binary(bytes)) => Some(String::from_utf8(bytes).map_err(|e| {
                        SocketError::Protocol(format!("non UTF-8 frame: {}", e))
                    })),
                    Ok(_) => None,
                    Err(e) => Some(Err(SocketError::from(e))),
                }
            });

        Ok(Connection::new(Box::pin(sink), Box::pin(stream)))
    }
}
