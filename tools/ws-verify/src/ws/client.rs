//! WebSocket client for one exchange stream subscription.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};
use url::Url;

use crate::source::{FrameSource, SourceError};

/// A connected stream. One connection attempt; the source ends with the
/// connection.
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

impl WsClient {
    /// Connect to the subscription endpoint.
    pub async fn connect(endpoint: &Url) -> Result<Self, SourceError> {
        let (stream, response) = connect_async(endpoint.as_str()).await?;
        info!(status = %response.status(), "WebSocket connected");
        Ok(Self {
            stream,
            closed: false,
        })
    }

    /// Send a close frame. Errors are ignored; the peer may already be gone.
    pub async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            let _ = self.stream.close(None).await;
        }
    }
}

#[async_trait]
impl FrameSource for WsClient {
    async fn next_frame(&mut self) -> Result<Option<String>, SourceError> {
        if self.closed {
            return Ok(None);
        }
        while let Some(msg) = self.stream.next().await {
            match msg? {
                Message::Text(text) => return Ok(Some(text.as_str().to_owned())),
                // tungstenite queues the Pong itself and flushes it on the next read.
                Message::Ping(data) => {
                    debug!(len = data.len(), "Ping");
                }
                Message::Close(frame) => {
                    debug!(?frame, "Server closed the stream");
                    self.closed = true;
                    return Ok(None);
                }
                Message::Binary(data) => {
                    debug!(len = data.len(), "Skipping binary frame");
                }
                Message::Pong(_) | Message::Frame(_) => {}
            }
        }
        self.closed = true;
        Ok(None)
    }
}
