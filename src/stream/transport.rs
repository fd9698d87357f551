//! WebSocket transport to the signed streaming endpoint.
//!
//! Frames travel as binary messages in both directions. The transport is
//! split into a sink half (audio out) and a stream half (transcript events
//! in) so the send and receive tasks run independently.

use crate::error::{SessionError, SessionResult};
use futures::stream::{SplitSink, SplitStream, StreamExt};
use futures::SinkExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::info;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct StreamingTransport {
    ws: WsStream,
}

impl StreamingTransport {
    /// Open the connection to a signed streaming URL.
    pub async fn connect(signed_url: &str) -> SessionResult<Self> {
        let (ws, _response) = connect_async(signed_url)
            .await
            .map_err(|e| SessionError::Connection(e.to_string()))?;
        info!("streaming transport connected");
        Ok(Self { ws })
    }

    pub fn split(self) -> (TransportSink, TransportStream) {
        let (sink, stream) = self.ws.split();
        (TransportSink { sink }, TransportStream { stream })
    }
}

pub struct TransportSink {
    sink: SplitSink<WsStream, Message>,
}

impl TransportSink {
    pub async fn send_frame(&mut self, frame: Vec<u8>) -> SessionResult<()> {
        self.sink
            .send(Message::Binary(frame))
            .await
            .map_err(|e| SessionError::Connection(e.to_string()))
    }

    /// Close the outbound half. Errors are ignored; the peer may already
    /// have gone away.
    pub async fn close(&mut self) {
        let _ = self.sink.send(Message::Close(None)).await;
        let _ = self.sink.close().await;
    }
}

/// What the receive loop sees, with close-cause classification applied.
#[derive(Debug)]
pub enum TransportEvent {
    Frame(Vec<u8>),
    Closed { normal: bool, reason: String },
    Failed(String),
}

pub struct TransportStream {
    stream: SplitStream<WsStream>,
}

impl TransportStream {
    /// Next transport event. Keepalive frames are consumed internally.
    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        loop {
            return match self.stream.next().await {
                Some(Ok(Message::Binary(data))) => Some(TransportEvent::Frame(data)),
                Some(Ok(Message::Close(frame))) => {
                    let (normal, reason) = match frame {
                        Some(f) => (f.code == CloseCode::Normal, f.reason.to_string()),
                        None => (true, String::new()),
                    };
                    Some(TransportEvent::Closed { normal, reason })
                }
                // Ping/pong/text keepalives are not part of the event stream.
                Some(Ok(_)) => continue,
                Some(Err(e)) => Some(TransportEvent::Failed(e.to_string())),
                None => Some(TransportEvent::Closed {
                    normal: false,
                    reason: "connection ended without close frame".to_string(),
                }),
            };
        }
    }
}
