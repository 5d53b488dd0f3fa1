//! Transport layer: moves JSON packets to and from the recording service.
//!
//! A transport is split into two halves so the connection can send while the
//! read loop runs on its own task:
//!
//! * [`Transport`]: send half, owned by the connection behind a lock
//! * [`TransportReceiver`]: read loop, forwards every inbound packet to the
//!   `message_rx` channel handed to the connection
//!
//! The WebSocket transport carries one JSON packet per text frame.

use std::future::Future;
use std::pin::Pin;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value as JsonValue;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::Result;

/// Send half of a transport.
pub trait Transport: Send {
    /// Sends one packet.
    fn send(&mut self, message: JsonValue) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Read half of a transport.
pub trait TransportReceiver: Send {
    /// Reads until the peer closes, forwarding packets to the message channel.
    fn run(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>;
}

/// Everything a [`Connection`](crate::Connection) needs from a transport.
pub struct TransportParts {
    pub sender: Box<dyn Transport>,
    pub receiver: Box<dyn TransportReceiver>,
    pub message_rx: mpsc::UnboundedReceiver<JsonValue>,
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket transport to a recording service endpoint.
pub struct WebSocketTransport {
    sink: SplitSink<WsStream, Message>,
    stream: SplitStream<WsStream>,
    message_tx: mpsc::UnboundedSender<JsonValue>,
}

impl WebSocketTransport {
    /// Connects to `url` (`ws://` or `wss://`).
    ///
    /// Returns the transport and the receiver that inbound packets are
    /// forwarded to once the read loop runs.
    pub async fn connect(url: &str) -> Result<(Self, mpsc::UnboundedReceiver<JsonValue>)> {
        let (ws, _response) = tokio_tungstenite::connect_async(url).await?;
        tracing::debug!(target = "jr.transport", url, "websocket connected");

        let (sink, stream) = ws.split();
        let (message_tx, message_rx) = mpsc::unbounded_channel();

        Ok((
            Self {
                sink,
                stream,
                message_tx,
            },
            message_rx,
        ))
    }

    /// Splits into the halves consumed by [`Connection::new`](crate::Connection::new).
    pub fn into_transport_parts(self, message_rx: mpsc::UnboundedReceiver<JsonValue>) -> TransportParts {
        TransportParts {
            sender: Box::new(WebSocketSender { sink: self.sink }),
            receiver: Box::new(WebSocketReceiver {
                stream: self.stream,
                message_tx: self.message_tx,
            }),
            message_rx,
        }
    }
}

struct WebSocketSender {
    sink: SplitSink<WsStream, Message>,
}

impl Transport for WebSocketSender {
    fn send(&mut self, message: JsonValue) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let text = serde_json::to_string(&message)?;
            self.sink.send(Message::Text(text.into())).await?;
            Ok(())
        })
    }
}

struct WebSocketReceiver {
    stream: SplitStream<WsStream>,
    message_tx: mpsc::UnboundedSender<JsonValue>,
}

impl TransportReceiver for WebSocketReceiver {
    fn run(mut self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
        Box::pin(async move {
            while let Some(frame) = self.stream.next().await {
                let parsed = match frame? {
                    Message::Text(text) => serde_json::from_str::<JsonValue>(&text),
                    Message::Binary(bytes) => serde_json::from_slice::<JsonValue>(&bytes),
                    Message::Close(_) => break,
                    _ => continue,
                };

                match parsed {
                    Ok(value) => {
                        if self.message_tx.send(value).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(target = "jr.transport", error = %e, "dropping malformed frame");
                    }
                }
            }

            tracing::debug!(target = "jr.transport", "websocket read loop ended");
            Ok(())
        })
    }
}
