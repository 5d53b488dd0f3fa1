//! Fake transport for unit testing request correlation and packet dispatch.
//!
//! Provides an in-memory peer so the protocol layer can be exercised without a
//! recording service.
//!
//! # Example
//!
//! ```ignore
//! let (parts, controller) = FakeTransportBuilder::new()
//!     .with_responder(|sent| vec![json!({"id": sent["id"], "type": "result", "kind": "empty"})])
//!     .build();
//! let connection = Arc::new(Connection::new(parts));
//!
//! tokio::spawn({
//!     let conn = Arc::clone(&connection);
//!     async move { conn.run().await }
//! });
//!
//! let reply = connection.request(packet, Duration::from_secs(1)).await?;
//! let sent = controller.take_sent().await;
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use jr_protocol::Packet;
use serde_json::Value as JsonValue;
use tokio::sync::{Mutex, mpsc, oneshot};

use crate::error::{Error, Result};
use crate::transport::{Transport, TransportParts, TransportReceiver};

/// Scripted peer behavior: maps every sent packet to the packets sent back.
pub type Responder = Arc<dyn Fn(&JsonValue) -> Vec<JsonValue> + Send + Sync>;

/// Builder for creating fake transport instances.
#[derive(Default)]
pub struct FakeTransportBuilder {
    responder: Option<Responder>,
    fail_sends: bool,
}

impl FakeTransportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers every sent packet with whatever `responder` returns.
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&JsonValue) -> Vec<JsonValue> + Send + Sync + 'static,
    {
        self.responder = Some(Arc::new(responder));
        self
    }

    /// Makes every send fail with [`Error::TransportClosed`].
    pub fn with_send_failure(mut self) -> Self {
        self.fail_sends = true;
        self
    }

    /// Build the fake transport and return both parts and a controller.
    ///
    /// Dropping the controller closes the fake peer.
    pub fn build(self) -> (TransportParts, FakeTransportController) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (message_tx, message_rx) = mpsc::unbounded_channel();
        let (close_tx, close_rx) = oneshot::channel();
        let sent_messages = Arc::new(Mutex::new(Vec::new()));
        let fail_sends = Arc::new(AtomicBool::new(self.fail_sends));

        let sender = FakeTransportSender {
            sent: Arc::clone(&sent_messages),
            fail_sends: Arc::clone(&fail_sends),
            responder: self.responder,
            inbound_tx: inbound_tx.clone(),
        };

        let receiver = FakeTransportReceiver {
            inbound_rx,
            message_tx,
            close_rx,
        };

        let controller = FakeTransportController {
            inbound_tx,
            sent: sent_messages,
            fail_sends,
            close_tx: parking_lot::Mutex::new(Some(close_tx)),
        };

        let parts = TransportParts {
            sender: Box::new(sender),
            receiver: Box::new(receiver),
            message_rx,
        };

        (parts, controller)
    }
}

/// Controller for injecting packets and inspecting sent messages.
pub struct FakeTransportController {
    inbound_tx: mpsc::UnboundedSender<JsonValue>,
    sent: Arc<Mutex<Vec<JsonValue>>>,
    fail_sends: Arc<AtomicBool>,
    close_tx: parking_lot::Mutex<Option<oneshot::Sender<()>>>,
}

impl FakeTransportController {
    /// Inject a raw JSON message as if the peer had sent it.
    pub fn inject(&self, message: JsonValue) {
        let _ = self.inbound_tx.send(message);
    }

    /// Inject a typed packet.
    pub fn inject_packet(&self, packet: &Packet) {
        if let Ok(value) = serde_json::to_value(packet) {
            self.inject(value);
        }
    }

    /// Take all sent messages, clearing the buffer.
    pub async fn take_sent(&self) -> Vec<JsonValue> {
        std::mem::take(&mut *self.sent.lock().await)
    }

    /// Toggles send failures at runtime.
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Ends the receive loop, as if the peer hung up.
    pub fn close(&self) {
        if let Some(tx) = self.close_tx.lock().take() {
            let _ = tx.send(());
        }
    }
}

struct FakeTransportSender {
    sent: Arc<Mutex<Vec<JsonValue>>>,
    fail_sends: Arc<AtomicBool>,
    responder: Option<Responder>,
    inbound_tx: mpsc::UnboundedSender<JsonValue>,
}

impl Transport for FakeTransportSender {
    fn send(&mut self, message: JsonValue) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            if self.fail_sends.load(Ordering::SeqCst) {
                return Err(Error::TransportClosed);
            }

            let replies = self.responder.as_ref().map(|respond| respond(&message)).unwrap_or_default();
            self.sent.lock().await.push(message);

            for reply in replies {
                let _ = self.inbound_tx.send(reply);
            }
            Ok(())
        })
    }
}

struct FakeTransportReceiver {
    inbound_rx: mpsc::UnboundedReceiver<JsonValue>,
    message_tx: mpsc::UnboundedSender<JsonValue>,
    close_rx: oneshot::Receiver<()>,
}

impl TransportReceiver for FakeTransportReceiver {
    fn run(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
        let Self {
            mut inbound_rx,
            message_tx,
            mut close_rx,
        } = *self;

        Box::pin(async move {
            loop {
                tokio::select! {
                    message = inbound_rx.recv() => {
                        let Some(message) = message else { break };
                        if message_tx.send(message).is_err() {
                            break;
                        }
                    }
                    _ = &mut close_rx => break,
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;
    use jr_protocol::{IqType, Payload};
    use serde_json::json;
    use std::time::Duration;

    fn spawn_run(connection: &Arc<Connection>) {
        let conn = Arc::clone(connection);
        tokio::spawn(async move {
            conn.run().await;
        });
    }

    #[tokio::test]
    async fn test_fake_transport_send_capture() {
        let (parts, controller) = FakeTransportBuilder::new()
            .with_responder(|sent| vec![json!({"id": sent["id"], "type": "result", "kind": "empty"})])
            .build();
        let connection = Arc::new(Connection::new(parts));
        spawn_run(&connection);

        let packet = Packet::set("focus@x", "recorder@x", Payload::Empty);
        let reply = connection.request(packet, Duration::from_secs(1)).await.unwrap();
        assert_eq!(reply.iq_type, IqType::Result);
        assert_eq!(reply.payload, Payload::Empty);

        let sent = controller.take_sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["to"], "recorder@x");
        assert_eq!(sent[0]["type"], "set");
        assert_eq!(sent[0]["id"], "jr0");

        assert!(controller.take_sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_fake_transport_send_failure() {
        let (parts, controller) = FakeTransportBuilder::new().with_send_failure().build();
        let connection = Arc::new(Connection::new(parts));
        spawn_run(&connection);

        let packet = Packet::set("focus@x", "recorder@x", Payload::Empty);
        let err = connection.send(packet.clone()).await.unwrap_err();
        assert!(matches!(err, Error::TransportClosed));

        controller.set_fail_sends(false);
        connection.send(packet).await.unwrap();
        assert_eq!(controller.take_sent().await.len(), 1);
    }

    #[tokio::test]
    async fn test_fake_transport_close_ends_run() {
        let (parts, controller) = FakeTransportBuilder::new().build();
        let connection = Arc::new(Connection::new(parts));

        let conn = Arc::clone(&connection);
        let handle = tokio::spawn(async move { conn.run().await });

        controller.close();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("run should end once the peer closes")
            .unwrap();
    }
}
