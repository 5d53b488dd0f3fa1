//! Request/reply correlation and packet dispatch.
//!
//! This module sits between a transport and the components that talk to the
//! recording service. It handles:
//! - Assigning unique packet ids
//! - Correlating `result`/`error` replies with pending requests
//! - Enforcing a reply timeout
//! - Routing everything else to registered [`PacketHandler`]s
//!
//! # Message Flow
//!
//! 1. Caller invokes [`Connection::request`] with a packet and a timeout
//! 2. Connection assigns an id and registers a completion under it
//! 3. Packet is serialized and sent via the transport
//! 4. Caller awaits the receiver, bounded by the timeout
//! 5. The dispatch loop receives a reply carrying the same id
//! 6. The request's completion runs on the dispatch task, then its result is
//!    handed over through the oneshot channel
//!
//! Because completions run before the next inbound packet is dispatched, a
//! caller of [`Connection::request_with`] can update shared state from the
//! reply and be sure that any packet sent right behind it observes the update.
//!
//! Packets that are not replies to a pending request (status announcements,
//! acknowledgements of fire-and-forget sends, late replies) go to every
//! handler whose [`PacketHandler::accept`] returns `true`.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use jr_protocol::Packet;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, error, warn};

use crate::error::{Error, Result};
use crate::transport::{Transport, TransportParts, TransportReceiver};

/// Completion for a pending request, run on the dispatch task.
type Completion = Box<dyn FnOnce(Packet) + Send>;

/// Consumer of inbound packets that are not correlated replies.
///
/// Handlers are invoked on the dispatch task and must not block.
pub trait PacketHandler: Send + Sync {
    /// Returns `true` if this handler wants `packet`.
    fn accept(&self, packet: &Packet) -> bool;

    /// Handles an accepted packet.
    fn process(&self, packet: Packet);
}

/// Connection to a recording service.
///
/// Shared across tasks with `Arc`. [`run`](Self::run) must be spawned once
/// for replies and inbound packets to be delivered.
pub struct Connection {
    /// Sequential id counter
    last_id: AtomicU32,
    /// Pending requests keyed by packet id
    callbacks: Arc<Mutex<HashMap<String, Completion>>>,
    sender: Mutex<Box<dyn Transport>>,
    receiver: Mutex<Option<Box<dyn TransportReceiver>>>,
    message_rx: Mutex<Option<mpsc::UnboundedReceiver<Value>>>,
    handlers: RwLock<Vec<Arc<dyn PacketHandler>>>,
}

impl Connection {
    pub fn new(parts: TransportParts) -> Self {
        Self {
            last_id: AtomicU32::new(0),
            callbacks: Arc::new(Mutex::new(HashMap::new())),
            sender: Mutex::new(parts.sender),
            receiver: Mutex::new(Some(parts.receiver)),
            message_rx: Mutex::new(Some(parts.message_rx)),
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Registers a handler for uncorrelated inbound packets.
    pub fn register_handler(&self, handler: Arc<dyn PacketHandler>) {
        self.handlers.write().push(handler);
    }

    fn next_id(&self) -> String {
        format!("jr{}", self.last_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Sends `packet` and waits for the reply carrying the same id.
    ///
    /// Any `result` or `error` reply is returned as-is; interpreting it is up
    /// to the caller.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if no reply arrives within `timeout`
    /// - [`Error::ChannelClosed`] if the connection shuts down first
    /// - transport errors from the send itself
    pub async fn request(&self, packet: Packet, timeout: Duration) -> Result<Packet> {
        self.request_with(packet, timeout, |reply| reply).await
    }

    /// Like [`request`](Self::request), but maps the reply with `on_reply` on
    /// the dispatch task before any later inbound packet is dispatched.
    ///
    /// `on_reply` runs at most once, and never after this call has returned
    /// [`Error::Timeout`].
    pub async fn request_with<T, F>(&self, mut packet: Packet, timeout: Duration, on_reply: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(Packet) -> T + Send + 'static,
    {
        let id = self.next_id();
        packet.id = id.clone();
        let value = serde_json::to_value(&packet)?;

        let (tx, mut rx) = oneshot::channel();
        let completion: Completion = Box::new(move |reply| {
            // Receiver is gone only if the caller was dropped
            let _ = tx.send(on_reply(reply));
        });
        self.callbacks.lock().await.insert(id.clone(), completion);

        if let Err(e) = self.sender.lock().await.send(value).await {
            self.callbacks.lock().await.remove(&id);
            return Err(e);
        }

        match tokio::time::timeout(timeout, &mut rx).await {
            Ok(result) => result.map_err(|_| Error::ChannelClosed),
            Err(_) => {
                if self.callbacks.lock().await.remove(&id).is_none() {
                    // Dispatch claimed the reply as the timer fired
                    return rx.await.map_err(|_| Error::ChannelClosed);
                }
                warn!(target = "jr.connection", id = %id, ?timeout, "request timed out");
                Err(Error::Timeout(timeout))
            }
        }
    }

    /// Sends `packet` without waiting for a reply.
    ///
    /// Any acknowledgement the peer sends back is routed to handlers.
    pub async fn send(&self, mut packet: Packet) -> Result<()> {
        packet.id = self.next_id();
        let value = serde_json::to_value(&packet)?;
        self.sender.lock().await.send(value).await
    }

    /// Run the dispatch loop until the transport closes.
    ///
    /// Pending requests fail with [`Error::ChannelClosed`] once the loop ends.
    pub async fn run(&self) {
        let (Some(receiver), Some(mut message_rx)) =
            (self.receiver.lock().await.take(), self.message_rx.lock().await.take())
        else {
            error!(target = "jr.connection", "run() can only be called once");
            return;
        };

        let transport_handle = tokio::spawn(async move {
            if let Err(e) = receiver.run().await {
                error!(target = "jr.connection", error = %e, "transport error");
            }
        });

        while let Some(value) = message_rx.recv().await {
            match serde_json::from_value::<Packet>(value) {
                Ok(packet) => self.dispatch(packet).await,
                Err(e) => {
                    error!(target = "jr.connection", error = %e, "failed to parse packet");
                }
            }
        }

        debug!(target = "jr.connection", "dispatch loop ended (transport closed)");
        self.callbacks.lock().await.clear();

        let _ = transport_handle.await;
    }

    async fn dispatch(&self, packet: Packet) {
        if packet.iq_type.is_reply() {
            let callback = self.callbacks.lock().await.remove(&packet.id);
            if let Some(complete) = callback {
                complete(packet);
                return;
            }
        }

        let handlers: Vec<Arc<dyn PacketHandler>> = self
            .handlers
            .read()
            .iter()
            .filter(|handler| handler.accept(&packet))
            .cloned()
            .collect();

        if handlers.is_empty() {
            debug!(target = "jr.connection", id = %packet.id, "no handler for packet");
            return;
        }

        for handler in handlers {
            handler.process(packet.clone());
        }
    }
}
