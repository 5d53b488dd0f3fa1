//! Runtime plumbing for the recorder control protocol.
//!
//! * [`transport`]: byte-level send/receive halves and the WebSocket transport
//! * [`connection`]: request/reply correlation and inbound packet dispatch
//! * [`fake_transport`]: in-memory transport for tests

pub mod connection;
pub mod error;
pub mod fake_transport;
pub mod transport;

/// Default time to wait for a correlated reply.
pub const DEFAULT_REPLY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

pub use connection::{Connection, PacketHandler};
pub use error::{Error, Result};
pub use transport::{Transport, TransportParts, TransportReceiver, WebSocketTransport};
