//! Control-plane adapter for a remote conference recording service.
//!
//! A [`Recorder`] drives one recording session of one conference: it sends
//! START/STOP commands through a [`Connection`], tracks the session id the
//! service assigns, and reconciles the service's asynchronous status reports
//! with local state.
//!
//! ```ignore
//! let connection = Arc::new(Connection::new(parts));
//! tokio::spawn({
//!     let conn = Arc::clone(&connection);
//!     async move { conn.run().await }
//! });
//!
//! let recorder = Arc::new(Recorder::new("room@conference.example.com", "recorder.example.com",
//!     Arc::clone(&connection), RecorderConfig::from_env()?));
//! recorder.register();
//!
//! recorder.set_recording("focus@example.com", None, RecordingState::On, Some("/rec")).await;
//! ```

pub mod config;
pub mod error;
pub mod recorder;
pub mod session;

pub use config::{AuthPolicy, RecorderConfig};
pub use error::{ConfigError, RecordingError};
pub use jr_protocol::Status;
pub use jr_runtime::Connection;
pub use recorder::{Dispatch, Recorder, RecordingState};
pub use session::{ApplyOutcome, RecordingSession};
