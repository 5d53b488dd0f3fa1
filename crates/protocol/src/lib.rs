//! Wire types for the recorder control protocol.
//!
//! This crate contains the serde-serializable types exchanged with a remote
//! recording service. Every message is a single JSON object: an IQ-style
//! envelope (`id`, `type`, `from`, `to`) flattened together with a payload
//! selected by its `kind` field.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization/deserialization and builders
//! * 1:1 with the wire: field names match what the service sends
//!
//! Session tracking and command orchestration live in `jr-rs`.

pub mod packet;
pub mod recording;

pub use packet::*;
pub use recording::*;
