//! IQ-style packet envelope.
//!
//! ```json
//! {
//!   "id": "jr7",
//!   "type": "set",
//!   "from": "focus@example.com/focus",
//!   "to": "recorder.example.com",
//!   "kind": "recording",
//!   "action": "START",
//!   "room": "room@conference.example.com",
//!   "output": "/recordings/room"
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::recording::RecordingIq;

/// Packet type, mirroring the four IQ types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IqType {
    Get,
    Set,
    Result,
    Error,
}

impl IqType {
    /// Returns `true` for types that answer an earlier request.
    pub fn is_reply(self) -> bool {
        matches!(self, Self::Result | Self::Error)
    }
}

/// Error details carried by `type: "error"` packets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StanzaError {
    /// Machine-readable condition (e.g. `service-unavailable`)
    pub condition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Packet payload, discriminated by the `kind` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    /// Recording session command or status report
    Recording(RecordingIq),
    /// Error details
    Error(StanzaError),
    /// Bare acknowledgement without a body
    Empty,
    /// Any kind this crate does not model
    #[serde(other)]
    Other,
}

/// A single protocol message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    /// Correlation id; replies echo the id of the request they answer
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub iq_type: IqType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(flatten)]
    pub payload: Payload,
}

impl Packet {
    /// Builds a `set` request. The id is left empty for the connection to assign.
    pub fn set(from: impl Into<String>, to: impl Into<String>, payload: Payload) -> Self {
        Self {
            id: String::new(),
            iq_type: IqType::Set,
            from: Some(from.into()),
            to: Some(to.into()),
            payload,
        }
    }

    /// Builds a `result` reply to this packet, swapping the addresses.
    pub fn result_for(&self, payload: Payload) -> Self {
        Self {
            id: self.id.clone(),
            iq_type: IqType::Result,
            from: self.to.clone(),
            to: self.from.clone(),
            payload,
        }
    }

    /// Builds an `error` reply to this packet.
    pub fn error_for(&self, condition: impl Into<String>, text: Option<String>) -> Self {
        Self {
            id: self.id.clone(),
            iq_type: IqType::Error,
            from: self.to.clone(),
            to: self.from.clone(),
            payload: Payload::Error(StanzaError {
                condition: condition.into(),
                text,
            }),
        }
    }

    /// Returns the recording payload, if this is a recording packet.
    pub fn recording(&self) -> Option<&RecordingIq> {
        match &self.payload {
            Payload::Recording(iq) => Some(iq),
            _ => None,
        }
    }
}
