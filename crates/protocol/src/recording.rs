//! Recording session payload.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Command carried by a recording packet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Start,
    Stop,
    /// Status announcement from the service
    Info,
    #[default]
    Undefined,
}

/// Recording status as reported by the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    Undefined,
    Initiating,
    Started,
    Stopping,
    Stopped,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Undefined => "UNDEFINED",
            Self::Initiating => "INITIATING",
            Self::Started => "STARTED",
            Self::Stopping => "STOPPING",
            Self::Stopped => "STOPPED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of a `kind: "recording"` packet.
///
/// Empty strings in `sessionId` are read as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingIq {
    #[serde(default)]
    pub action: Action,
    /// Conference room the command is scoped to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    /// Session identifier assigned by the service
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub session_id: Option<String>,
    /// Requested output location for START
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default)]
    pub status: Status,
}

impl RecordingIq {
    /// START command for `room`.
    pub fn start(room: impl Into<String>, output: Option<&str>) -> Self {
        Self {
            action: Action::Start,
            room: Some(room.into()),
            output: output.map(str::to_owned),
            ..Self::default()
        }
    }

    /// STOP command for the session `session_id` in `room`.
    pub fn stop(room: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            action: Action::Stop,
            room: Some(room.into()),
            session_id: Some(session_id.into()),
            ..Self::default()
        }
    }

    /// INFO status announcement.
    pub fn info(session_id: impl Into<String>, status: Status) -> Self {
        Self {
            action: Action::Info,
            session_id: Some(session_id.into()),
            status,
            ..Self::default()
        }
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}
