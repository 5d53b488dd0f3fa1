//! Recording session tracking.
//!
//! [`RecordingSession`] holds the status of the single session an adapter
//! manages and the id the service assigned to it. The id is present exactly
//! while the status is INITIATING, STARTED or STOPPING.
//!
//! Status reports are matched by session id before they are applied, so a
//! report for a stale or foreign session can never move local state.

use jr_protocol::Status;

/// Result of offering a status report to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Status changed to the reported one
    Applied(Status),
    /// Report does not belong to the tracked session
    IgnoredUnknownSession,
    /// Report repeats the current status
    IgnoredNoChange,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingSession {
    status: Status,
    session_id: Option<String>,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Returns `true` while a session is initiating or running.
    pub fn is_active(&self) -> bool {
        matches!(self.status, Status::Initiating | Status::Started)
    }

    /// Starts tracking `session_id` in INITIATING.
    ///
    /// Callers check [`is_active`](Self::is_active) first; a running session
    /// is never replaced. `Recorder` does so under its command lock, which is
    /// held until the START reply has been applied.
    pub fn begin_session(&mut self, session_id: impl Into<String>) {
        debug_assert!(!self.is_active(), "session already active");
        self.session_id = Some(session_id.into());
        self.status = Status::Initiating;
    }

    /// Marks the session STOPPING. The id is kept to match the STOPPED report.
    pub fn request_stop(&mut self) {
        self.status = Status::Stopping;
    }

    /// Applies a status report if it targets the tracked session and changes
    /// something.
    pub fn try_apply_status(&mut self, reported_id: &str, reported: Status) -> ApplyOutcome {
        match self.session_id.as_deref() {
            Some(tracked) if !reported_id.is_empty() && tracked == reported_id => {}
            _ => return ApplyOutcome::IgnoredUnknownSession,
        }

        if self.status == reported {
            return ApplyOutcome::IgnoredNoChange;
        }

        self.status = reported;
        if reported == Status::Stopped {
            self.session_id = None;
        }
        ApplyOutcome::Applied(reported)
    }
}
