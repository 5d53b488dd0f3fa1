//! Recording command orchestration.
//!
//! [`Recorder`] turns a caller's desired recording state into START/STOP
//! packets and routes the service's status reports into the tracked
//! [`RecordingSession`].
//!
//! START is a request: the caller waits (bounded by the configured reply
//! timeout) for the reply that carries the new session id. The session is
//! begun on the connection's dispatch task as the reply is correlated, so a
//! status report the service sends right behind its acknowledgement already
//! finds the session. STOP is sent without waiting; the service confirms it
//! later with a STOPPED report.

use std::sync::Arc;
use std::time::Duration;

use jr_protocol::{Action, IqType, Packet, Payload, RecordingIq, Status};
use jr_runtime::{Connection, PacketHandler};
use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::config::{AuthPolicy, RecorderConfig};
use crate::error::RecordingError;
use crate::session::{ApplyOutcome, RecordingSession};

/// Recording state requested by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    On,
    Off,
}

/// What a successful [`Recorder::try_set_recording`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// START acknowledged with INITIATING
    Started { session_id: String },
    /// START was sent but the reply was not a usable acknowledgement
    StartUnconfirmed,
    /// STOP sent for the session
    StopRequested { session_id: String },
    /// Requested state already holds; nothing sent
    Unchanged,
}

/// Recording controller for one conference.
pub struct Recorder {
    room_id: String,
    service_address: String,
    connection: Arc<Connection>,
    auth: AuthPolicy,
    reply_timeout: Duration,
    session: Arc<Mutex<RecordingSession>>,
    /// Serializes caller commands so a START in flight is never raced
    commands: tokio::sync::Mutex<()>,
}

impl Recorder {
    /// Creates a recorder for `room_id` talking to the service at
    /// `service_address`.
    pub fn new(
        room_id: impl Into<String>,
        service_address: impl Into<String>,
        connection: Arc<Connection>,
        config: RecorderConfig,
    ) -> Self {
        let room_id = room_id.into();
        let auth = config.auth_policy();
        if auth == AuthPolicy::Open {
            warn!(target = "jr.recorder", room = %room_id, "no recording token configured; any caller may control recording");
        }

        Self {
            room_id,
            service_address: service_address.into(),
            connection,
            auth,
            reply_timeout: config.reply_timeout(),
            session: Arc::new(Mutex::new(RecordingSession::new())),
            commands: tokio::sync::Mutex::new(()),
        }
    }

    /// Registers this recorder for inbound recording packets on its connection.
    pub fn register(self: &Arc<Self>) {
        self.connection
            .register_handler(Arc::clone(self) as Arc<dyn PacketHandler>);
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn service_address(&self) -> &str {
        &self.service_address
    }

    /// Returns `true` while a session is initiating or running.
    pub fn is_recording(&self) -> bool {
        self.session.lock().is_active()
    }

    pub fn status(&self) -> Status {
        self.session.lock().status()
    }

    pub fn session_id(&self) -> Option<String> {
        self.session.lock().session_id().map(str::to_owned)
    }

    /// Requests recording on or off.
    ///
    /// Returns `false` when the token is rejected or the transport fails.
    /// `true` means the request was dispatched (or nothing needed sending),
    /// not that recording is now active.
    pub async fn set_recording(
        &self,
        from: &str,
        token: Option<&str>,
        state: RecordingState,
        output: Option<&str>,
    ) -> bool {
        match self.try_set_recording(from, token, state, output).await {
            Ok(_) => true,
            Err(RecordingError::Unauthorized) => {
                warn!(target = "jr.recorder", from, ?state, "recording request rejected: token mismatch");
                false
            }
            Err(RecordingError::Transport(e)) => {
                error!(target = "jr.recorder", from, ?state, error = %e, "recording command failed");
                false
            }
        }
    }

    /// Like [`set_recording`](Self::set_recording), reporting what happened.
    pub async fn try_set_recording(
        &self,
        from: &str,
        token: Option<&str>,
        state: RecordingState,
        output: Option<&str>,
    ) -> Result<Dispatch, RecordingError> {
        if !self.auth.authorize(token) {
            return Err(RecordingError::Unauthorized);
        }

        let _command = self.commands.lock().await;
        let active = self.is_recording();

        match (state, active) {
            (RecordingState::On, false) => self.start(from, output).await,
            (RecordingState::Off, true) => self.stop(from).await,
            _ => Ok(Dispatch::Unchanged),
        }
    }

    async fn start(&self, from: &str, output: Option<&str>) -> Result<Dispatch, RecordingError> {
        let packet = Packet::set(
            from,
            &self.service_address,
            Payload::Recording(RecordingIq::start(&self.room_id, output)),
        );

        let session = Arc::clone(&self.session);
        let dispatch = self
            .connection
            .request_with(packet, self.reply_timeout, move |reply| acknowledge_start(&session, &reply))
            .await?;
        Ok(dispatch)
    }

    async fn stop(&self, from: &str) -> Result<Dispatch, RecordingError> {
        let tracked = self.session_id();
        let Some(session_id) = tracked else {
            return Ok(Dispatch::Unchanged);
        };

        let packet = Packet::set(
            from,
            &self.service_address,
            Payload::Recording(RecordingIq::stop(&self.room_id, session_id.as_str())),
        );
        self.connection.send(packet).await?;

        self.session.lock().request_stop();
        info!(target = "jr.recorder", session_id = %session_id, "recording stop requested");

        Ok(Dispatch::StopRequested { session_id })
    }
}

/// Applies a START reply to the session. Runs on the dispatch task while the
/// caller holds the command lock.
fn acknowledge_start(session: &Mutex<RecordingSession>, reply: &Packet) -> Dispatch {
    let Some(iq) = reply.recording().filter(|_| reply.iq_type == IqType::Result) else {
        error!(target = "jr.recorder", ?reply, "unexpected response to START");
        return Dispatch::StartUnconfirmed;
    };

    match (iq.status, iq.session_id.as_deref()) {
        (Status::Initiating, Some(session_id)) if !session_id.is_empty() => {
            session.lock().begin_session(session_id);
            info!(target = "jr.recorder", session_id, "received recording session id");
            Dispatch::Started {
                session_id: session_id.to_string(),
            }
        }
        (status, _) => {
            error!(target = "jr.recorder", %status, ?reply, "unexpected status in START reply");
            Dispatch::StartUnconfirmed
        }
    }
}

impl PacketHandler for Recorder {
    fn accept(&self, packet: &Packet) -> bool {
        packet.recording().is_some()
    }

    fn process(&self, packet: Packet) {
        let Some(iq) = packet.recording() else {
            return;
        };

        let reported_id = iq.session_id.as_deref().unwrap_or_default();
        if (iq.action != Action::Info && packet.iq_type == IqType::Result) || reported_id.is_empty() {
            warn!(target = "jr.recorder", ?packet, "discarded");
            return;
        }

        // A report without a status would leave a live session id behind
        if iq.status == Status::Undefined {
            warn!(target = "jr.recorder", session_id = reported_id, ?packet, "discarded status report without status");
            return;
        }

        let outcome = self.session.lock().try_apply_status(reported_id, iq.status);

        match outcome {
            ApplyOutcome::Applied(status) => {
                info!(target = "jr.recorder", session_id = reported_id, %status, "recording status changed");
                if status == Status::Stopped {
                    info!(target = "jr.recorder", session_id = reported_id, "recording stopped");
                }
            }
            ApplyOutcome::IgnoredUnknownSession => {
                warn!(target = "jr.recorder", session_id = reported_id, ?packet, "status report for unknown session");
            }
            ApplyOutcome::IgnoredNoChange => {
                info!(target = "jr.recorder", session_id = reported_id, status = %iq.status, "ignored status change");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jr_runtime::fake_transport::FakeTransportBuilder;

    fn recorder() -> Recorder {
        let (parts, _controller) = FakeTransportBuilder::new().build();
        Recorder::new(
            "room@conference.example.com",
            "recorder.example.com",
            Arc::new(Connection::new(parts)),
            RecorderConfig::default(),
        )
    }

    fn report(iq_type: IqType, iq: RecordingIq) -> Packet {
        Packet {
            id: "remote-1".to_string(),
            iq_type,
            from: Some("recorder.example.com".to_string()),
            to: None,
            payload: Payload::Recording(iq),
        }
    }

    #[test]
    fn test_accepts_only_recording_packets() {
        let recorder = recorder();
        assert!(recorder.accept(&report(IqType::Set, RecordingIq::info("abc", Status::Started))));
        assert!(!recorder.accept(&Packet::set("a@x", "b@x", Payload::Empty)));
        assert!(!recorder.accept(&Packet::set("a@x", "b@x", Payload::Other)));
    }

    #[test]
    fn test_command_acknowledgement_is_discarded() {
        let recorder = recorder();
        recorder.session.lock().begin_session("abc");

        // A STOP ack that happens to carry a status must not move state
        let mut ack = RecordingIq::stop("room@muc", "abc");
        ack.status = Status::Stopped;
        recorder.process(report(IqType::Result, ack));

        assert_eq!(recorder.status(), Status::Initiating);
        assert_eq!(recorder.session_id().as_deref(), Some("abc"));
    }

    #[test]
    fn test_info_result_is_applied() {
        let recorder = recorder();
        recorder.session.lock().begin_session("abc");

        recorder.process(report(IqType::Result, RecordingIq::info("abc", Status::Started)));
        assert_eq!(recorder.status(), Status::Started);
    }

    #[test]
    fn test_non_info_set_is_applied() {
        let recorder = recorder();
        recorder.session.lock().begin_session("abc");

        let mut iq = RecordingIq::info("abc", Status::Started);
        iq.action = Action::Undefined;
        recorder.process(report(IqType::Set, iq));
        assert_eq!(recorder.status(), Status::Started);
    }

    #[test]
    fn test_report_without_status_is_discarded() {
        let recorder = recorder();
        recorder.session.lock().begin_session("abc");
        recorder.process(report(IqType::Set, RecordingIq::info("abc", Status::Started)));

        let iq: RecordingIq = serde_json::from_value(serde_json::json!({
            "action": "INFO",
            "sessionId": "abc"
        }))
        .unwrap();
        recorder.process(report(IqType::Set, iq));

        assert_eq!(recorder.status(), Status::Started);
        assert_eq!(recorder.session_id().as_deref(), Some("abc"));
        assert!(recorder.is_recording());
    }

    #[test]
    fn test_accessors_report_identity() {
        let recorder = recorder();
        assert_eq!(recorder.room_id(), "room@conference.example.com");
        assert_eq!(recorder.service_address(), "recorder.example.com");
    }

    #[test]
    fn test_report_without_session_id_is_discarded() {
        let recorder = recorder();
        recorder.session.lock().begin_session("abc");

        let mut iq = RecordingIq::info("abc", Status::Stopped);
        iq.session_id = None;
        recorder.process(report(IqType::Set, iq));

        let mut iq = RecordingIq::info("", Status::Stopped);
        iq.action = Action::Info;
        recorder.process(report(IqType::Set, iq));

        assert_eq!(recorder.status(), Status::Initiating);
        assert!(recorder.is_recording());
    }
}
