//! Device telemetry session.
//!
//! Owns the pod's connection lifecycle and the fused sensor state:
//!
//! ```text
//!  DISCONNECTED ──connect()──▶ CONNECTING ──handshake ok──▶ INTERROGATING
//!        ▲                         │                              │
//!        │                 handshake fails            identity + subscriptions
//!        │                         ▼                              ▼
//!        └────────────────── DISCONNECTED          CONNECTED ──disconnect()──▶
//!                                                      │        DISCONNECTING ──▶ DISCONNECTED
//!                                              liveness timeout
//!                                                      ▼
//!                                              LOST_CONNECTION ──connect()──▶ CONNECTING
//! ```
//!
//! All mutation happens on the single dispatch thread; long-running
//! transport calls resolve before the next callback runs, so no locking
//! is needed.  A notification that straggles in after teardown is
//! ignored by the [`is_active`](DeviceSession::is_active) guard.

use log::{info, warn};

use crate::actuation::{self, SPEAKER_MODE_SAMPLE, SpeakerSample};
use crate::app::ports::{Attribute, DeviceTransport, SUBSCRIBED_SERVICES};
use crate::config::SystemConfig;
use crate::error::{Error, Result};
use crate::fusion::{DeviceEvent, ResetKind, SensorEvent, SensorSnapshot};

// ---------------------------------------------------------------------------
// Connection state
// ---------------------------------------------------------------------------

/// Lifecycle state of the device link.  Owned exclusively by
/// [`DeviceSession`]; everything else only reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Interrogating,
    Connected,
    Disconnecting,
    /// The liveness monitor declared the pod out of range.  Identity and
    /// snapshot survive; `connect()` resumes with a fresh handshake.
    LostConnection,
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Static identity read from the pod during interrogation.
///
/// `name` and `token` double as draft fields: the presentation layer may
/// edit them in place and later push them back with
/// [`write_name`](DeviceSession::write_name) /
/// [`write_token`](DeviceSession::write_token).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub serial: String,
    pub name: String,
    pub firmware: String,
    pub token: String,
}

// ---------------------------------------------------------------------------
// DeviceSession
// ---------------------------------------------------------------------------

/// The device telemetry session.
pub struct DeviceSession {
    state: ConnectionState,
    identity: DeviceIdentity,
    snapshot: SensorSnapshot,
    button_pressed: bool,
    error: Option<Error>,
    warning: Option<String>,
    /// Wall-clock (ms) of the last accepted device event; the liveness
    /// monitor compares this against its timeout.
    last_event_ms: u64,
}

impl Default for DeviceSession {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceSession {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            identity: DeviceIdentity::default(),
            snapshot: SensorSnapshot::default(),
            button_pressed: false,
            error: None,
            warning: None,
            last_event_ms: 0,
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn snapshot(&self) -> &SensorSnapshot {
        &self.snapshot
    }

    pub fn error(&self) -> Option<Error> {
        self.error
    }

    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    pub fn button_pressed(&self) -> bool {
        self.button_pressed
    }

    /// True while device events should be folded into the snapshot.
    pub fn is_active(&self) -> bool {
        matches!(
            self.state,
            ConnectionState::Interrogating | ConnectionState::Connected
        )
    }

    pub(crate) fn last_event_ms(&self) -> u64 {
        self.last_event_ms
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Handshake, interrogate, subscribe.
    ///
    /// Legal from `Disconnected` and `LostConnection` only.  On handshake
    /// failure the session returns to `Disconnected` with
    /// [`Error::Handshake`] recorded; attribute-read and subscription
    /// failures after a good handshake are non-fatal.
    pub fn connect(
        &mut self,
        transport: &mut impl DeviceTransport,
        config: &SystemConfig,
        now_ms: u64,
    ) -> Result<()> {
        if !matches!(
            self.state,
            ConnectionState::Disconnected | ConnectionState::LostConnection
        ) {
            warn!("connect() ignored in {:?}", self.state);
            return Err(Error::DeviceIo("session already active"));
        }

        self.state = ConnectionState::Connecting;
        self.error = None;
        info!("pod handshake starting");

        let serial = match transport.handshake() {
            Ok(serial) => serial,
            Err(e) => {
                warn!("handshake failed: {e}");
                self.state = ConnectionState::Disconnected;
                self.error = Some(Error::Handshake);
                return Err(Error::Handshake);
            }
        };

        self.state = ConnectionState::Interrogating;
        self.identity.serial = serial;
        info!("interrogating pod {}", self.identity.serial);

        self.identity.name = self.read_or_empty(transport, Attribute::Name);
        self.identity.firmware = self.read_or_empty(transport, Attribute::Firmware);
        self.identity.token = self.read_or_empty(transport, Attribute::CloudToken);

        if !config
            .known_firmware_versions
            .iter()
            .any(|v| *v == self.identity.firmware)
        {
            let latest = config
                .known_firmware_versions
                .first()
                .map_or("unknown", String::as_str);
            self.warning = Some(format!(
                "outdated firmware {}, please upgrade to {latest}",
                self.identity.firmware
            ));
            warn!("{}", self.warning.as_deref().unwrap_or_default());
        }

        for service in SUBSCRIBED_SERVICES {
            if let Err(e) = transport.start_service(service) {
                warn!("could not start {service:?}: {e}");
            }
        }

        // Audible "I'm yours now" — best-effort.
        let _ = transport.configure_speaker(SPEAKER_MODE_SAMPLE);
        let _ = transport.play_sample(SpeakerSample::Ding);

        self.state = ConnectionState::Connected;
        self.last_event_ms = now_ms;
        info!(
            "pod connected: name={} firmware={}",
            self.identity.name, self.identity.firmware
        );
        Ok(())
    }

    /// Park the pod visibly, close the link, clear everything.
    pub fn disconnect(&mut self, transport: &mut impl DeviceTransport) {
        if self.state == ConnectionState::Disconnected {
            return;
        }
        self.state = ConnectionState::Disconnecting;
        info!("pod disconnecting");

        let _ = transport.set_led(actuation::SHUTDOWN_PATTERN);
        transport.close();

        self.identity = DeviceIdentity::default();
        self.snapshot.reset(ResetKind::Full);
        self.button_pressed = false;
        self.error = None;
        self.warning = None;
        self.last_event_ms = 0;
        self.state = ConnectionState::Disconnected;
    }

    // ── Event dispatch ────────────────────────────────────────

    /// Fold one pod notification into the session.
    ///
    /// Events arriving outside an active session (a read completing
    /// after teardown, say) are dropped.
    pub fn handle_event(
        &mut self,
        event: DeviceEvent,
        transport: &mut impl DeviceTransport,
        now_ms: u64,
    ) {
        if !self.is_active() {
            return;
        }

        match event {
            DeviceEvent::Button { pressed: true } => {
                self.button_pressed = true;
                self.error = None;
                let _ = transport.set_led(actuation::IDENTIFY);
            }
            DeviceEvent::Button { pressed: false } => {
                self.button_pressed = false;
                let _ = transport.set_led(actuation::LedCommand::Off);
            }
            DeviceEvent::Sensor(sensor_event) => {
                if let SensorEvent::Tap { direction, count } = sensor_event {
                    info!("tap detected: direction={direction} count={count}");
                }
                if matches!(sensor_event, SensorEvent::Unknown(_)) {
                    self.error.get_or_insert(Error::UnrecognizedEvent);
                }
                self.snapshot.apply(&sensor_event);
                self.last_event_ms = now_ms;
            }
        }
    }

    // ── Identity write-back ───────────────────────────────────

    /// Edit the draft name.  Takes effect on the pod only via
    /// [`write_name`](Self::write_name).
    pub fn set_name(&mut self, name: &str) {
        self.identity.name = name.to_string();
    }

    /// Edit the draft token.
    pub fn set_token(&mut self, token: &str) {
        self.identity.token = token.to_string();
    }

    /// Push the draft name to the pod.  Empty names are a guarded no-op.
    pub fn write_name(&mut self, transport: &mut impl DeviceTransport) -> Result<()> {
        if !self.is_active() {
            return Err(self.raise(Error::DeviceIo("name write without session")));
        }
        if self.identity.name.is_empty() {
            return Ok(());
        }
        transport
            .write_attribute(Attribute::Name, &self.identity.name)
            .map_err(|e| {
                warn!("name write failed: {e}");
                self.raise(Error::DeviceIo("name write"))
            })
    }

    /// Push the draft token to the pod.  No emptiness guard — clearing
    /// the token is a legitimate operation.
    pub fn write_token(&mut self, transport: &mut impl DeviceTransport) -> Result<()> {
        if !self.is_active() {
            return Err(self.raise(Error::DeviceIo("token write without session")));
        }
        transport
            .write_attribute(Attribute::CloudToken, &self.identity.token)
            .map_err(|e| {
                warn!("token write failed: {e}");
                self.raise(Error::DeviceIo("token write"))
            })
    }

    // ── Internal (crate) ──────────────────────────────────────

    /// Record a local error and hand it back for propagation.
    pub(crate) fn raise(&mut self, error: Error) -> Error {
        self.error = Some(error);
        error
    }

    /// Liveness verdict: the pod is out of range.  The link is assumed
    /// dead, identity and snapshot survive for a resumed `connect()`.
    pub(crate) fn mark_lost(&mut self) {
        warn!("pod silent beyond liveness window, declaring lost");
        self.state = ConnectionState::LostConnection;
        self.error = Some(Error::Liveness);
    }

    /// Publish-cadence hygiene: clear the vibration accumulator.
    pub(crate) fn tick_reset(&mut self) {
        self.snapshot.reset(ResetKind::Tick);
    }

    fn read_or_empty(&mut self, transport: &mut impl DeviceTransport, attr: Attribute) -> String {
        match transport.read_attribute(attr) {
            Ok(value) => value,
            Err(e) => {
                warn!("interrogation read failed: {e}");
                self.error = Some(Error::DeviceIo("interrogation read"));
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuation::LedCommand;
    use crate::app::ports::{SensorService, TransportError};
    use std::collections::VecDeque;

    // Minimal scripted transport; integration tests carry a fuller one.
    struct StubPod {
        handshake_ok: bool,
        write_ok: bool,
        queued: VecDeque<DeviceEvent>,
        led_writes: Vec<LedCommand>,
        started: Vec<SensorService>,
        closed: bool,
    }

    impl StubPod {
        fn new() -> Self {
            Self {
                handshake_ok: true,
                write_ok: true,
                queued: VecDeque::new(),
                led_writes: Vec::new(),
                started: Vec::new(),
                closed: false,
            }
        }
    }

    impl DeviceTransport for StubPod {
        fn handshake(&mut self) -> core::result::Result<String, TransportError> {
            if self.handshake_ok {
                Ok("SN-0042".to_string())
            } else {
                Err(TransportError::HandshakeRejected)
            }
        }

        fn close(&mut self) {
            self.closed = true;
        }

        fn read_attribute(
            &mut self,
            attr: Attribute,
        ) -> core::result::Result<String, TransportError> {
            Ok(match attr {
                Attribute::Name => "thingy-01".to_string(),
                Attribute::Firmware => "2.1".to_string(),
                Attribute::CloudToken => "abc:typeA:orgA".to_string(),
            })
        }

        fn write_attribute(
            &mut self,
            attr: Attribute,
            _value: &str,
        ) -> core::result::Result<(), TransportError> {
            if self.write_ok {
                Ok(())
            } else {
                Err(TransportError::WriteFailed(attr))
            }
        }

        fn start_service(
            &mut self,
            service: SensorService,
        ) -> core::result::Result<(), TransportError> {
            self.started.push(service);
            Ok(())
        }

        fn set_led(&mut self, command: LedCommand) -> core::result::Result<(), TransportError> {
            self.led_writes.push(command);
            Ok(())
        }

        fn configure_speaker(&mut self, _mode: u8) -> core::result::Result<(), TransportError> {
            Ok(())
        }

        fn play_sample(
            &mut self,
            _sample: SpeakerSample,
        ) -> core::result::Result<(), TransportError> {
            Ok(())
        }

        fn poll_event(&mut self) -> Option<DeviceEvent> {
            self.queued.pop_front()
        }
    }

    fn connected() -> (DeviceSession, StubPod) {
        let mut session = DeviceSession::new();
        let mut pod = StubPod::new();
        session
            .connect(&mut pod, &SystemConfig::default(), 0)
            .unwrap();
        (session, pod)
    }

    #[test]
    fn connect_interrogates_and_subscribes() {
        let (session, pod) = connected();
        assert_eq!(session.state(), ConnectionState::Connected);
        assert_eq!(session.identity().serial, "SN-0042");
        assert_eq!(session.identity().name, "thingy-01");
        assert_eq!(session.identity().firmware, "2.1");
        assert_eq!(session.identity().token, "abc:typeA:orgA");
        assert_eq!(pod.started.len(), SUBSCRIBED_SERVICES.len());
        assert!(session.warning().is_none());
    }

    #[test]
    fn handshake_failure_returns_to_disconnected() {
        let mut session = DeviceSession::new();
        let mut pod = StubPod::new();
        pod.handshake_ok = false;

        let result = session.connect(&mut pod, &SystemConfig::default(), 0);
        assert_eq!(result, Err(Error::Handshake));
        assert_eq!(session.state(), ConnectionState::Disconnected);
        assert_eq!(session.error(), Some(Error::Handshake));
    }

    #[test]
    fn unknown_firmware_raises_warning_not_error() {
        let config = SystemConfig {
            known_firmware_versions: vec!["9.9".to_string()],
            ..SystemConfig::default()
        };

        let mut session = DeviceSession::new();
        let mut pod = StubPod::new();
        session.connect(&mut pod, &config, 0).unwrap();

        assert_eq!(session.state(), ConnectionState::Connected);
        assert!(session.warning().unwrap().contains("outdated firmware"));
        assert!(session.error().is_none());
    }

    #[test]
    fn disconnect_clears_everything() {
        let (mut session, mut pod) = connected();
        session.handle_event(
            DeviceEvent::Sensor(SensorEvent::Temperature(20.0)),
            &mut pod,
            100,
        );

        session.disconnect(&mut pod);
        assert_eq!(session.state(), ConnectionState::Disconnected);
        assert!(pod.closed);
        assert_eq!(*session.identity(), DeviceIdentity::default());
        assert_eq!(session.snapshot().heartbeat, 0);
        assert!(
            pod.led_writes.contains(&actuation::SHUTDOWN_PATTERN),
            "shutdown pattern must be written before the link closes"
        );
    }

    #[test]
    fn events_fold_and_stamp_liveness() {
        let (mut session, mut pod) = connected();
        session.handle_event(
            DeviceEvent::Sensor(SensorEvent::Humidity(55.0)),
            &mut pod,
            1234,
        );
        assert_eq!(session.snapshot().humidity_pct, Some(55.0));
        assert_eq!(session.snapshot().heartbeat, 1);
        assert_eq!(session.last_event_ms(), 1234);
    }

    #[test]
    fn events_after_teardown_are_ignored() {
        let (mut session, mut pod) = connected();
        session.disconnect(&mut pod);

        session.handle_event(
            DeviceEvent::Sensor(SensorEvent::Temperature(99.0)),
            &mut pod,
            5000,
        );
        assert_eq!(session.snapshot().heartbeat, 0);
        assert!(session.snapshot().temperature_c.is_none());
    }

    #[test]
    fn button_press_identifies_and_clears_error() {
        let (mut session, mut pod) = connected();
        session.raise(Error::Maintenance);

        session.handle_event(DeviceEvent::Button { pressed: true }, &mut pod, 10);
        assert!(session.button_pressed());
        assert!(session.error().is_none());
        assert_eq!(pod.led_writes.last(), Some(&actuation::IDENTIFY));

        session.handle_event(DeviceEvent::Button { pressed: false }, &mut pod, 20);
        assert!(!session.button_pressed());
        assert_eq!(pod.led_writes.last(), Some(&LedCommand::Off));
    }

    #[test]
    fn empty_name_write_is_a_no_op() {
        let (mut session, mut pod) = connected();
        session.set_name("");
        assert_eq!(session.write_name(&mut pod), Ok(()));
    }

    #[test]
    fn failed_writes_surface_device_io() {
        let (mut session, mut pod) = connected();
        pod.write_ok = false;

        session.set_name("renamed");
        assert!(matches!(
            session.write_name(&mut pod),
            Err(Error::DeviceIo(_))
        ));
        assert!(matches!(session.error(), Some(Error::DeviceIo(_))));
    }

    #[test]
    fn writes_without_session_fail() {
        let mut session = DeviceSession::new();
        let mut pod = StubPod::new();
        assert!(matches!(
            session.write_token(&mut pod),
            Err(Error::DeviceIo(_))
        ));
    }

    #[test]
    fn connect_resumes_from_lost_connection() {
        let (mut session, mut pod) = connected();
        session.handle_event(DeviceEvent::Sensor(SensorEvent::Temperature(20.0)), &mut pod, 1);
        session.mark_lost();
        assert_eq!(session.state(), ConnectionState::LostConnection);
        assert_eq!(session.error(), Some(Error::Liveness));

        session
            .connect(&mut pod, &SystemConfig::default(), 9000)
            .unwrap();
        assert_eq!(session.state(), ConnectionState::Connected);
        assert!(session.error().is_none());
    }

    #[test]
    fn connect_while_active_is_rejected() {
        let (mut session, mut pod) = connected();
        assert!(session.connect(&mut pod, &SystemConfig::default(), 0).is_err());
        assert_eq!(session.state(), ConnectionState::Connected);
    }
}
