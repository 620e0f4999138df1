//! Supervisor — the application core.
//!
//! Owns the device session, relay session, liveness monitor and publish
//! scheduler, and wires them together.  All I/O flows through the port
//! traits passed in at call sites, so the whole supervisor runs against
//! mock adapters.
//!
//! ```text
//!  DeviceTransport ──▶ ┌──────────────────────────────┐ ──▶ RelayClient
//!                      │          Supervisor           │
//!  (events, ticks) ──▶ │ session · relay · liveness ·  │
//!                      │         publisher             │
//!                      └──────────────────────────────┘
//! ```

use log::debug;

use crate::config::SystemConfig;
use crate::error::{Error, Result};
use crate::fusion::SensorSnapshot;
use crate::liveness::LivenessMonitor;
use crate::publish::PublishScheduler;
use crate::relay::{RelayCredentials, RelaySession, RelayState};
use crate::session::{ConnectionState, DeviceIdentity, DeviceSession};

use super::ports::{DeviceTransport, RelayClient};

/// Orchestrates one pod and its telemetry relay.
pub struct Supervisor {
    config: SystemConfig,
    session: DeviceSession,
    relay: RelaySession,
    liveness: LivenessMonitor,
    publisher: PublishScheduler,
}

impl Supervisor {
    pub fn new(config: SystemConfig) -> Self {
        Self {
            config,
            session: DeviceSession::new(),
            relay: RelaySession::new(),
            liveness: LivenessMonitor::new(),
            publisher: PublishScheduler::new(),
        }
    }

    // ── Actions (presentation triggers) ───────────────────────

    /// Connect the pod and, if it carries credentials, the relay.
    ///
    /// The relay connect happens here and only here — at the single
    /// transition into `Connected` — which is what keeps the
    /// once-per-device-session rule trivially true.
    pub fn connect(
        &mut self,
        transport: &mut impl DeviceTransport,
        relay_client: &mut impl RelayClient,
        now_ms: u64,
    ) -> Result<()> {
        self.liveness.reset();
        self.session.connect(transport, &self.config, now_ms)?;
        self.relay.begin_device_session();
        self.sync_relay(relay_client);
        Ok(())
    }

    /// Tear down both halves of the pipeline.
    pub fn disconnect(
        &mut self,
        transport: &mut impl DeviceTransport,
        relay_client: &mut impl RelayClient,
    ) {
        self.session.disconnect(transport);
        self.relay.disconnect(relay_client);
        self.liveness.reset();
    }

    pub fn set_name(&mut self, name: &str) {
        self.session.set_name(name);
    }

    pub fn set_token(&mut self, token: &str) {
        self.session.set_token(token);
    }

    pub fn write_name(&mut self, transport: &mut impl DeviceTransport) -> Result<()> {
        self.session.write_name(transport)
    }

    pub fn write_token(&mut self, transport: &mut impl DeviceTransport) -> Result<()> {
        self.session.write_token(transport)
    }

    // ── Dispatch loop hooks ───────────────────────────────────

    /// Drain queued pod notifications into the session.
    pub fn pump_events(&mut self, transport: &mut impl DeviceTransport, now_ms: u64) {
        while let Some(event) = transport.poll_event() {
            debug!("pod event: {event:?}");
            self.session.handle_event(event, transport, now_ms);
        }
    }

    /// Liveness monitor tick (run every `liveness_interval_ms`).
    pub fn liveness_tick(&mut self, transport: &mut impl DeviceTransport, now_ms: u64) {
        self.liveness
            .tick(&mut self.session, transport, &self.config, now_ms);
    }

    /// Publish tick (run every `publish_interval_ms`).
    pub fn publish_tick(
        &mut self,
        transport: &mut impl DeviceTransport,
        relay_client: &mut impl RelayClient,
    ) {
        self.publisher.tick(
            &mut self.session,
            &self.relay,
            relay_client,
            transport,
            &self.config,
        );
    }

    // ── Presentation projection ───────────────────────────────

    pub fn connection_state(&self) -> ConnectionState {
        self.session.state()
    }

    pub fn relay_state(&self) -> RelayState {
        self.relay.state()
    }

    pub fn identity(&self) -> &DeviceIdentity {
        self.session.identity()
    }

    pub fn snapshot(&self) -> &SensorSnapshot {
        self.session.snapshot()
    }

    pub fn error(&self) -> Option<Error> {
        self.session.error()
    }

    pub fn warning(&self) -> Option<&str> {
        self.session.warning()
    }

    /// Successful relay publishes since process start.
    pub fn published(&self) -> u64 {
        self.publisher.published()
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    // ── Internal ──────────────────────────────────────────────

    /// The connect-once coordination rule: fire the relay connect when
    /// the pod just reached `Connected` carrying a name and a token, and
    /// this device session has not attempted one yet.
    fn sync_relay(&mut self, relay_client: &mut impl RelayClient) {
        if self.session.state() != ConnectionState::Connected {
            return;
        }
        if self.relay.state() != RelayState::Disconnected || self.relay.attempted() {
            return;
        }

        let identity = self.session.identity();
        if identity.name.is_empty() || identity.token.is_empty() {
            debug!("no relay credentials on pod, staying local-only");
            return;
        }

        let credentials =
            RelayCredentials::from_token(&identity.name, &identity.token, &self.config);
        self.relay.connect(relay_client, &credentials);
        if self.relay.state() == RelayState::NotAuthorized {
            self.session.raise(Error::RelayAuth);
        }
    }
}
