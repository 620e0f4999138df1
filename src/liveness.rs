//! Timer-driven liveness monitor.
//!
//! Runs on a fixed tick (default 1 s).  Each tick it checks staleness of
//! the event stream, watches for the orientation alarm, and drives the
//! pod's LED so an operator can see the session breathing.
//!
//! Liveness policy: wall-clock staleness.  The session stamps the time
//! of every accepted event; if no event arrived within the configured
//! timeout the pod is declared [`LostConnection`] — a soft verdict that
//! `connect()` can resume from without a full teardown.  (The stricter
//! stall-compare-and-hard-disconnect policy was deliberately not used;
//! see DESIGN.md.)
//!
//! [`LostConnection`]: crate::session::ConnectionState::LostConnection

use crate::actuation::{ALARM_SOLID_RED, ERROR_PULSE, HEARTBEAT_PULSES};
use crate::app::ports::DeviceTransport;
use crate::config::SystemConfig;
use crate::error::Error;
use crate::fusion::Orientation;
use crate::session::DeviceSession;

/// Per-session liveness state.  Reset when the device session ends.
pub struct LivenessMonitor {
    /// Tick counter; only indexes the LED pattern sequence.
    ticks: u64,
    /// Orientation seen on the previous tick — the alarm is
    /// edge-triggered on change, not re-fired every tick.
    last_orientation: Option<Orientation>,
}

impl Default for LivenessMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl LivenessMonitor {
    pub fn new() -> Self {
        Self {
            ticks: 0,
            last_orientation: None,
        }
    }

    /// Forget per-session state (orientation edge, pattern phase).
    pub fn reset(&mut self) {
        self.ticks = 0;
        self.last_orientation = None;
    }

    /// One monitor tick.  No-op unless a session is active.
    pub fn tick(
        &mut self,
        session: &mut DeviceSession,
        transport: &mut impl DeviceTransport,
        config: &SystemConfig,
        now_ms: u64,
    ) {
        if !session.is_active() {
            return;
        }

        // Staleness: only once traffic has ever flowed.  A pod that is
        // still warming up gets the handshake's own grace.
        let stale = session.snapshot().heartbeat > 0
            && now_ms.saturating_sub(session.last_event_ms())
                >= u64::from(config.liveness_timeout_ms);
        if stale {
            session.mark_lost();
            return;
        }

        // Orientation alarm — edge-triggered, sticky until the button is
        // pressed or the session ends.
        let orientation = session.snapshot().orientation;
        if orientation != self.last_orientation {
            if orientation == Some(config.alarm_orientation) {
                session.raise(Error::Maintenance);
                let _ = transport.set_led(ALARM_SOLID_RED);
            }
            self.last_orientation = orientation;
        }

        // LED heartbeat.  A held button owns the LED (the press handler
        // already wrote the identify colour).
        if !session.button_pressed() {
            let command = if session.error().is_some() {
                ERROR_PULSE
            } else {
                HEARTBEAT_PULSES[(self.ticks as usize) % HEARTBEAT_PULSES.len()]
            };
            let _ = transport.set_led(command);
        }

        self.ticks += 1;
    }
}
