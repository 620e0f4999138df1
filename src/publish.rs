//! Publish-cadence controller.
//!
//! Runs on its own fixed tick, independent from the liveness monitor.
//! A tick publishes only when both halves of the pipeline are up —
//! device session `Connected` and relay `Connected` — and otherwise does
//! nothing at all.

use log::{debug, warn};
use serde::Serialize;

use crate::actuation::{PUBLISH_FLASH, SpeakerSample};
use crate::app::ports::{DeviceTransport, RelayClient};
use crate::config::SystemConfig;
use crate::fusion::SensorSnapshot;
use crate::relay::{RelaySession, RelayState};
use crate::session::{ConnectionState, DeviceSession};

/// The JSON body published to the relay's status channel.
///
/// Field-for-field projection of [`SensorSnapshot`] minus the heartbeat
/// counter, which is liveness bookkeeping and not telemetry.  Absent
/// readings are omitted, not null.
#[derive(Debug, Serialize)]
struct WireReadings {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    humidity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pressure: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    co2: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    voc: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    battery: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    heading: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    orientation: Option<u8>,
    vibration: u32,
}

impl From<&SensorSnapshot> for WireReadings {
    fn from(snap: &SensorSnapshot) -> Self {
        Self {
            temperature: snap.temperature_c,
            humidity: snap.humidity_pct,
            pressure: snap.pressure_hpa,
            co2: snap.co2_ppm,
            voc: snap.voc_ppb,
            battery: snap.battery_pct,
            heading: snap.heading_deg,
            orientation: snap.orientation.map(|o| o.code()),
            vibration: snap.vibration,
        }
    }
}

/// Build the `{"d": {...}}` envelope the relay expects.
pub fn wire_payload(snapshot: &SensorSnapshot) -> serde_json::Value {
    serde_json::json!({ "d": WireReadings::from(snapshot) })
}

/// Timer-driven publisher.
pub struct PublishScheduler {
    /// Successful publishes since process start.  Drives the modulo
    /// vibration reset; never reset between sessions.
    published: u64,
}

impl Default for PublishScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl PublishScheduler {
    pub fn new() -> Self {
        Self { published: 0 }
    }

    /// Successful publish count since process start.
    pub fn published(&self) -> u64 {
        self.published
    }

    /// One publish tick.
    pub fn tick(
        &mut self,
        session: &mut DeviceSession,
        relay: &RelaySession,
        client: &mut impl RelayClient,
        transport: &mut impl DeviceTransport,
        config: &SystemConfig,
    ) {
        if session.state() != ConnectionState::Connected || relay.state() != RelayState::Connected {
            return;
        }

        let payload = wire_payload(session.snapshot());
        match client.publish("status", &payload) {
            Ok(()) => {
                self.published += 1;
                debug!("published #{}", self.published);

                // Periodic hygiene: the vibration accumulator only means
                // "taps since the last relay window".
                if self.published % u64::from(config.vibration_reset_modulus) == 0 {
                    session.tick_reset();
                }
            }
            Err(e) => warn!("relay publish failed: {e}"),
        }

        // The alarm face also gets an audible siren on the publish beat,
        // on top of whatever the liveness monitor shows.
        if session.snapshot().orientation == Some(config.alarm_orientation) {
            let _ = transport.play_sample(SpeakerSample::Siren);
        }

        // Visible publish heartbeat for the operator, unless an error
        // pattern owns the LED.
        if session.error().is_none() {
            let _ = transport.set_led(PUBLISH_FLASH);
        }
    }
}
