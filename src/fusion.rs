//! Sensor-fusion accumulator.
//!
//! The pod emits a heterogeneous stream of sensor events over its
//! wireless link.  This module folds that stream into a single
//! [`SensorSnapshot`]: each event kind overwrites its own field
//! (last-write-wins), fields are independent of each other, and a
//! monotonic heartbeat counter ticks for every device-originated
//! event regardless of kind — the liveness monitor keys off that
//! counter, so staleness detection does not care *which* sensor is
//! producing traffic.
//!
//! ```text
//!  temperature ──┐
//!  humidity    ──┤
//!  pressure    ──┤
//!  gas         ──┼──▶ apply(snapshot, event) ──▶ snapshot'
//!  heading     ──┤         (pure fold)
//!  gravity     ──┤
//!  tap         ──┘
//! ```

use log::warn;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Orientation
// ---------------------------------------------------------------------------

/// Earth gravity band used to classify the resting face: an axis counts
/// as "down" when its reading is within ±0.2 m/s² of ±9.8 m/s².
const GRAVITY_LO: f32 = 9.7;
const GRAVITY_HI: f32 = 9.9;

/// Which face of the pod is resting downward.
///
/// Derived exclusively from gravity-vector events; the discriminants are
/// the wire codes published to the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Orientation {
    Bottom = 0,
    Front = 1,
    Back = 2,
    Right = 3,
    Left = 4,
    Top = 5,
}

impl Orientation {
    /// Wire code for this orientation.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Convert a wire code back to an `Orientation`.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Bottom),
            1 => Some(Self::Front),
            2 => Some(Self::Back),
            3 => Some(Self::Right),
            4 => Some(Self::Left),
            5 => Some(Self::Top),
            _ => None,
        }
    }

    /// Classify a gravity vector (m/s²) into a resting face.
    ///
    /// Axes are tested in a fixed priority order; the first axis whose
    /// reading falls inside the gravity band wins.  Returns `None` for an
    /// ambiguous tilt (no axis in band) — callers keep the previous value.
    pub fn from_gravity(x: f32, y: f32, z: f32) -> Option<Self> {
        let in_band = |v: f32| (GRAVITY_LO..=GRAVITY_HI).contains(&v);

        if in_band(z) {
            Some(Self::Bottom)
        } else if in_band(-z) {
            Some(Self::Top)
        } else if in_band(x) {
            Some(Self::Front)
        } else if in_band(-x) {
            Some(Self::Back)
        } else if in_band(y) {
            Some(Self::Right)
        } else if in_band(-y) {
            Some(Self::Left)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A sensor reading pushed by the pod.
///
/// The set of kinds is closed; transports map unrecognised notifications
/// to [`SensorEvent::Unknown`] so the fold stays total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorEvent {
    /// Ambient temperature (°C).
    Temperature(f32),
    /// Relative humidity (%).
    Humidity(f32),
    /// Barometric pressure (hPa).
    Pressure(f32),
    /// Combined air-quality reading.
    Gas { co2_ppm: f32, voc_ppb: f32 },
    /// Battery charge (%).
    Battery(u8),
    /// Compass heading (degrees, unrounded).
    Heading(f32),
    /// Gravity vector (m/s² per axis).
    GravityVector { x: f32, y: f32, z: f32 },
    /// Tap/knock detection with direction code and tap count.
    Tap { direction: u8, count: u8 },
    /// Event kind the fold does not recognise.  Still counts toward the
    /// heartbeat; the payload is the transport's label for the kind.
    Unknown(&'static str),
}

/// Anything the pod can push at the session: sensor traffic or the
/// hardware button.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeviceEvent {
    Sensor(SensorEvent),
    Button { pressed: bool },
}

/// How much of the snapshot a reset clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetKind {
    /// Clear only the vibration accumulator.  Issued on the publish
    /// cadence so tap counts do not grow unbounded between relay windows.
    Tick,
    /// Clear every field, heartbeat included.  Issued on session teardown.
    Full,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// The fused sensor state.  Every field is last-write-wins for its own
/// event kind; `None` means no reading has arrived yet (the air-quality
/// sensor in particular reports nothing while calibrating).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorSnapshot {
    pub temperature_c: Option<f32>,
    pub humidity_pct: Option<f32>,
    pub pressure_hpa: Option<f32>,
    pub co2_ppm: Option<f32>,
    pub voc_ppb: Option<f32>,
    pub battery_pct: Option<u8>,
    /// Stored unrounded; presentation reads go through
    /// [`heading_rounded`](Self::heading_rounded).
    pub heading_deg: Option<f32>,
    /// Last classified resting face.  Survives unrelated events and
    /// ambiguous tilts.
    pub orientation: Option<Orientation>,
    /// Accumulated tap count since the last reset.
    pub vibration: u32,
    /// Count of device-originated events since the last full reset.
    /// Strictly increasing; only [`ResetKind::Full`] zeroes it.
    pub heartbeat: u64,
}

impl SensorSnapshot {
    /// Fold one sensor event into the snapshot.
    ///
    /// Total over the closed event set: unknown kinds are logged as a
    /// warning and leave everything but the heartbeat untouched.
    pub fn apply(&mut self, event: &SensorEvent) {
        // Every device-originated event counts, recognised or not.
        self.heartbeat += 1;

        match *event {
            SensorEvent::Temperature(v) => self.temperature_c = Some(v),
            SensorEvent::Humidity(v) => self.humidity_pct = Some(v),
            SensorEvent::Pressure(v) => self.pressure_hpa = Some(v),
            SensorEvent::Gas { co2_ppm, voc_ppb } => {
                self.co2_ppm = Some(co2_ppm);
                self.voc_ppb = Some(voc_ppb);
            }
            SensorEvent::Battery(v) => self.battery_pct = Some(v),
            SensorEvent::Heading(v) => self.heading_deg = Some(v),
            SensorEvent::GravityVector { x, y, z } => {
                if let Some(face) = Orientation::from_gravity(x, y, z) {
                    self.orientation = Some(face);
                }
                // Ambiguous tilt: keep the previous classification.
            }
            SensorEvent::Tap { count, .. } => {
                self.vibration = self.vibration.saturating_add(u32::from(count));
            }
            SensorEvent::Unknown(label) => {
                warn!("unhandled sensor event \"{label}\"");
            }
        }
    }

    /// Clear transient state.  See [`ResetKind`].
    pub fn reset(&mut self, kind: ResetKind) {
        match kind {
            ResetKind::Tick => self.vibration = 0,
            ResetKind::Full => *self = Self::default(),
        }
    }

    /// Heading rounded to one decimal — presentation projection only.
    pub fn heading_rounded(&self) -> Option<f32> {
        self.heading_deg.map(|h| (h * 10.0).round() / 10.0)
    }
}
