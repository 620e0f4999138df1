//! Port traits — the hexagonal boundary between the supervisor core and
//! the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Supervisor (domain)
//! ```
//!
//! The concrete wireless stack and the concrete relay client live on the
//! far side of these traits.  The domain core consumes them via generics
//! at call sites, so the whole session logic runs against mocks in tests
//! and against a scripted pod in the simulator binary.

use crate::actuation::{LedCommand, SpeakerSample};
use crate::fusion::DeviceEvent;
use crate::relay::RelayCredentials;

// ───────────────────────────────────────────────────────────────
// Device transport port
// ───────────────────────────────────────────────────────────────

/// Static identity attributes readable (and partly writable) on the pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Name,
    Firmware,
    CloudToken,
}

/// Notification services the session subscribes to after interrogation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorService {
    Temperature,
    Humidity,
    Pressure,
    Gas,
    Battery,
    Heading,
    GravityVector,
    Tap,
    Button,
}

/// The fixed subscription set.  Order matters only for log readability.
pub const SUBSCRIBED_SERVICES: [SensorService; 9] = [
    SensorService::Temperature,
    SensorService::Humidity,
    SensorService::Pressure,
    SensorService::Gas,
    SensorService::Battery,
    SensorService::Heading,
    SensorService::GravityVector,
    SensorService::Tap,
    SensorService::Button,
];

/// Capability object for the pod's wireless link.
///
/// Implementations queue pushed notifications internally; the dispatch
/// loop drains them through [`poll_event`](Self::poll_event), which keeps
/// every state mutation on one logical thread of control.
pub trait DeviceTransport {
    /// Discover and pair with the pod.  Returns its serial on success.
    fn handshake(&mut self) -> Result<String, TransportError>;

    /// Tear the link down.  Idempotent.
    fn close(&mut self);

    /// One-shot read of a static identity attribute.
    fn read_attribute(&mut self, attr: Attribute) -> Result<String, TransportError>;

    /// Write an identity attribute back to the pod.
    fn write_attribute(&mut self, attr: Attribute, value: &str) -> Result<(), TransportError>;

    /// Start a notification service.
    fn start_service(&mut self, service: SensorService) -> Result<(), TransportError>;

    /// Write an LED actuation command.
    fn set_led(&mut self, command: LedCommand) -> Result<(), TransportError>;

    /// Select a speaker mode (see [`SPEAKER_MODE_SAMPLE`](crate::actuation::SPEAKER_MODE_SAMPLE)).
    fn configure_speaker(&mut self, mode: u8) -> Result<(), TransportError>;

    /// Play a stored speaker sample.
    fn play_sample(&mut self, sample: SpeakerSample) -> Result<(), TransportError>;

    /// Next queued notification, if any.
    fn poll_event(&mut self) -> Option<DeviceEvent>;
}

/// Errors from [`DeviceTransport`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The pod rejected pairing or went silent during the handshake.
    HandshakeRejected,
    /// The operation needs an open link and there is none.
    NotConnected,
    /// An attribute read failed.
    ReadFailed(Attribute),
    /// An attribute write failed.
    WriteFailed(Attribute),
    /// A notification service could not be started.
    ServiceUnavailable(SensorService),
}

// ───────────────────────────────────────────────────────────────
// Relay client port
// ───────────────────────────────────────────────────────────────

/// Capability object for the remote telemetry relay.
pub trait RelayClient {
    /// Open a relay session with the given credentials.
    fn connect(&mut self, credentials: &RelayCredentials) -> Result<(), RelayError>;

    /// Publish a JSON payload on the named channel.
    fn publish(&mut self, channel: &str, payload: &serde_json::Value) -> Result<(), RelayError>;

    /// Close the relay session.  Idempotent.
    fn disconnect(&mut self);
}

/// Errors from [`RelayClient`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayError {
    /// The relay refused the credentials.
    NotAuthorized,
    /// No relay session is open.
    NotConnected,
    /// The publish was accepted locally but could not be delivered.
    PublishFailed,
}

// ───────────────────────────────────────────────────────────────
// Display impls
// ───────────────────────────────────────────────────────────────

impl core::fmt::Display for Attribute {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Name => write!(f, "name"),
            Self::Firmware => write!(f, "firmware"),
            Self::CloudToken => write!(f, "cloudtoken"),
        }
    }
}

impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::HandshakeRejected => write!(f, "handshake rejected"),
            Self::NotConnected => write!(f, "link not open"),
            Self::ReadFailed(attr) => write!(f, "read of {attr} failed"),
            Self::WriteFailed(attr) => write!(f, "write of {attr} failed"),
            Self::ServiceUnavailable(svc) => write!(f, "service {svc:?} unavailable"),
        }
    }
}

impl core::fmt::Display for RelayError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotAuthorized => write!(f, "not authorized"),
            Self::NotConnected => write!(f, "no relay session"),
            Self::PublishFailed => write!(f, "publish failed"),
        }
    }
}
