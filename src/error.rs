//! Unified error types for the pod supervisor.
//!
//! Failures here are session state, not exceptions: components record an
//! `Error` on the session (or a relay state) and every caller resolves to
//! a well-defined state.  All variants are `Copy` so they can be stored
//! and compared without allocation.

use core::fmt;

/// Every fault the supervisor can surface to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The pod rejected or never answered the handshake.
    Handshake,
    /// An attribute read or write failed while a session was active,
    /// or was attempted with no session at all.
    DeviceIo(&'static str),
    /// No sensor traffic arrived within the liveness window.
    Liveness,
    /// The relay rejected the session credentials.
    RelayAuth,
    /// The pod is resting on its alarm face and wants attention.
    Maintenance,
    /// The pod pushed an event kind this build does not understand.
    UnrecognizedEvent,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handshake => write!(f, "pod handshake failed"),
            Self::DeviceIo(what) => write!(f, "pod I/O failed: {what}"),
            Self::Liveness => write!(f, "pod silent beyond the liveness window"),
            Self::RelayAuth => write!(f, "relay rejected credentials"),
            Self::Maintenance => write!(f, "maintenance required"),
            Self::UnrecognizedEvent => write!(f, "unrecognized pod event"),
        }
    }
}

impl core::error::Error for Error {}

/// Supervisor-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_presentation_ready() {
        assert_eq!(Error::Maintenance.to_string(), "maintenance required");
        assert_eq!(
            Error::DeviceIo("name write").to_string(),
            "pod I/O failed: name write"
        );
    }
}
