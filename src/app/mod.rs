//! Application core — pure domain logic, zero concrete I/O.
//!
//! The supervisor in [`service`] drives the session, relay, liveness and
//! publish modules; everything outside the process (the pod's wireless
//! link, the telemetry relay) is reached through the port traits in
//! [`ports`], keeping this layer fully testable without real devices.

pub mod ports;
pub mod service;
