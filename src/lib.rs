//! Podlink — supervisor for a single short-range wireless
//! environmental-sensor pod.
//!
//! Fuses the pod's event stream into a coherent snapshot, detects loss
//! of contact, drives local LED/speaker feedback, and forwards state to
//! a remote telemetry relay on a fixed cadence.  Concrete transports
//! live behind the port traits in [`app::ports`].

#![deny(unused_must_use)]

pub mod actuation;
pub mod app;
pub mod config;
pub mod error;
pub mod fusion;
pub mod liveness;
pub mod publish;
pub mod relay;
pub mod session;
