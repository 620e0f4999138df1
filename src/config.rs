//! System configuration parameters.
//!
//! All tunable parameters for the pod supervisor.  Defaults are
//! compiled in; every field can be overridden through `PODLINK_*`
//! environment variables at startup.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::fusion::Orientation;

/// Core system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Device ---
    /// Firmware versions known to work with this supervisor.
    /// Anything else raises a non-fatal "outdated firmware" warning.
    pub known_firmware_versions: Vec<String>,

    // --- Relay ---
    /// Relay device-type used when the pod token carries none.
    pub relay_default_type: String,
    /// Relay organisation used when the pod token carries none.
    pub relay_default_org: String,
    /// Relay publish cadence (milliseconds).
    pub publish_interval_ms: u32,

    // --- Liveness ---
    /// Liveness monitor tick cadence (milliseconds).
    pub liveness_interval_ms: u32,
    /// No accepted event within this window declares the pod lost.
    pub liveness_timeout_ms: u32,

    // --- Accumulator hygiene ---
    /// Every Nth publish clears the vibration accumulator.
    pub vibration_reset_modulus: u32,

    // --- Alarm ---
    /// Resting face that trips the "maintenance required" alarm.
    pub alarm_orientation: Orientation,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            known_firmware_versions: vec!["2.1".to_string(), "2.2".to_string()],

            relay_default_type: "pod".to_string(),
            relay_default_org: "quickstart".to_string(),
            publish_interval_ms: 5000,

            liveness_interval_ms: 1000,
            liveness_timeout_ms: 3000,

            vibration_reset_modulus: 10,

            // Pods rest on their bottom face; resting on the top face
            // means someone flipped it over for attention.
            alarm_orientation: Orientation::Top,
        }
    }
}

impl SystemConfig {
    /// Build a config from `PODLINK_*` environment variables, falling
    /// back to [`Default`] for anything unset or unparseable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("PODLINK_KNOWN_FIRMWARE") {
            let versions: Vec<String> = raw
                .split('|')
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect();
            if versions.is_empty() {
                warn!("PODLINK_KNOWN_FIRMWARE is empty, keeping defaults");
            } else {
                config.known_firmware_versions = versions;
            }
        }

        if let Ok(v) = std::env::var("PODLINK_RELAY_TYPE") {
            config.relay_default_type = v;
        }
        if let Ok(v) = std::env::var("PODLINK_RELAY_ORG") {
            config.relay_default_org = v;
        }

        parse_ms("PODLINK_PUBLISH_INTERVAL_MS", &mut config.publish_interval_ms);
        parse_ms(
            "PODLINK_LIVENESS_INTERVAL_MS",
            &mut config.liveness_interval_ms,
        );
        parse_ms(
            "PODLINK_LIVENESS_TIMEOUT_MS",
            &mut config.liveness_timeout_ms,
        );
        parse_ms(
            "PODLINK_VIBRATION_RESET_MODULUS",
            &mut config.vibration_reset_modulus,
        );

        if let Ok(raw) = std::env::var("PODLINK_ALARM_ORIENTATION") {
            match raw.parse::<u8>().ok().and_then(Orientation::from_code) {
                Some(face) => config.alarm_orientation = face,
                None => warn!("PODLINK_ALARM_ORIENTATION \"{raw}\" is not a face code 0-5"),
            }
        }

        config
    }
}

fn parse_ms(var: &str, slot: &mut u32) {
    if let Ok(raw) = std::env::var(var) {
        match raw.parse::<u32>() {
            Ok(v) if v > 0 => *slot = v,
            _ => warn!("{var} \"{raw}\" is not a positive integer, keeping default"),
        }
    }
}
