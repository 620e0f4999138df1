//! LED and speaker command vocabulary.
//!
//! The pod carries its own RGB LED and a sample-playback speaker; both
//! are driven remotely through attribute writes on the transport.  This
//! module defines the command types plus the well-known patterns the
//! session and monitors request.

/// Colour as an (R, G, B) tuple, each 0–255.
pub type Rgb = (u8, u8, u8);

/// Preset colour codes understood by the pod's oneshot LED mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OneshotColour {
    Red = 1,
    Green = 2,
    Lime = 3,
    Blue = 4,
    Purple = 5,
    Cyan = 6,
    White = 7,
}

/// A single LED actuation request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LedCommand {
    Off,
    /// Hold a colour until the next command.
    Constant { rgb: Rgb },
    /// One brief flash of a preset colour at the given intensity (0–100).
    Oneshot { colour: OneshotColour, intensity: u8 },
    /// Slow breathing fade, `delay_ms` per cycle.
    Breathe {
        colour: Rgb,
        intensity: u8,
        delay_ms: u16,
    },
}

/// Speaker samples baked into the pod firmware.
/// Discriminants are the sample indices for playback mode 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SpeakerSample {
    Ding = 0,
    Beep = 1,
    Siren = 6,
}

/// Speaker mode for stored-sample playback.
pub const SPEAKER_MODE_SAMPLE: u8 = 3;

// ── Well-known patterns ───────────────────────────────────────

/// Liveness tick sequence while healthy: purple pulse, then dark.
pub const HEARTBEAT_PULSES: [LedCommand; 2] = [
    LedCommand::Oneshot {
        colour: OneshotColour::Purple,
        intensity: 10,
    },
    LedCommand::Off,
];

/// Liveness tick pulse while a local error is active.
pub const ERROR_PULSE: LedCommand = LedCommand::Oneshot {
    colour: OneshotColour::Red,
    intensity: 50,
};

/// Solid red requested once when the orientation alarm trips.
pub const ALARM_SOLID_RED: LedCommand = LedCommand::Constant { rgb: (255, 0, 0) };

/// Magenta hold while the pod's button is pressed ("identify").
pub const IDENTIFY: LedCommand = LedCommand::Constant {
    rgb: (255, 0, 255),
};

/// Blue breathe written just before the link is closed, so the pod is
/// visibly parked rather than abandoned.
pub const SHUTDOWN_PATTERN: LedCommand = LedCommand::Breathe {
    colour: (0, 0, 255),
    intensity: 30,
    delay_ms: 1000,
};

/// Brief cyan flash on each successful relay publish.
pub const PUBLISH_FLASH: LedCommand = LedCommand::Oneshot {
    colour: OneshotColour::Cyan,
    intensity: 10,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heartbeat_sequence_ends_dark() {
        assert_eq!(HEARTBEAT_PULSES[HEARTBEAT_PULSES.len() - 1], LedCommand::Off);
    }

    #[test]
    fn sample_indices_match_pod_firmware() {
        assert_eq!(SpeakerSample::Ding as u8, 0);
        assert_eq!(SpeakerSample::Beep as u8, 1);
        assert_eq!(SpeakerSample::Siren as u8, 6);
    }
}
