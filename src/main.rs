//! Podlink simulator — host entry point.
//!
//! There is no real pod or relay on a build machine, so the binary wires
//! the supervisor to a scripted pod transport and a logging relay client
//! and plays a full session: connect → interrogate → fuse events → tick
//! monitors → publish → flip the pod over → disconnect.  Useful as a
//! smoke run and as executable documentation of the dispatch loop.

use std::collections::VecDeque;

use anyhow::Result;
use log::info;

use podlink::actuation::{LedCommand, SpeakerSample};
use podlink::app::ports::{
    Attribute, DeviceTransport, RelayClient, RelayError, SensorService, TransportError,
};
use podlink::app::service::Supervisor;
use podlink::config::SystemConfig;
use podlink::fusion::{DeviceEvent, SensorEvent};
use podlink::relay::RelayCredentials;

// ── Scripted pod ──────────────────────────────────────────────

struct ScriptedPod {
    connected: bool,
    queued: VecDeque<DeviceEvent>,
}

impl ScriptedPod {
    fn new() -> Self {
        Self {
            connected: false,
            queued: VecDeque::new(),
        }
    }

    fn push(&mut self, event: DeviceEvent) {
        self.queued.push_back(event);
    }
}

impl DeviceTransport for ScriptedPod {
    fn handshake(&mut self) -> Result<String, TransportError> {
        self.connected = true;
        Ok("SIM-001".to_string())
    }

    fn close(&mut self) {
        self.connected = false;
        self.queued.clear();
    }

    fn read_attribute(&mut self, attr: Attribute) -> Result<String, TransportError> {
        Ok(match attr {
            Attribute::Name => "sim-pod".to_string(),
            Attribute::Firmware => "2.1".to_string(),
            Attribute::CloudToken => "sim-token:simtype:simorg".to_string(),
        })
    }

    fn write_attribute(&mut self, attr: Attribute, value: &str) -> Result<(), TransportError> {
        info!("pod write {attr} = {value}");
        Ok(())
    }

    fn start_service(&mut self, _service: SensorService) -> Result<(), TransportError> {
        Ok(())
    }

    fn set_led(&mut self, command: LedCommand) -> Result<(), TransportError> {
        info!("pod LED <- {command:?}");
        Ok(())
    }

    fn configure_speaker(&mut self, _mode: u8) -> Result<(), TransportError> {
        Ok(())
    }

    fn play_sample(&mut self, sample: SpeakerSample) -> Result<(), TransportError> {
        info!("pod speaker <- {sample:?}");
        Ok(())
    }

    fn poll_event(&mut self) -> Option<DeviceEvent> {
        self.queued.pop_front()
    }
}

// ── Logging relay ─────────────────────────────────────────────

struct LoggingRelay {
    connected: bool,
}

impl RelayClient for LoggingRelay {
    fn connect(&mut self, credentials: &RelayCredentials) -> Result<(), RelayError> {
        info!(
            "relay <- connect org={} type={} id={}",
            credentials.org, credentials.type_id, credentials.id
        );
        self.connected = true;
        Ok(())
    }

    fn publish(&mut self, channel: &str, payload: &serde_json::Value) -> Result<(), RelayError> {
        if !self.connected {
            return Err(RelayError::NotConnected);
        }
        info!("relay <- publish [{channel}] {payload}");
        Ok(())
    }

    fn disconnect(&mut self) {
        info!("relay <- disconnect");
        self.connected = false;
    }
}

// ── Entry point ───────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = SystemConfig::from_env();
    info!("podlink starting: {config:?}");

    let mut pod = ScriptedPod::new();
    let mut relay = LoggingRelay { connected: false };
    let mut supervisor = Supervisor::new(config);

    let liveness_every = u64::from(supervisor.config().liveness_interval_ms);
    let publish_every = u64::from(supervisor.config().publish_interval_ms);

    supervisor.connect(&mut pod, &mut relay, 0)?;

    // Simulated clock, one liveness tick per step.
    let mut now_ms: u64 = 0;
    for step in 1..=30u64 {
        now_ms += liveness_every;

        // The pod chats away; halfway through, someone flips it over.
        pod.push(DeviceEvent::Sensor(SensorEvent::Temperature(
            20.0 + step as f32 / 10.0,
        )));
        pod.push(DeviceEvent::Sensor(SensorEvent::Humidity(45.0)));
        if step == 10 {
            pod.push(DeviceEvent::Sensor(SensorEvent::GravityVector {
                x: 0.0,
                y: 0.0,
                z: -9.8,
            }));
        }
        if step == 15 {
            // The operator acknowledges the alarm with the button.
            pod.push(DeviceEvent::Button { pressed: true });
            pod.push(DeviceEvent::Button { pressed: false });
            pod.push(DeviceEvent::Sensor(SensorEvent::GravityVector {
                x: 0.0,
                y: 0.0,
                z: 9.8,
            }));
        }
        if step % 3 == 0 {
            pod.push(DeviceEvent::Sensor(SensorEvent::Tap {
                direction: 0,
                count: 1,
            }));
        }

        supervisor.pump_events(&mut pod, now_ms);
        supervisor.liveness_tick(&mut pod, now_ms);
        if now_ms % publish_every == 0 {
            supervisor.publish_tick(&mut pod, &mut relay);
        }
    }

    info!(
        "session summary: state={:?} relay={:?} heartbeat={} published={}",
        supervisor.connection_state(),
        supervisor.relay_state(),
        supervisor.snapshot().heartbeat,
        supervisor.published(),
    );

    supervisor.disconnect(&mut pod, &mut relay);
    info!("podlink done");
    Ok(())
}
