//! Relay session orchestration.
//!
//! The concrete relay client is a capability object behind
//! [`RelayClient`](crate::app::ports::RelayClient); this module owns
//! *when* it is used: credential derivation from the pod's cloud token,
//! the relay connection state, and the connect-exactly-once-per-device-
//! session bookkeeping the supervisor relies on.

use log::{info, warn};

use crate::app::ports::{RelayClient, RelayError};
use crate::config::SystemConfig;

/// Connection state of the telemetry relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Disconnected,
    Connecting,
    Connected,
    /// The relay refused the credentials.  No automatic retry; a fresh
    /// credential-bearing device connect is required.
    NotAuthorized,
}

/// Credentials handed to the relay client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayCredentials {
    /// Relay organisation.
    pub org: String,
    /// Relay device type.
    pub type_id: String,
    /// Device identifier — the pod's user-visible name.
    pub id: String,
    /// Authentication token.
    pub auth_token: String,
}

impl RelayCredentials {
    /// Derive credentials from the pod's cloud token.
    ///
    /// The token is `authToken:type:org`; missing or empty trailing
    /// segments fall back to the configured defaults.
    pub fn from_token(id: &str, token: &str, config: &SystemConfig) -> Self {
        let mut parts = token.splitn(3, ':');
        let auth_token = parts.next().unwrap_or("").to_string();
        let type_id = match parts.next() {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => config.relay_default_type.clone(),
        };
        let org = match parts.next() {
            Some(o) if !o.is_empty() => o.to_string(),
            _ => config.relay_default_org.clone(),
        };

        Self {
            org,
            type_id,
            id: id.to_string(),
            auth_token,
        }
    }
}

/// Tracks the relay connection across one device session.
pub struct RelaySession {
    state: RelayState,
    /// Set once the supervisor has attempted a connect this device
    /// session; prevents re-triggering on later state observations.
    attempted: bool,
}

impl Default for RelaySession {
    fn default() -> Self {
        Self::new()
    }
}

impl RelaySession {
    pub fn new() -> Self {
        Self {
            state: RelayState::Disconnected,
            attempted: false,
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn attempted(&self) -> bool {
        self.attempted
    }

    /// Arm the session for a fresh device connect.  A standing relay
    /// connection is kept; a `NotAuthorized` verdict is cleared so the
    /// new (possibly re-tokened) session may try again.
    pub fn begin_device_session(&mut self) {
        self.attempted = false;
        if self.state == RelayState::NotAuthorized {
            self.state = RelayState::Disconnected;
        }
    }

    /// Attempt the one relay connect for this device session.
    /// The outcome lands in [`state`](Self::state), never in a panic or
    /// a propagated error.
    pub fn connect(&mut self, client: &mut impl RelayClient, credentials: &RelayCredentials) {
        self.attempted = true;
        self.state = RelayState::Connecting;
        info!(
            "relay connect: org={} type={} id={}",
            credentials.org, credentials.type_id, credentials.id
        );

        match client.connect(credentials) {
            Ok(()) => {
                self.state = RelayState::Connected;
                info!("relay connected");
            }
            Err(RelayError::NotAuthorized) => {
                self.state = RelayState::NotAuthorized;
                warn!("relay refused credentials for id={}", credentials.id);
            }
            Err(e) => {
                self.state = RelayState::Disconnected;
                warn!("relay connect failed: {e}");
            }
        }
    }

    /// Close the relay session and return to `Disconnected`.
    pub fn disconnect(&mut self, client: &mut impl RelayClient) {
        if self.state == RelayState::Connected || self.state == RelayState::Connecting {
            client.disconnect();
        }
        self.state = RelayState::Disconnected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubRelay {
        verdict: Result<(), RelayError>,
        connects: usize,
        disconnects: usize,
    }

    impl StubRelay {
        fn new(verdict: Result<(), RelayError>) -> Self {
            Self {
                verdict,
                connects: 0,
                disconnects: 0,
            }
        }
    }

    impl RelayClient for StubRelay {
        fn connect(&mut self, _credentials: &RelayCredentials) -> Result<(), RelayError> {
            self.connects += 1;
            self.verdict
        }

        fn publish(
            &mut self,
            _channel: &str,
            _payload: &serde_json::Value,
        ) -> Result<(), RelayError> {
            Ok(())
        }

        fn disconnect(&mut self) {
            self.disconnects += 1;
        }
    }

    #[test]
    fn token_splits_into_credentials() {
        let config = SystemConfig::default();
        let creds = RelayCredentials::from_token("thingy-01", "abc:typeA:orgA", &config);
        assert_eq!(creds.id, "thingy-01");
        assert_eq!(creds.auth_token, "abc");
        assert_eq!(creds.type_id, "typeA");
        assert_eq!(creds.org, "orgA");
    }

    #[test]
    fn missing_segments_fall_back_to_defaults() {
        let config = SystemConfig::default();

        let creds = RelayCredentials::from_token("pod-7", "secret", &config);
        assert_eq!(creds.auth_token, "secret");
        assert_eq!(creds.type_id, config.relay_default_type);
        assert_eq!(creds.org, config.relay_default_org);

        let creds = RelayCredentials::from_token("pod-7", "secret:typeB", &config);
        assert_eq!(creds.type_id, "typeB");
        assert_eq!(creds.org, config.relay_default_org);

        let creds = RelayCredentials::from_token("pod-7", "secret::orgB", &config);
        assert_eq!(creds.type_id, config.relay_default_type);
        assert_eq!(creds.org, "orgB");
    }

    #[test]
    fn successful_connect_reaches_connected() {
        let config = SystemConfig::default();
        let creds = RelayCredentials::from_token("pod", "tok", &config);
        let mut client = StubRelay::new(Ok(()));
        let mut session = RelaySession::new();

        session.connect(&mut client, &creds);
        assert_eq!(session.state(), RelayState::Connected);
        assert!(session.attempted());
        assert_eq!(client.connects, 1);
    }

    #[test]
    fn auth_refusal_parks_in_not_authorized() {
        let config = SystemConfig::default();
        let creds = RelayCredentials::from_token("pod", "bad", &config);
        let mut client = StubRelay::new(Err(RelayError::NotAuthorized));
        let mut session = RelaySession::new();

        session.connect(&mut client, &creds);
        assert_eq!(session.state(), RelayState::NotAuthorized);

        // A new device session clears the verdict so fresh credentials
        // can be tried.
        session.begin_device_session();
        assert_eq!(session.state(), RelayState::Disconnected);
        assert!(!session.attempted());
    }

    #[test]
    fn disconnect_only_calls_client_when_open() {
        let mut client = StubRelay::new(Ok(()));
        let mut session = RelaySession::new();

        session.disconnect(&mut client);
        assert_eq!(client.disconnects, 0);

        let config = SystemConfig::default();
        let creds = RelayCredentials::from_token("pod", "tok", &config);
        session.connect(&mut client, &creds);
        session.disconnect(&mut client);
        assert_eq!(client.disconnects, 1);
        assert_eq!(session.state(), RelayState::Disconnected);
    }
}
