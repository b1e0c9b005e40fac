//! Test double for [`HealthReporter`] that records lifecycle events.

use std::sync::Mutex;

use diagsh_config::Config;

use crate::bootstrap::BootstrapError;
use crate::events::SessionId;
use crate::health::HealthReporter;
use crate::remote::ConnectError;
use crate::session::CloseReason;

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    Connecting(SessionId),
    Connected(SessionId),
    Aborted(SessionId),
    RemoteLost(SessionId),
    Closed(SessionId, CloseReason),
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn session_connecting(&self, session: SessionId, _endpoint: &str) {
        self.record(HealthEvent::Connecting(session));
    }

    fn session_connected(&self, session: SessionId, _endpoint: &str, _channel: &str) {
        self.record(HealthEvent::Connected(session));
    }

    fn session_aborted(&self, session: SessionId, _error: &ConnectError) {
        self.record(HealthEvent::Aborted(session));
    }

    fn remote_lost(&self, session: SessionId, _endpoint: &str) {
        self.record(HealthEvent::RemoteLost(session));
    }

    fn session_closed(&self, session: SessionId, reason: CloseReason) {
        self.record(HealthEvent::Closed(session, reason));
    }
}
