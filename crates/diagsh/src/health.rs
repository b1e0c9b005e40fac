//! Structured health reporting for shell and session lifecycle events.

use std::sync::Arc;

use diagsh_config::Config;

use crate::bootstrap::BootstrapError;
use crate::events::SessionId;
use crate::remote::ConnectError;
use crate::session::CloseReason;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked when a session starts acquiring its management connection.
    fn session_connecting(&self, session: SessionId, endpoint: &str);

    /// Invoked once a session holds a management connection.
    fn session_connected(&self, session: SessionId, endpoint: &str, channel: &str);

    /// Invoked when a session could not acquire its management connection.
    fn session_aborted(&self, session: SessionId, error: &ConnectError);

    /// Invoked the first time a session notices its connection has died.
    fn remote_lost(&self, session: SessionId, endpoint: &str);

    /// Invoked after a session has released its resources.
    fn session_closed(&self, session: SessionId, reason: CloseReason);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn session_connecting(&self, session: SessionId, endpoint: &str) {
        (**self).session_connecting(session, endpoint);
    }

    fn session_connected(&self, session: SessionId, endpoint: &str, channel: &str) {
        (**self).session_connected(session, endpoint, channel);
    }

    fn session_aborted(&self, session: SessionId, error: &ConnectError) {
        (**self).session_aborted(session, error);
    }

    fn remote_lost(&self, session: SessionId, endpoint: &str) {
        (**self).remote_lost(session, endpoint);
    }

    fn session_closed(&self, session: SessionId, reason: CloseReason) {
        (**self).session_closed(session, reason);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting shell bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            target_endpoint = %config.target(),
            mode = %config.mode(),
            output_format = %config.output_format(),
            log_format = %config.log_format(),
            "shell bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "shell bootstrap failed"
        );
    }

    fn session_connecting(&self, session: SessionId, endpoint: &str) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "session_connecting",
            %session,
            endpoint,
            "acquiring management connection"
        );
    }

    fn session_connected(&self, session: SessionId, endpoint: &str, channel: &str) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "session_connected",
            %session,
            endpoint,
            channel,
            "session connected"
        );
    }

    fn session_aborted(&self, session: SessionId, error: &ConnectError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "session_aborted",
            %session,
            error = %error,
            "session aborted: management connection unavailable"
        );
    }

    fn remote_lost(&self, session: SessionId, endpoint: &str) {
        tracing::warn!(
            target: HEALTH_TARGET,
            event = "remote_lost",
            %session,
            endpoint,
            "management connection lost; only local commands remain"
        );
    }

    fn session_closed(&self, session: SessionId, reason: CloseReason) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "session_closed",
            %session,
            reason = reason.as_str(),
            "session closed"
        );
    }
}
