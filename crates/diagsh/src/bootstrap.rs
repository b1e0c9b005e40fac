//! Shell bootstrap orchestration.
//!
//! Bootstrap resolves configuration, installs telemetry, prepares the listen
//! socket directory and builds the process-wide registry and event emitter.
//! Every failure is reported to the [`HealthReporter`] before it is returned.

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use diagsh_config::{Config, SocketPreparationError};

use crate::command::builtin_commands;
use crate::events::EventEmitter;
use crate::health::HealthReporter;
use crate::registry::{CommandRegistry, RegistryError};
use crate::remote::{ConnectionProvider, JsonlConnectionProvider};
use crate::session::{SessionSettings, ShellServices};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the shell configuration.
    ///
    /// # Errors
    ///
    /// Returns the `ortho_config` error when a layer cannot be read or merged.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader returning an already resolved configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// Socket preparation failed.
    #[error("failed to prepare listen socket: {source}")]
    Socket {
        /// Filesystem error reported while preparing the socket directory.
        #[source]
        source: SocketPreparationError,
    },
    /// Two commands claimed the same name.
    #[error("failed to register commands: {source}")]
    Registry {
        /// Registration failure.
        #[source]
        source: RegistryError,
    },
}

/// Result of a successful bootstrap invocation.
pub struct Shell {
    config: Config,
    registry: Arc<CommandRegistry>,
    events: Arc<EventEmitter>,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl Shell {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The process-wide command registry.
    #[must_use]
    pub const fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// The process-wide connection event emitter.
    #[must_use]
    pub const fn events(&self) -> &Arc<EventEmitter> {
        &self.events
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Provider for the configured target endpoint.
    #[must_use]
    pub fn default_provider(&self) -> Arc<dyn ConnectionProvider> {
        Arc::new(JsonlConnectionProvider::new(
            self.config.target().clone(),
            self.config.remote_timeout(),
        ))
    }

    /// Bundles the shared collaborators every session needs.
    #[must_use]
    pub fn into_services(self, provider: Arc<dyn ConnectionProvider>) -> Arc<ShellServices> {
        let settings = SessionSettings::from_config(&self.config);
        Arc::new(ShellServices::new(
            self.registry,
            self.events,
            self.reporter,
            provider,
            settings,
        ))
    }
}

/// Bootstraps the shell using the supplied collaborators.
///
/// # Errors
///
/// Returns [`BootstrapError`] for the first step that fails; the reporter has
/// already been told about it.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
) -> Result<Shell, BootstrapError> {
    reporter.bootstrap_starting();
    match build(loader) {
        Ok((config, registry, events, telemetry)) => {
            reporter.bootstrap_succeeded(&config);
            Ok(Shell {
                config,
                registry,
                events,
                telemetry,
                reporter,
            })
        }
        Err(error) => {
            reporter.bootstrap_failed(&error);
            Err(error)
        }
    }
}

type Built = (Config, Arc<CommandRegistry>, Arc<EventEmitter>, TelemetryHandle);

fn build(loader: &dyn ConfigLoader) -> Result<Built, BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;

    if config.mode().serves_socket() {
        config
            .listen_socket()
            .prepare_filesystem()
            .map_err(|source| BootstrapError::Socket { source })?;
    }

    let mut registry = CommandRegistry::new();
    registry
        .register_all(builtin_commands())
        .map_err(|source| BootstrapError::Registry { source })?;
    let registry = Arc::new(registry);

    let events = Arc::new(EventEmitter::new());
    events.add_listener(registry.clone());

    Ok((config, registry, events, telemetry))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::events::{ConnectionEvent, SessionId};
    use crate::tests::support::{
        FailingConfigLoader, HealthEvent, RecordingHealthReporter, TestConfigLoader,
    };

    #[rstest]
    fn bootstrap_wires_registry_to_events() {
        let reporter = Arc::new(RecordingHealthReporter::default());
        let shell = bootstrap_with(&TestConfigLoader::new(), reporter.clone()).expect("bootstrap");

        assert_eq!(shell.events().listener_count(), 1);
        assert!(!shell.registry().is_available("threads"));
        shell
            .events()
            .emit(&ConnectionEvent::connected(SessionId::new(1), "tcp://t:1"));
        assert!(shell.registry().is_available("threads"));
        assert_eq!(
            reporter.events(),
            vec![HealthEvent::BootstrapStarting, HealthEvent::BootstrapSucceeded]
        );
    }

    #[rstest]
    fn configuration_failures_are_reported() {
        let reporter = Arc::new(RecordingHealthReporter::default());
        let error = bootstrap_with(&FailingConfigLoader, reporter.clone())
            .err()
            .expect("invalid target must fail");

        assert!(matches!(error, BootstrapError::Configuration { .. }));
        let events = reporter.events();
        assert!(
            matches!(events.last(), Some(HealthEvent::BootstrapFailed(_))),
            "{events:?}"
        );
    }

    #[test]
    fn static_loader_returns_its_config() {
        let config = Config {
            prompt: String::from("% "),
            ..Config::default()
        };
        let loaded = StaticConfigLoader::new(config.clone())
            .load()
            .expect("static config");
        assert_eq!(loaded, config);
    }
}
