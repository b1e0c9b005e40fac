use std::io;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::info;

use super::PROCESS_TARGET;

/// Signals that end the shell. `SIGHUP` covers a controlling terminal that
/// went away underneath an interactive session.
const TERMINATING_SIGNALS: [i32; 4] = [SIGINT, SIGTERM, SIGQUIT, SIGHUP];

/// Source of process-wide stop requests.
pub trait ShutdownSignal: Send + Sync {
    /// Blocks until the shell should stop.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError`] when the source cannot be watched.
    fn wait(&self) -> Result<(), ShutdownError>;
}

/// Failure to watch for stop requests.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// The signal handlers could not be registered.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Error returned by `signal-hook`.
        #[source]
        source: io::Error,
    },
}

/// Waits for one of the terminating POSIX signals.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShutdownSignal;

impl SystemShutdownSignal {
    /// Creates the listener. Handlers are registered on the first
    /// [`ShutdownSignal::wait`].
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        let mut signals =
            Signals::new(TERMINATING_SIGNALS).map_err(|source| ShutdownError::Install { source })?;
        let received = signals.forever().next();
        info!(
            target: PROCESS_TARGET,
            signal = received.map_or("none", signal_name),
            "stopping shell on request"
        );
        Ok(())
    }
}

const fn signal_name(signal: i32) -> &'static str {
    match signal {
        SIGINT => "SIGINT",
        SIGTERM => "SIGTERM",
        SIGQUIT => "SIGQUIT",
        SIGHUP => "SIGHUP",
        _ => "unknown",
    }
}
