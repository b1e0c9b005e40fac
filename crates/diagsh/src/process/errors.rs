use std::io;

use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::session::SessionError;
use crate::transport::{ListenerError, TransportError};

use super::shutdown::ShutdownError;

/// Errors that end the shell process with a failure status.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bootstrap failed.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    /// The socket listener could not be bound or failed while running.
    #[error("socket listener failed: {0}")]
    Listener(#[from] ListenerError),
    /// The terminal channel could not be opened.
    #[error("failed to open terminal channel: {0}")]
    Terminal(#[from] TransportError),
    /// A session aborted or its loop failed.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// Shutdown signal handling could not be installed.
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
    /// A supervisor thread could not be spawned.
    #[error("failed to spawn {name} thread: {source}")]
    Thread {
        /// Thread name.
        name: &'static str,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
}
