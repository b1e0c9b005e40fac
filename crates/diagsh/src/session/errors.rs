use std::io;

use thiserror::Error;

use super::SessionState;
use crate::events::SessionId;
use crate::remote::ConnectError;

/// Errors raised while starting or supervising a connection session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The management connection could not be acquired.
    #[error("session {session} aborted: {source}")]
    Aborted {
        /// Session that aborted.
        session: SessionId,
        /// Acquisition failure.
        #[source]
        source: ConnectError,
    },
    /// A lifecycle transition was attempted out of order.
    #[error("session {session} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Session concerned.
        session: SessionId,
        /// State the session was in.
        from: SessionState,
        /// State that was requested.
        to: SessionState,
    },
    /// The run loop thread could not be spawned.
    #[error("failed to spawn run loop for session {session}: {source}")]
    Spawn {
        /// Session concerned.
        session: SessionId,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The run loop thread panicked.
    #[error("run loop for session {session} panicked")]
    Panicked {
        /// Session concerned.
        session: SessionId,
    },
}
