//! Session lifecycle states and the guarded cell that holds them.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use super::{SESSION_TARGET, SessionError};
use crate::events::SessionId;

/// Lifecycle state of a connection session.
///
/// `Disconnected → Connecting → Connected → Closed`, with `Aborted` reachable
/// only from `Connecting`. `Closed` and `Aborted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Created, not yet started.
    Disconnected,
    /// Acquiring the management connection.
    Connecting,
    /// Running the read-dispatch-respond loop.
    Connected,
    /// Finished normally; resources released.
    Closed,
    /// The management connection could not be acquired.
    Aborted,
}

impl SessionState {
    /// Returns `true` if `next` is a legal successor of `self`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Disconnected, Self::Connecting)
                | (Self::Connecting, Self::Connected | Self::Aborted)
                | (Self::Connected, Self::Closed)
        )
    }

    /// Returns `true` for `Closed` and `Aborted`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Aborted)
    }

    /// Lower-case state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Closed => "closed",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub(crate) struct StateCell {
    session: SessionId,
    state: Mutex<SessionState>,
}

impl StateCell {
    pub(crate) const fn new(session: SessionId) -> Self {
        Self {
            session,
            state: Mutex::new(SessionState::Disconnected),
        }
    }

    pub(crate) fn get(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn transition(&self, next: SessionState) -> Result<(), SessionError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let current = *state;
        if !current.can_transition_to(next) {
            return Err(SessionError::InvalidTransition {
                session: self.session,
                from: current,
                to: next,
            });
        }
        *state = next;
        debug!(
            target: SESSION_TARGET,
            session = %self.session,
            from = current.as_str(),
            to = next.as_str(),
            "session state changed"
        );
        Ok(())
    }
}
