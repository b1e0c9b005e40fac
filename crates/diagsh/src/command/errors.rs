use thiserror::Error;

use crate::output::Output;
use crate::remote::RemoteError;

/// Failure raised by [`super::Command::execute`].
#[derive(Debug, Error)]
pub enum CommandError {
    /// The management connection failed or rejected the operation.
    #[error(transparent)]
    Remote(#[from] RemoteError),
    /// The session has no management connection.
    #[error("no management connection is open")]
    NotConnected,
    /// The target answered with a value of the wrong shape.
    #[error("'{operation}' returned {found}, expected {expected}")]
    UnexpectedReply {
        /// Operation that was invoked.
        operation: String,
        /// JSON type the command needed.
        expected: &'static str,
        /// JSON type received.
        found: &'static str,
    },
}

impl CommandError {
    /// Short label reported as [`Output::ExceptionInfo`]'s `kind`.
    #[must_use]
    pub const fn kind(&self) -> &str {
        match self {
            Self::Remote(RemoteError::Rejected { kind, .. }) => kind.as_str(),
            Self::Remote(RemoteError::Timeout { .. }) => "Timeout",
            Self::Remote(RemoteError::Disconnected) => "Disconnected",
            Self::Remote(_) => "RemoteError",
            Self::NotConnected => "NotConnected",
            Self::UnexpectedReply { .. } => "UnexpectedReply",
        }
    }

    /// Human-readable message reported alongside [`CommandError::kind`].
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Remote(RemoteError::Rejected { message, .. }) => message.clone(),
            other => other.to_string(),
        }
    }

    /// Converts the error into the output shown to the user.
    #[must_use]
    pub fn to_output(&self) -> Output {
        Output::exception(self.kind(), self.message())
    }
}
