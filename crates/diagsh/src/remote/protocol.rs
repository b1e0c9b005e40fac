//! Wire messages for the JSON-lines management protocol.
//!
//! Each request and reply is one JSON object on its own line. Replies echo the
//! request `id`; a reply with a different id means the stream is out of step.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::RemoteError;

/// One management request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRequest {
    /// Correlation id, unique per connection.
    pub id: u64,
    /// Operation name.
    pub operation: String,
    /// Positional arguments.
    pub arguments: Vec<String>,
}

/// One management reply.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RemoteReply {
    /// The operation succeeded.
    Ok {
        /// Id of the request being answered.
        id: u64,
        /// Operation result; absent means `null`.
        #[serde(default)]
        result: Value,
    },
    /// The operation failed on the target.
    Error {
        /// Id of the request being answered.
        id: u64,
        /// Error kind.
        kind: String,
        /// Error message.
        message: String,
    },
}

impl RemoteReply {
    /// Id of the request this reply answers.
    #[must_use]
    pub const fn id(&self) -> u64 {
        match self {
            Self::Ok { id, .. } | Self::Error { id, .. } => *id,
        }
    }

    /// Converts the reply into the operation result.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Protocol`] if the reply answers a different
    /// request, or [`RemoteError::Rejected`] for error replies.
    pub fn into_result(self, expected: u64, operation: &str) -> Result<Value, RemoteError> {
        if self.id() != expected {
            return Err(RemoteError::Protocol {
                operation: operation.to_owned(),
                message: format!("expected reply id {expected}, received {}", self.id()),
            });
        }
        match self {
            Self::Ok { result, .. } => Ok(result),
            Self::Error { kind, message, .. } => Err(RemoteError::Rejected { kind, message }),
        }
    }
}
