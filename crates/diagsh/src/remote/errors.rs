use std::io;

use thiserror::Error;

/// Failures opening a management connection.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Host name resolution failed.
    #[error("failed to resolve {endpoint}: {source}")]
    Resolve {
        /// Endpoint being resolved.
        endpoint: String,
        /// Underlying resolver error.
        #[source]
        source: io::Error,
    },
    /// Resolution produced no addresses.
    #[error("no addresses resolved for {endpoint}")]
    ResolveEmpty {
        /// Endpoint that resolved to nothing.
        endpoint: String,
    },
    /// The socket could not be connected or configured.
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        /// Endpoint that refused or timed out.
        endpoint: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// Unix sockets are not available on this platform.
    #[error("unix sockets are unsupported for {endpoint}")]
    UnsupportedUnix {
        /// Configured endpoint.
        endpoint: String,
    },
    /// A provider-specific reason the target is unavailable.
    #[error("{endpoint} is unavailable: {reason}")]
    Unavailable {
        /// Endpoint that could not be reached.
        endpoint: String,
        /// Provider-supplied explanation.
        reason: String,
    },
}

/// Failures raised while invoking a management operation.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The connection was closed or lost before the call.
    #[error("management connection is closed")]
    Disconnected,
    /// Reading or writing the connection failed.
    #[error("'{operation}' failed: {source}")]
    Io {
        /// Operation being invoked.
        operation: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// No reply arrived within the configured timeout.
    #[error("'{operation}' timed out after {timeout_ms} ms")]
    Timeout {
        /// Operation being invoked.
        operation: String,
        /// Configured timeout.
        timeout_ms: u64,
    },
    /// The reply could not be decoded or did not match the request.
    #[error("malformed reply to '{operation}': {message}")]
    Protocol {
        /// Operation being invoked.
        operation: String,
        /// What was wrong with the reply.
        message: String,
    },
    /// The target processed the request and reported an error.
    #[error("{kind}: {message}")]
    Rejected {
        /// Error kind reported by the target.
        kind: String,
        /// Error message reported by the target.
        message: String,
    },
}

impl RemoteError {
    /// Returns `true` when the connection can no longer be used.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::Rejected { .. })
    }
}
