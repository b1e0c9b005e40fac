//! Error types for transport channels and the socket listener.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Failures reading from or writing to a transport channel.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The underlying stream reported an error.
    #[error("transport I/O failed: {0}")]
    Io(#[from] io::Error),
    /// A single input line exceeded the size limit.
    #[error("input line exceeds {max} bytes")]
    LineTooLong {
        /// Configured limit in bytes.
        max: usize,
    },
    /// The channel was closed before or during the operation.
    #[error("transport channel is closed")]
    Closed,
    /// A thread panicked while holding one of the channel's permits.
    #[error("transport {half} permit poisoned")]
    Poisoned {
        /// `"read"` or `"write"`.
        half: &'static str,
    },
}

/// Errors surfaced while binding or running the socket listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Host name resolution failed.
    #[error("failed to resolve TCP address {host}:{port}: {source}")]
    Resolve {
        /// Host that failed to resolve.
        host: String,
        /// Requested port.
        port: u16,
        /// Underlying resolver error.
        #[source]
        source: io::Error,
    },
    /// Resolution produced no usable address.
    #[error("no TCP addresses resolved for {host}:{port}")]
    ResolveEmpty {
        /// Host that resolved to nothing.
        host: String,
        /// Requested port.
        port: u16,
    },
    /// Binding the TCP socket failed.
    #[error("failed to bind TCP listener at {addr}: {source}")]
    BindTcp {
        /// Address that could not be bound.
        addr: SocketAddr,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// Switching the listener to non-blocking accepts failed.
    #[error("failed to enable non-blocking listener: {source}")]
    NonBlocking {
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// Spawning the accept thread failed.
    #[error("failed to spawn listener thread: {source}")]
    Spawn {
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// Unix sockets are not available on this platform.
    #[cfg(not(unix))]
    #[error("unix sockets are unsupported for endpoint {endpoint}")]
    UnsupportedUnix {
        /// Configured endpoint.
        endpoint: String,
    },
    /// Binding the Unix socket failed.
    #[cfg(unix)]
    #[error("failed to bind unix listener at {path}: {source}")]
    BindUnix {
        /// Socket path.
        path: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// Another process is already serving the Unix socket.
    #[cfg(unix)]
    #[error("existing unix socket {path} is already in use")]
    UnixInUse {
        /// Socket path.
        path: String,
    },
    /// The configured path exists but is not a socket.
    #[cfg(unix)]
    #[error("unix socket path {path} is not a socket")]
    UnixNotSocket {
        /// Offending path.
        path: String,
    },
    /// Reading metadata for an existing socket path failed.
    #[cfg(unix)]
    #[error("failed to read metadata for unix socket {path}: {source}")]
    UnixMetadata {
        /// Socket path.
        path: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// Probing an existing Unix socket failed unexpectedly.
    #[cfg(unix)]
    #[error("failed to connect to existing unix socket {path}: {source}")]
    UnixConnect {
        /// Socket path.
        path: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// Removing a stale Unix socket failed.
    #[cfg(unix)]
    #[error("failed to remove stale unix socket {path}: {source}")]
    UnixCleanup {
        /// Socket path.
        path: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The accept thread panicked.
    #[error("listener thread panicked")]
    ThreadPanic,
}
