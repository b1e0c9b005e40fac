//! The management connection to the diagnosed target.
//!
//! A session opens one [`ManagementConnection`] through a
//! [`ConnectionProvider`] and hands it to every command it executes. The
//! default provider speaks a JSON-lines protocol over TCP or a Unix socket;
//! see [`JsonlConnectionProvider`].

mod errors;
mod jsonl;
mod protocol;

use serde_json::Value;

pub use self::errors::{ConnectError, RemoteError};
pub use self::jsonl::{JsonlConnection, JsonlConnectionProvider};
pub use self::protocol::{RemoteReply, RemoteRequest};

const REMOTE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::remote");

/// An open channel to the target's management interface.
pub trait ManagementConnection: Send {
    /// Display form of the endpoint this connection reached.
    fn endpoint(&self) -> String;

    /// Invokes a management operation and returns its result value.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] when the target rejects the operation or the
    /// connection fails. Failures other than [`RemoteError::Rejected`] leave
    /// the connection dead.
    fn invoke(&mut self, operation: &str, arguments: &[String]) -> Result<Value, RemoteError>;

    /// Returns `false` once the connection has been lost or closed.
    fn is_alive(&self) -> bool;

    /// Releases the connection. Idempotent.
    fn close(&mut self);
}

/// Opens management connections.
pub trait ConnectionProvider: Send + Sync {
    /// Establishes a new connection.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError`] when the target cannot be reached.
    fn connect(&self) -> Result<Box<dyn ManagementConnection>, ConnectError>;

    /// Display form of the endpoint `connect` will try.
    fn endpoint(&self) -> String;
}
