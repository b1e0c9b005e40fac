//! Hand-off point between the listener and whatever serves a connection.

use super::ConnectionStream;

/// Serves one accepted socket connection.
///
/// The listener calls [`ConnectionHandler::handle`] on a dedicated thread, so
/// implementations may block for the lifetime of the connection.
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Takes ownership of the connection. Implementations should not panic.
    fn handle(&self, stream: ConnectionStream);
}
