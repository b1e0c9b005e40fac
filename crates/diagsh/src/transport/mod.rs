//! Line-oriented transport channels and the socket listener that feeds them.
//!
//! A session talks to its user through a [`TransportChannel`]. Two
//! implementations exist: [`TerminalChannel`] over the process's standard
//! streams and [`SocketChannel`] over an accepted TCP or Unix connection.
//! [`SocketListener`] accepts those connections on a background thread.

mod channel;
mod errors;
mod handler;
mod listener;
#[cfg(test)]
mod listener_tests;
mod socket;
mod stream;
mod terminal;
#[cfg(test)]
pub(crate) mod test_utils;
mod tracker;

pub(crate) use self::channel::read_bounded_line;
pub use self::channel::{MAX_LINE_BYTES, TransportChannel};
pub use self::errors::{ListenerError, TransportError};
pub use self::handler::ConnectionHandler;
pub use self::listener::{ListenerHandle, SocketListener};
pub use self::socket::SocketChannel;
pub use self::stream::ConnectionStream;
pub use self::terminal::TerminalChannel;
pub use self::tracker::{ChannelTicket, OpenChannels};

const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
