//! JSON-lines management connections over TCP or Unix sockets.

use std::io::{self, BufReader, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use diagsh_config::SocketEndpoint;

#[cfg(unix)]
use socket2::{Domain, SockAddr, Socket, Type};
#[cfg(unix)]
use std::os::unix::net::UnixStream;

use super::protocol::{RemoteReply, RemoteRequest};
use super::{ConnectError, ConnectionProvider, ManagementConnection, REMOTE_TARGET, RemoteError};
use crate::transport::{ConnectionStream, TransportError, read_bounded_line};

const MAX_REPLY_BYTES: usize = 4 * 1024 * 1024;

/// Opens [`JsonlConnection`]s to a fixed endpoint.
#[derive(Debug, Clone)]
pub struct JsonlConnectionProvider {
    endpoint: SocketEndpoint,
    timeout: Duration,
}

impl JsonlConnectionProvider {
    /// Creates a provider. `timeout` bounds connecting and each reply.
    #[must_use]
    pub const fn new(endpoint: SocketEndpoint, timeout: Duration) -> Self {
        Self { endpoint, timeout }
    }
}

impl ConnectionProvider for JsonlConnectionProvider {
    fn connect(&self) -> Result<Box<dyn ManagementConnection>, ConnectError> {
        let stream = open_stream(&self.endpoint, self.timeout)?;
        stream
            .set_timeouts(Some(self.timeout))
            .map_err(|source| ConnectError::Connect {
                endpoint: self.endpoint.to_string(),
                source,
            })?;
        let connection = JsonlConnection::new(self.endpoint.to_string(), stream, self.timeout)
            .map_err(|source| ConnectError::Connect {
                endpoint: self.endpoint.to_string(),
                source,
            })?;
        debug!(target: REMOTE_TARGET, endpoint = %self.endpoint, "management connection open");
        Ok(Box::new(connection))
    }

    fn endpoint(&self) -> String {
        self.endpoint.to_string()
    }
}

fn open_stream(
    endpoint: &SocketEndpoint,
    timeout: Duration,
) -> Result<ConnectionStream, ConnectError> {
    match endpoint {
        SocketEndpoint::Tcp { host, port } => {
            let address = resolve_tcp_address(endpoint, host, *port)?;
            TcpStream::connect_timeout(&address, timeout)
                .map(ConnectionStream::Tcp)
                .map_err(|source| ConnectError::Connect {
                    endpoint: endpoint.to_string(),
                    source,
                })
        }
        #[cfg(unix)]
        SocketEndpoint::Unix { path } => {
            connect_unix(path.as_str(), timeout).map_err(|source| ConnectError::Connect {
                endpoint: endpoint.to_string(),
                source,
            })
        }
        #[cfg(not(unix))]
        SocketEndpoint::Unix { .. } => Err(ConnectError::UnsupportedUnix {
            endpoint: endpoint.to_string(),
        }),
    }
}

fn resolve_tcp_address(
    endpoint: &SocketEndpoint,
    host: &str,
    port: u16,
) -> Result<SocketAddr, ConnectError> {
    (host, port)
        .to_socket_addrs()
        .map_err(|source| ConnectError::Resolve {
            endpoint: endpoint.to_string(),
            source,
        })?
        .next()
        .ok_or_else(|| ConnectError::ResolveEmpty {
            endpoint: endpoint.to_string(),
        })
}

#[cfg(unix)]
fn connect_unix(path: &str, timeout: Duration) -> io::Result<ConnectionStream> {
    let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
    let address = SockAddr::unix(path)?;
    socket.connect_timeout(&address, timeout)?;
    let stream = UnixStream::from(std::os::fd::OwnedFd::from(socket));
    Ok(ConnectionStream::Unix(stream))
}

/// A management connection exchanging one JSON line per request and reply.
///
/// Any failure other than an error reply from the target leaves the stream in
/// an unknown position, so the connection marks itself dead and refuses
/// further calls.
#[derive(Debug)]
pub struct JsonlConnection {
    endpoint: String,
    reader: BufReader<ConnectionStream>,
    writer: ConnectionStream,
    timeout: Duration,
    next_id: u64,
    alive: bool,
}

impl JsonlConnection {
    /// Wraps an already connected stream.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the stream cannot be duplicated.
    pub fn new(endpoint: String, stream: ConnectionStream, timeout: Duration) -> io::Result<Self> {
        let reader = BufReader::new(stream.try_clone()?);
        Ok(Self {
            endpoint,
            reader,
            writer: stream,
            timeout,
            next_id: 0,
            alive: true,
        })
    }

    fn exchange(&mut self, operation: &str, arguments: &[String]) -> Result<Value, RemoteError> {
        self.next_id += 1;
        let id = self.next_id;
        let request = RemoteRequest {
            id,
            operation: operation.to_owned(),
            arguments: arguments.to_vec(),
        };
        let mut line = serde_json::to_vec(&request).map_err(|error| RemoteError::Protocol {
            operation: operation.to_owned(),
            message: error.to_string(),
        })?;
        line.push(b'\n');
        self.writer
            .write_all(&line)
            .and_then(|()| self.writer.flush())
            .map_err(|source| self.io_error(operation, source))?;

        let reply = read_bounded_line(&mut self.reader, MAX_REPLY_BYTES)
            .map_err(|error| self.read_error(operation, error))?
            .ok_or(RemoteError::Disconnected)?;
        let reply: RemoteReply =
            serde_json::from_str(&reply).map_err(|error| RemoteError::Protocol {
                operation: operation.to_owned(),
                message: error.to_string(),
            })?;
        reply.into_result(id, operation)
    }

    fn io_error(&self, operation: &str, source: io::Error) -> RemoteError {
        match source.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => RemoteError::Timeout {
                operation: operation.to_owned(),
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            },
            _ => RemoteError::Io {
                operation: operation.to_owned(),
                source,
            },
        }
    }

    fn read_error(&self, operation: &str, error: TransportError) -> RemoteError {
        match error {
            TransportError::Io(source) => self.io_error(operation, source),
            TransportError::LineTooLong { max } => RemoteError::Protocol {
                operation: operation.to_owned(),
                message: format!("reply exceeds {max} bytes"),
            },
            TransportError::Closed | TransportError::Poisoned { .. } => RemoteError::Disconnected,
        }
    }
}

impl ManagementConnection for JsonlConnection {
    fn endpoint(&self) -> String {
        self.endpoint.clone()
    }

    fn invoke(&mut self, operation: &str, arguments: &[String]) -> Result<Value, RemoteError> {
        if !self.alive {
            return Err(RemoteError::Disconnected);
        }
        let result = self.exchange(operation, arguments);
        if let Err(error) = &result
            && error.is_fatal()
        {
            warn!(
                target: REMOTE_TARGET,
                endpoint = %self.endpoint,
                operation,
                error = %error,
                "management connection lost"
            );
            self.alive = false;
            self.shutdown();
        }
        result
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn close(&mut self) {
        if !self.alive {
            return;
        }
        self.alive = false;
        self.shutdown();
        debug!(target: REMOTE_TARGET, endpoint = %self.endpoint, "management connection closed");
    }
}

impl JsonlConnection {
    fn shutdown(&self) {
        if let Err(error) = self.writer.shutdown()
            && error.kind() != io::ErrorKind::NotConnected
        {
            debug!(target: REMOTE_TARGET, error = %error, "shutdown failed");
        }
    }
}
