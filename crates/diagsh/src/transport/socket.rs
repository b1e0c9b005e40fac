//! Transport channel over an accepted stream socket.

use std::io::{BufReader, ErrorKind, Write};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use super::channel::{MAX_LINE_BYTES, TransportChannel, read_bounded_line};
use super::{ConnectionStream, TRANSPORT_TARGET, TransportError};

/// A [`TransportChannel`] backed by one TCP or Unix stream connection.
///
/// Reads and writes use separate clones of the socket so a blocked reader
/// never delays output. A third clone is kept to shut the socket down, which
/// wakes a blocked reader when the channel is closed from another thread.
#[derive(Debug)]
pub struct SocketChannel {
    label: String,
    reader: Mutex<Option<BufReader<ConnectionStream>>>,
    writer: Mutex<Option<ConnectionStream>>,
    control: ConnectionStream,
    closed: AtomicBool,
}

impl SocketChannel {
    /// Wraps an accepted connection.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if the socket cannot be duplicated.
    pub fn new(stream: ConnectionStream) -> Result<Self, TransportError> {
        let reader = stream.try_clone()?;
        let writer = stream.try_clone()?;
        Ok(Self {
            label: stream.peer_label(),
            reader: Mutex::new(Some(BufReader::new(reader))),
            writer: Mutex::new(Some(writer)),
            control: stream,
            closed: AtomicBool::new(false),
        })
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl TransportChannel for SocketChannel {
    fn try_read_line(&self) -> Result<Option<String>, TransportError> {
        let mut permit = self
            .reader
            .lock()
            .map_err(|_| TransportError::Poisoned { half: "read" })?;
        if self.is_closed() {
            permit.take();
            return Ok(None);
        }
        let Some(reader) = permit.as_mut() else {
            return Ok(None);
        };
        let line = read_bounded_line(reader, MAX_LINE_BYTES);
        if self.is_closed() {
            permit.take();
            return Ok(None);
        }
        line
    }

    fn try_print(&self, text: &str) -> Result<(), TransportError> {
        let mut permit = self
            .writer
            .lock()
            .map_err(|_| TransportError::Poisoned { half: "write" })?;
        if self.is_closed() {
            permit.take();
            return Err(TransportError::Closed);
        }
        let writer = permit.as_mut().ok_or(TransportError::Closed)?;
        writer.write_all(text.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(error) = self.control.shutdown()
            && error.kind() != ErrorKind::NotConnected
        {
            debug!(
                target: TRANSPORT_TARGET,
                channel = %self.label,
                error = %error,
                "socket shutdown failed"
            );
        }
        if let Ok(mut writer) = self.writer.lock() {
            writer.take();
        }
        // A blocked reader drops its own half once it observes the flag.
        if let Ok(mut reader) = self.reader.try_lock() {
            reader.take();
        }
        debug!(target: TRANSPORT_TARGET, channel = %self.label, "socket channel closed");
    }

    fn label(&self) -> &str {
        &self.label
    }
}
