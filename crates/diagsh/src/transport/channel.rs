//! The line-oriented channel contract shared by every transport.

use std::io::{self, BufRead};

use tracing::warn;

use super::{TRANSPORT_TARGET, TransportError};

/// Largest accepted input line, excluding the terminator.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Bidirectional, line-oriented text channel connecting a session to a user.
///
/// Any number of threads may call [`TransportChannel::print`] concurrently;
/// each call writes its text contiguously. At most one reader is active at a
/// time. After [`TransportChannel::close`] returns, reads yield `None`
/// (including a read that was blocked at the time) and writes are dropped.
pub trait TransportChannel: Send + Sync {
    /// Blocks until a full line is available. `Ok(None)` means end of input.
    ///
    /// The returned line has its terminator and any trailing carriage return
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the underlying stream fails or the line
    /// exceeds [`MAX_LINE_BYTES`].
    fn try_read_line(&self) -> Result<Option<String>, TransportError>;

    /// Writes `text` as one uninterrupted unit and flushes it.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] after close, or the stream error.
    fn try_print(&self, text: &str) -> Result<(), TransportError>;

    /// Closes the channel. Idempotent.
    fn close(&self);

    /// Short name used in logs.
    fn label(&self) -> &str;

    /// Reads a line, treating any failure as end of input after logging it.
    fn read_line(&self) -> Option<String> {
        match self.try_read_line() {
            Ok(line) => line,
            Err(error) => {
                warn!(
                    target: TRANSPORT_TARGET,
                    channel = self.label(),
                    error = %error,
                    "read failed; treating as end of input"
                );
                None
            }
        }
    }

    /// Prints `text`, logging and discarding any failure.
    fn print(&self, text: &str) {
        if let Err(error) = self.try_print(text) {
            warn!(
                target: TRANSPORT_TARGET,
                channel = self.label(),
                error = %error,
                "write dropped"
            );
        }
    }
}

/// Reads one newline-terminated line of at most `max` bytes.
///
/// A final unterminated line is returned as-is. Invalid UTF-8 is replaced
/// rather than rejected.
pub(crate) fn read_bounded_line<R>(
    reader: &mut R,
    max: usize,
) -> Result<Option<String>, TransportError>
where
    R: BufRead + ?Sized,
{
    let mut line = Vec::new();
    loop {
        let available = match reader.fill_buf() {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error.into()),
        };
        if available.is_empty() {
            return Ok((!line.is_empty()).then(|| decode(line)));
        }
        let (taken, complete) = match available.iter().position(|byte| *byte == b'\n') {
            Some(newline) => (newline + 1, true),
            None => (available.len(), false),
        };
        let content = if complete { taken - 1 } else { taken };
        line.extend_from_slice(&available[..content]);
        reader.consume(taken);
        if line.len() > max {
            return Err(TransportError::LineTooLong { max });
        }
        if complete {
            return Ok(Some(decode(line)));
        }
    }
}

fn decode(mut bytes: Vec<u8>) -> String {
    if bytes.last() == Some(&b'\r') {
        bytes.pop();
    }
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(error) => String::from_utf8_lossy(error.as_bytes()).into_owned(),
    }
}
