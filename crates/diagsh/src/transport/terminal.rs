//! Transport channel over the process's standard streams.

use std::io::{self, BufRead, BufReader, Write};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use tracing::debug;

use super::channel::{MAX_LINE_BYTES, TransportChannel, read_bounded_line};
use super::{TRANSPORT_TARGET, TransportError};

enum InputEvent {
    Line(String),
    End,
    Failed(TransportError),
    Closed,
}

/// A [`TransportChannel`] reading lines from an input stream and writing to
/// an output stream, normally standard input and output.
///
/// Standard input cannot be interrupted portably, so a dedicated thread pumps
/// lines into a queue. Closing the channel posts a sentinel to the same queue,
/// which releases a reader blocked on it.
pub struct TerminalChannel {
    label: String,
    input: Mutex<Receiver<InputEvent>>,
    wake: Sender<InputEvent>,
    output: Mutex<Box<dyn Write + Send>>,
    closed: AtomicBool,
    exhausted: AtomicBool,
}

impl TerminalChannel {
    /// Builds a channel over standard input and standard output.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if the input thread cannot be spawned.
    pub fn stdio() -> Result<Self, TransportError> {
        Self::new("terminal", BufReader::new(io::stdin()), io::stdout())
    }

    /// Builds a channel over arbitrary streams.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if the input thread cannot be spawned.
    pub fn new<R, W>(
        label: impl Into<String>,
        mut input: R,
        output: W,
    ) -> Result<Self, TransportError>
    where
        R: BufRead + Send + 'static,
        W: Write + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        let pump = sender.clone();
        thread::Builder::new()
            .name(String::from("terminal-input"))
            .spawn(move || pump_lines(&mut input, &pump))?;
        Ok(Self {
            label: label.into(),
            input: Mutex::new(receiver),
            wake: sender,
            output: Mutex::new(Box::new(output)),
            closed: AtomicBool::new(false),
            exhausted: AtomicBool::new(false),
        })
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

fn pump_lines<R: BufRead>(input: &mut R, sink: &Sender<InputEvent>) {
    loop {
        let event = match read_bounded_line(input, MAX_LINE_BYTES) {
            Ok(Some(line)) => InputEvent::Line(line),
            Ok(None) => InputEvent::End,
            Err(error) => InputEvent::Failed(error),
        };
        let last = !matches!(event, InputEvent::Line(_));
        if sink.send(event).is_err() || last {
            return;
        }
    }
}

impl TransportChannel for TerminalChannel {
    fn try_read_line(&self) -> Result<Option<String>, TransportError> {
        let receiver = self
            .input
            .lock()
            .map_err(|_| TransportError::Poisoned { half: "read" })?;
        if self.is_closed() || self.exhausted.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let event = receiver.recv();
        if self.is_closed() {
            return Ok(None);
        }
        match event {
            Ok(InputEvent::Line(line)) => Ok(Some(line)),
            Ok(InputEvent::Failed(error)) => {
                self.exhausted.store(true, Ordering::SeqCst);
                Err(error)
            }
            Ok(InputEvent::End | InputEvent::Closed) | Err(_) => {
                self.exhausted.store(true, Ordering::SeqCst);
                Ok(None)
            }
        }
    }

    fn try_print(&self, text: &str) -> Result<(), TransportError> {
        let mut output = self
            .output
            .lock()
            .map_err(|_| TransportError::Poisoned { half: "write" })?;
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        output.write_all(text.as_bytes())?;
        output.flush()?;
        Ok(())
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if self.wake.send(InputEvent::Closed).is_err() {
            debug!(target: TRANSPORT_TARGET, channel = %self.label, "input queue already gone");
        }
        if let Ok(mut output) = self.output.lock()
            && let Err(error) = output.flush()
        {
            debug!(
                target: TRANSPORT_TARGET,
                channel = %self.label,
                error = %error,
                "final flush failed"
            );
        }
        debug!(target: TRANSPORT_TARGET, channel = %self.label, "terminal channel closed");
    }

    fn label(&self) -> &str {
        &self.label
    }
}
