//! Process supervision test world shared across BDD scenarios.

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use diagsh_config::SessionMode;

use crate::bootstrap::ConfigLoader;
use crate::health::HealthReporter;
use crate::process::{LaunchError, LaunchPlan, ShutdownError, ShutdownSignal, run_shell_with};
use crate::remote::ConnectionProvider;
use crate::transport::test_utils::{BlockingInput, SharedBuffer};
use crate::transport::{TerminalChannel, TransportChannel};

use super::config_loader::{FailingConfigLoader, TestConfigLoader};
use super::connection::ScriptedProvider;
use super::reporter::RecordingHealthReporter;

pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);
pub const POLL_INTERVAL: Duration = Duration::from_millis(20);

pub type StepResult = Result<(), String>;

/// Shutdown signal released by the test.
#[derive(Clone, Default)]
pub struct TestShutdownSignal {
    state: Arc<(Mutex<bool>, Condvar)>,
}

impl TestShutdownSignal {
    pub fn trigger(&self) {
        let (fired, wake) = &*self.state;
        *fired.lock().expect("shutdown lock") = true;
        wake.notify_all();
    }
}

impl ShutdownSignal for TestShutdownSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        let (fired, wake) = &*self.state;
        let mut fired = fired.lock().expect("shutdown lock");
        while !*fired {
            fired = wake.wait(fired).expect("shutdown lock");
        }
        Ok(())
    }
}

/// A socket client talking to the running shell.
pub struct Client {
    reader: BufReader<UnixStream>,
    writer: UnixStream,
}

impl Client {
    pub fn send(&mut self, line: &str) -> StepResult {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .map_err(|error| format!("send failed: {error}"))
    }

    /// Reads lines until one equals `expected`.
    pub fn expect_line(&mut self, expected: &str) -> StepResult {
        let mut seen = Vec::new();
        loop {
            let mut line = String::new();
            let read = self
                .reader
                .read_line(&mut line)
                .map_err(|error| format!("read failed: {error}"))?;
            if read == 0 {
                return Err(format!("connection closed before {expected:?}; saw {seen:?}"));
            }
            let line = line.trim_end_matches('\n').to_owned();
            if line == expected {
                return Ok(());
            }
            seen.push(line);
        }
    }

    /// Reads until the server closes the connection.
    pub fn expect_closed(&mut self) -> StepResult {
        let mut rest = String::new();
        loop {
            let mut line = String::new();
            match self.reader.read_line(&mut line) {
                Ok(0) => return Ok(()),
                Ok(_) => rest.push_str(&line),
                Err(error) => return Err(format!("read failed: {error}; saw {rest:?}")),
            }
        }
    }
}

/// World running `run_shell_with` on a background thread.
pub struct ProcessWorld {
    loader: TestConfigLoader,
    failing_loader: bool,
    pub reporter: Arc<RecordingHealthReporter>,
    provider: Arc<ScriptedProvider>,
    shutdown: TestShutdownSignal,
    terminal_input: Option<Sender<Vec<u8>>>,
    terminal_output: SharedBuffer,
    terminal: Option<Arc<dyn TransportChannel>>,
    handle: Option<thread::JoinHandle<Result<(), LaunchError>>>,
    result: Option<Result<(), LaunchError>>,
    client: Option<Client>,
}

impl ProcessWorld {
    pub fn new() -> Self {
        Self {
            loader: TestConfigLoader::new(),
            failing_loader: false,
            reporter: Arc::new(RecordingHealthReporter::default()),
            provider: Arc::new(ScriptedProvider::healthy("tcp://127.0.0.1:9010")),
            shutdown: TestShutdownSignal::default(),
            terminal_input: None,
            terminal_output: SharedBuffer::default(),
            terminal: None,
            handle: None,
            result: None,
            client: None,
        }
    }

    pub fn use_mode(&mut self, mode: SessionMode) {
        self.loader = self.loader.clone().with_mode(mode);
        if mode.serves_terminal() {
            let (reader, sender) = BlockingInput::new();
            let channel =
                TerminalChannel::new("test-terminal", reader, self.terminal_output.clone())
                    .expect("terminal channel");
            self.terminal_input = Some(sender);
            self.terminal = Some(Arc::new(channel));
        }
    }

    pub const fn use_failing_loader(&mut self) {
        self.failing_loader = true;
    }

    pub fn use_unreachable_target(&mut self) {
        self.provider = Arc::new(ScriptedProvider::unreachable(
            "tcp://127.0.0.1:9010",
            "target not running",
        ));
    }

    pub fn type_line(&self, line: &str) {
        let sender = self.terminal_input.as_ref().expect("terminal configured");
        sender
            .send(format!("{line}\n").into_bytes())
            .expect("terminal input open");
    }

    pub fn start(&mut self) {
        assert!(self.handle.is_none(), "shell already running");
        let reporter: Arc<dyn HealthReporter> = self.reporter.clone();
        let provider: Arc<dyn ConnectionProvider> = self.provider.clone();
        let shutdown = self.shutdown.clone();
        let terminal = self.terminal.clone();
        let handle = if self.failing_loader {
            spawn_shell(FailingConfigLoader, reporter, shutdown, provider, terminal)
        } else {
            spawn_shell(self.loader.clone(), reporter, shutdown, provider, terminal)
        };
        self.handle = Some(handle);
    }

    /// Runs the shell to completion on the calling thread.
    pub fn run_to_completion(&mut self) {
        self.start();
        self.join();
    }

    pub fn trigger_shutdown(&self) {
        self.shutdown.trigger();
    }

    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            let deadline = Instant::now() + WAIT_TIMEOUT;
            while !handle.is_finished() {
                assert!(Instant::now() < deadline, "shell did not stop in time");
                thread::sleep(POLL_INTERVAL);
            }
            self.result = Some(handle.join().expect("shell thread panicked"));
        }
    }

    pub fn socket_path(&self) -> PathBuf {
        PathBuf::from(self.loader.socket_path())
    }

    pub fn connect(&mut self) -> StepResult {
        let deadline = Instant::now() + WAIT_TIMEOUT;
        let stream = loop {
            match UnixStream::connect(self.socket_path()) {
                Ok(stream) => break stream,
                Err(error) if Instant::now() >= deadline => {
                    return Err(format!("shell socket never accepted: {error}"));
                }
                Err(_) => thread::sleep(POLL_INTERVAL),
            }
        };
        stream
            .set_read_timeout(Some(WAIT_TIMEOUT))
            .map_err(|error| error.to_string())?;
        let writer = stream.try_clone().map_err(|error| error.to_string())?;
        self.client = Some(Client {
            reader: BufReader::new(stream),
            writer,
        });
        Ok(())
    }

    pub fn client(&mut self) -> Result<&mut Client, String> {
        self.client.as_mut().ok_or_else(|| String::from("no client connected"))
    }

    pub fn result(&self) -> Option<&Result<(), LaunchError>> {
        self.result.as_ref()
    }

    pub fn terminal_output(&self) -> String {
        self.terminal_output.contents()
    }
}

impl Default for ProcessWorld {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_shell<L>(
    loader: L,
    reporter: Arc<dyn HealthReporter>,
    shutdown: TestShutdownSignal,
    provider: Arc<dyn ConnectionProvider>,
    terminal: Option<Arc<dyn TransportChannel>>,
) -> thread::JoinHandle<Result<(), LaunchError>>
where
    L: ConfigLoader + 'static,
{
    thread::spawn(move || {
        run_shell_with(LaunchPlan {
            loader,
            reporter,
            shutdown,
            provider: Some(provider),
            terminal,
        })
    })
}
