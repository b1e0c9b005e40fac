//! BDD world for connection session scenarios: one terminal-style channel
//! fed line by line, a scripted target, and the shared registry.

use std::cell::RefCell;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;
use std::time::{Duration, Instant};

use diagsh_config::OutputFormat;

use crate::command::builtin_commands;
use crate::events::EventEmitter;
use crate::registry::CommandRegistry;
use crate::session::{
    CloseReason, SessionError, SessionHandle, SessionSettings, SessionState, ShellServices,
};
use crate::transport::TerminalChannel;
use crate::transport::test_utils::{BlockingInput, SharedBuffer};

use super::connection::{ScriptedProvider, TargetLedger};
use super::reporter::RecordingHealthReporter;

pub const ENDPOINT: &str = "tcp://127.0.0.1:9010";
const WAIT_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Scenario world shared across session steps.
pub struct SessionWorld {
    pub reporter: Arc<RecordingHealthReporter>,
    pub registry: Arc<CommandRegistry>,
    provider: Option<ScriptedProvider>,
    ledger: TargetLedger,
    format: OutputFormat,
    output: SharedBuffer,
    input: Option<Sender<Vec<u8>>>,
    handle: Option<SessionHandle>,
    start_error: Option<SessionError>,
    outcome: Option<Result<CloseReason, SessionError>>,
    final_state: Option<SessionState>,
}

impl SessionWorld {
    pub fn new() -> Self {
        let mut registry = CommandRegistry::new();
        registry
            .register_all(builtin_commands())
            .expect("register builtins");
        let provider = ScriptedProvider::healthy(ENDPOINT);
        Self {
            reporter: Arc::new(RecordingHealthReporter::default()),
            registry: Arc::new(registry),
            ledger: provider.ledger(),
            provider: Some(provider),
            format: OutputFormat::Text,
            output: SharedBuffer::default(),
            input: None,
            handle: None,
            start_error: None,
            outcome: None,
            final_state: None,
        }
    }

    pub fn use_unreachable_target(&mut self) {
        let provider = ScriptedProvider::unreachable(ENDPOINT, "target not running");
        self.ledger = provider.ledger();
        self.provider = Some(provider);
    }

    pub const fn use_json_output(&mut self) {
        self.format = OutputFormat::Json;
    }

    /// Starts the session; panics if called twice.
    pub fn start(&mut self) {
        let provider = self.provider.take().expect("session already started");
        let events = Arc::new(EventEmitter::new());
        events.add_listener(self.registry.clone());
        let services = Arc::new(ShellServices::new(
            Arc::clone(&self.registry),
            events,
            self.reporter.clone(),
            Arc::new(provider),
            SessionSettings::new("diag> ", true, self.format),
        ));

        let (reader, sender) = BlockingInput::new();
        let channel = TerminalChannel::new("test-terminal", reader, self.output.clone())
            .expect("terminal channel");
        self.input = Some(sender);

        match services.session(Arc::new(channel)).start() {
            Ok(handle) => self.handle = Some(handle),
            Err(error) => self.start_error = Some(error),
        }
    }

    pub fn send_line(&self, line: &str) {
        let sender = self.input.as_ref().expect("input open");
        // The session may already have exited; a dropped receiver is fine.
        let _sent = sender.send(format!("{line}\n").into_bytes()).is_ok();
    }

    /// Ends input and waits for the session to finish.
    pub fn end_input(&mut self) {
        self.input = None;
        self.wait();
    }

    /// Closes the channel from outside and waits for the session.
    pub fn close_session(&mut self) {
        if let Some(handle) = &self.handle {
            handle.close();
        }
        self.wait();
    }

    pub fn wait(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let deadline = Instant::now() + WAIT_TIMEOUT;
        while !handle.is_finished() {
            assert!(Instant::now() < deadline, "session did not finish in time");
            thread::sleep(POLL_INTERVAL);
        }
        self.final_state = Some(handle.state());
        self.outcome = Some(handle.join());
    }

    pub fn sever_target(&self) {
        self.ledger.sever();
    }

    pub const fn ledger(&self) -> &TargetLedger {
        &self.ledger
    }

    pub const fn start_error(&self) -> Option<&SessionError> {
        self.start_error.as_ref()
    }

    pub fn close_reason(&self) -> Option<CloseReason> {
        self.outcome.as_ref().and_then(|outcome| outcome.as_ref().ok().copied())
    }

    /// State of the running session, or the state it finished in.
    pub fn state(&self) -> Option<SessionState> {
        self.handle
            .as_ref()
            .map(SessionHandle::state)
            .or(self.final_state)
    }

    pub const fn has_running_handle(&self) -> bool {
        self.handle.is_some()
    }

    pub fn output(&self) -> String {
        self.output.contents()
    }

    pub fn output_lines(&self) -> Vec<String> {
        self.output().lines().map(str::to_owned).collect()
    }
}

impl Default for SessionWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Default session world fixture.
pub fn world() -> RefCell<SessionWorld> {
    RefCell::new(SessionWorld::new())
}
