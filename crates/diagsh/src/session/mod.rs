//! Connection sessions: one transport channel bound to one management
//! connection, driven by a sequential read-dispatch-respond loop.
//!
//! A session walks `Disconnected → Connecting → Connected → Closed`. If the
//! management connection cannot be acquired it stops in `Aborted` and never
//! starts a loop thread. Closing the transport channel from another thread is
//! the only way to cancel a running session.

mod errors;
mod state;

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use diagsh_config::{Config, OutputFormat};

use crate::command::{CommandLine, ExecutionContext};
use crate::events::{ConnectionEvent, EventEmitter, SessionId};
use crate::health::HealthReporter;
use crate::output::{Output, render};
use crate::registry::CommandRegistry;
use crate::remote::{ConnectionProvider, ManagementConnection};
use crate::transport::TransportChannel;

pub use errors::SessionError;
pub use state::SessionState;
use state::StateCell;

pub(crate) const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");

/// Why a session left the `Connected` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The transport channel reached end of input or failed to read.
    EndOfInput,
    /// The operator typed `exit` or `quit`.
    ExitRequested,
    /// The owning process closed the channel.
    CloseRequested,
}

impl CloseReason {
    /// Snake-case label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EndOfInput => "end_of_input",
            Self::ExitRequested => "exit_requested",
            Self::CloseRequested => "close_requested",
        }
    }
}

/// Per-session presentation settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    prompt: String,
    echo_input: bool,
    output_format: OutputFormat,
}

impl SessionSettings {
    /// Builds settings from explicit values.
    #[must_use]
    pub fn new(prompt: impl Into<String>, echo_input: bool, output_format: OutputFormat) -> Self {
        Self {
            prompt: prompt.into(),
            echo_input,
            output_format,
        }
    }

    /// Extracts the session settings from resolved configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.prompt(), config.echo_input(), config.output_format())
    }

    /// Prompt to write before each read, if any.
    ///
    /// JSON output never carries a prompt so that clients see one line per
    /// command.
    #[must_use]
    pub fn prompt(&self) -> Option<&str> {
        match self.output_format {
            OutputFormat::Text if !self.prompt.is_empty() => Some(self.prompt.as_str()),
            OutputFormat::Text | OutputFormat::Json => None,
        }
    }

    /// Whether the trimmed input line is echoed back.
    #[must_use]
    pub const fn echoes_input(&self) -> bool {
        self.echo_input && matches!(self.output_format, OutputFormat::Text)
    }

    /// Output encoding.
    #[must_use]
    pub const fn output_format(&self) -> OutputFormat {
        self.output_format
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Collaborators shared by every session in the process.
pub struct ShellServices {
    registry: Arc<CommandRegistry>,
    events: Arc<EventEmitter>,
    reporter: Arc<dyn HealthReporter>,
    provider: Arc<dyn ConnectionProvider>,
    settings: SessionSettings,
    next_id: AtomicU64,
}

impl ShellServices {
    /// Bundles the shared collaborators.
    #[must_use]
    pub const fn new(
        registry: Arc<CommandRegistry>,
        events: Arc<EventEmitter>,
        reporter: Arc<dyn HealthReporter>,
        provider: Arc<dyn ConnectionProvider>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            registry,
            events,
            reporter,
            provider,
            settings,
            next_id: AtomicU64::new(1),
        }
    }

    /// Shared command registry.
    #[must_use]
    pub const fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// Shared connection event emitter.
    #[must_use]
    pub const fn events(&self) -> &Arc<EventEmitter> {
        &self.events
    }

    /// Presentation settings applied to new sessions.
    #[must_use]
    pub const fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Creates a session bound to `channel` with a fresh identifier.
    #[must_use]
    pub fn session(self: &Arc<Self>, channel: Arc<dyn TransportChannel>) -> Session {
        let id = SessionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        Session {
            id,
            services: Arc::clone(self),
            channel,
            state: Arc::new(StateCell::new(id)),
            close_requested: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// A session that has not been started yet.
pub struct Session {
    id: SessionId,
    services: Arc<ShellServices>,
    channel: Arc<dyn TransportChannel>,
    state: Arc<StateCell>,
    close_requested: Arc<AtomicBool>,
}

impl Session {
    /// Session identifier.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// Acquires the management connection and starts the run loop thread.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Aborted`] when the connection cannot be
    /// acquired. The channel is closed and no thread is started in that case.
    /// Returns [`SessionError::Spawn`] if the loop thread cannot be created.
    pub fn start(self) -> Result<SessionHandle, SessionError> {
        let services = Arc::clone(&self.services);
        let endpoint = services.provider.endpoint();
        self.state.transition(SessionState::Connecting)?;
        services.reporter.session_connecting(self.id, &endpoint);

        let connection = match services.provider.connect() {
            Ok(connection) => connection,
            Err(error) => {
                self.state.transition(SessionState::Aborted)?;
                services.reporter.session_aborted(self.id, &error);
                let notice = Output::exception("ConnectError", error.to_string());
                self.channel
                    .print(&rendered_line(&notice, services.settings.output_format));
                self.channel.close();
                return Err(SessionError::Aborted {
                    session: self.id,
                    source: error,
                });
            }
        };

        self.state.transition(SessionState::Connected)?;
        let endpoint = connection.endpoint();
        services
            .events
            .emit(&ConnectionEvent::connected(self.id, endpoint.clone()));
        services
            .reporter
            .session_connected(self.id, &endpoint, self.channel.label());

        let handle = SessionHandle {
            id: self.id,
            state: Arc::clone(&self.state),
            channel: Arc::clone(&self.channel),
            close_requested: Arc::clone(&self.close_requested),
            thread: None,
        };
        let run_loop = RunLoop {
            id: self.id,
            services: self.services,
            channel: self.channel,
            connection,
            state: self.state,
            close_requested: self.close_requested,
            endpoint: endpoint.clone(),
            live: true,
        };

        match thread::Builder::new()
            .name(format!("session-{}", self.id))
            .spawn(move || run_loop.run())
        {
            Ok(thread) => Ok(SessionHandle {
                thread: Some(thread),
                ..handle
            }),
            Err(source) => {
                // The loop was dropped with the closure; undo what `Connected`
                // announced.
                handle.close_requested.store(true, Ordering::SeqCst);
                services
                    .events
                    .emit(&ConnectionEvent::disconnected(handle.id, endpoint));
                if let Err(error) = handle.state.transition(SessionState::Closed) {
                    warn!(target: SESSION_TARGET, error = %error, "failed to mark session closed");
                }
                handle.channel.close();
                services
                    .reporter
                    .session_closed(handle.id, CloseReason::CloseRequested);
                Err(SessionError::Spawn {
                    session: handle.id,
                    source,
                })
            }
        }
    }
}

/// Owner's view of a running session.
pub struct SessionHandle {
    id: SessionId,
    state: Arc<StateCell>,
    channel: Arc<dyn TransportChannel>,
    close_requested: Arc<AtomicBool>,
    thread: Option<JoinHandle<CloseReason>>,
}

impl SessionHandle {
    /// Session identifier.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// Requests the session to close by closing its transport channel.
    pub fn close(&self) {
        self.close_requested.store(true, Ordering::SeqCst);
        self.channel.close();
    }

    /// Returns `true` once the loop thread has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Waits for the loop thread and returns why the session closed.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Panicked`] if the loop thread panicked.
    pub fn join(mut self) -> Result<CloseReason, SessionError> {
        let session = self.id;
        self.thread.take().map_or(Ok(CloseReason::CloseRequested), |thread| {
            thread.join().map_err(|_| SessionError::Panicked { session })
        })
    }
}

struct RunLoop {
    id: SessionId,
    services: Arc<ShellServices>,
    channel: Arc<dyn TransportChannel>,
    connection: Box<dyn ManagementConnection>,
    state: Arc<StateCell>,
    close_requested: Arc<AtomicBool>,
    endpoint: String,
    live: bool,
}

impl RunLoop {
    fn run(mut self) -> CloseReason {
        let session = self.id;
        let reason = panic::catch_unwind(AssertUnwindSafe(|| self.serve())).unwrap_or_else(|_| {
            warn!(target: SESSION_TARGET, %session, "run loop panicked");
            CloseReason::EndOfInput
        });
        self.finish(reason);
        reason
    }

    fn serve(&mut self) -> CloseReason {
        let services = Arc::clone(&self.services);
        let settings = services.settings();
        loop {
            if self.close_requested.load(Ordering::SeqCst) {
                return CloseReason::CloseRequested;
            }
            if let Some(prompt) = settings.prompt() {
                self.channel.print(prompt);
            }
            let Some(line) = self.channel.read_line() else {
                return if self.close_requested.load(Ordering::SeqCst) {
                    CloseReason::CloseRequested
                } else {
                    CloseReason::EndOfInput
                };
            };
            let trimmed = line.trim();
            if settings.echoes_input() && !trimmed.is_empty() {
                self.channel.print(&format!("{trimmed}\n"));
            }

            match CommandLine::parse(trimmed) {
                CommandLine::Empty => {}
                CommandLine::Exit => return CloseReason::ExitRequested,
                CommandLine::Invoke { name, args } => {
                    debug!(
                        target: SESSION_TARGET,
                        session = %self.id,
                        command = %name,
                        args = args.len(),
                        "dispatching command"
                    );
                    let output = self.dispatch(&name, &args);
                    self.channel
                        .print(&rendered_line(&output, settings.output_format()));
                    self.check_liveness();
                }
            }
        }
    }

    fn dispatch(&mut self, name: &str, args: &[String]) -> Output {
        let mut ctx = ExecutionContext::new(self.id, Some(self.connection.as_mut()));
        self.services.registry.execute(name, args, &mut ctx)
    }

    fn check_liveness(&mut self) {
        if self.live && !self.connection.is_alive() {
            self.live = false;
            self.services
                .events
                .emit(&ConnectionEvent::disconnected(self.id, self.endpoint.clone()));
            self.services.reporter.remote_lost(self.id, &self.endpoint);
        }
    }

    fn finish(&mut self, reason: CloseReason) {
        if self.live {
            self.live = false;
            self.services
                .events
                .emit(&ConnectionEvent::disconnected(self.id, self.endpoint.clone()));
        }
        if let Err(error) = self.state.transition(SessionState::Closed) {
            warn!(target: SESSION_TARGET, error = %error, "failed to mark session closed");
        }
        self.channel.close();
        self.connection.close();
        info!(
            target: SESSION_TARGET,
            session = %self.id,
            reason = reason.as_str(),
            "session resources released"
        );
        self.services.reporter.session_closed(self.id, reason);
    }
}

fn rendered_line(output: &Output, format: OutputFormat) -> String {
    let mut text = render(output, format);
    text.push('\n');
    text
}
