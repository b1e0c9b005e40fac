//! Supervises shell launch sequencing and runtime orchestration.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::remote::ConnectionProvider;
use crate::session::{CloseReason, SessionError, ShellServices};
use crate::transport::{
    ListenerHandle, OpenChannels, SocketListener, TerminalChannel, TransportChannel,
};

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::handler::SessionConnectionHandler;
use super::shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};

/// Conditions that end the wait in [`run_shell_with`].
pub(crate) enum ShellEvent {
    /// A termination signal arrived.
    Shutdown,
    /// Signal handling could not be installed.
    SignalFailed(ShutdownError),
    /// The terminal session finished.
    TerminalClosed(Result<CloseReason, SessionError>),
    /// A socket session aborted.
    SessionFailed(SessionError),
}

/// Collaborators required to launch the shell runtime.
pub(crate) struct LaunchPlan<L, S> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) shutdown: S,
    /// Overrides the provider built from the configured target.
    pub(crate) provider: Option<Arc<dyn ConnectionProvider>>,
    /// Overrides the standard-stream terminal channel.
    pub(crate) terminal: Option<Arc<dyn TransportChannel>>,
}

/// Runs the shell using the production collaborators.
///
/// # Errors
///
/// Returns [`LaunchError`] when bootstrap fails, a transport cannot be
/// started, or a session aborts.
pub fn run_shell() -> Result<(), LaunchError> {
    run_shell_with(LaunchPlan {
        loader: SystemConfigLoader,
        reporter: Arc::new(StructuredHealthReporter::new()),
        shutdown: SystemShutdownSignal::new(),
        provider: None,
        terminal: None,
    })
}

/// Runs the shell with injected collaborators.
pub(crate) fn run_shell_with<L, S>(plan: LaunchPlan<L, S>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal + 'static,
{
    let LaunchPlan {
        loader,
        reporter,
        shutdown,
        provider,
        terminal,
    } = plan;

    let shell = bootstrap_with(&loader, reporter)?;
    let mode = shell.config().mode();
    let listen = shell.config().listen_socket().clone();
    info!(
        target: PROCESS_TARGET,
        %mode,
        target_endpoint = %shell.config().target(),
        "starting shell runtime"
    );
    let provider = provider.unwrap_or_else(|| shell.default_provider());
    let services = shell.into_services(provider);

    let (notify, events) = mpsc::channel();
    let mut runtime = Runtime::new(services);
    let served = runtime
        .watch_signals(shutdown, notify.clone())
        .and_then(|()| {
            if mode.serves_socket() {
                runtime.serve_socket(SocketListener::bind(&listen)?, notify.clone())?;
            }
            if mode.serves_terminal() {
                let channel = match terminal {
                    Some(channel) => channel,
                    None => Arc::new(TerminalChannel::stdio()?),
                };
                runtime.serve_terminal(channel, notify.clone())?;
            }
            Ok(())
        });
    drop(notify);

    let outcome = served.and_then(|()| wait_for_exit(&events));
    let stopped = runtime.stop();
    info!(target: PROCESS_TARGET, "shutdown sequence completed");
    outcome.and(stopped)
}

fn wait_for_exit(events: &Receiver<ShellEvent>) -> Result<(), LaunchError> {
    match events.recv() {
        Ok(ShellEvent::Shutdown) => Ok(()),
        Ok(ShellEvent::SignalFailed(error)) => Err(error.into()),
        Ok(ShellEvent::TerminalClosed(outcome)) => {
            let reason = outcome?;
            info!(target: PROCESS_TARGET, reason = reason.as_str(), "terminal session ended");
            Ok(())
        }
        Ok(ShellEvent::SessionFailed(error)) => Err(error.into()),
        // Every producer is gone, so nothing can end the wait any more.
        Err(_) => Ok(()),
    }
}

struct Runtime {
    services: Arc<ShellServices>,
    channels: Arc<OpenChannels>,
    listener: Option<ListenerHandle>,
    terminal: Option<JoinHandle<()>>,
}

impl Runtime {
    fn new(services: Arc<ShellServices>) -> Self {
        Self {
            services,
            channels: Arc::new(OpenChannels::default()),
            listener: None,
            terminal: None,
        }
    }

    fn watch_signals<S>(&self, shutdown: S, notify: Sender<ShellEvent>) -> Result<(), LaunchError>
    where
        S: ShutdownSignal + 'static,
    {
        // Detached: a signal listener cannot be woken without a signal.
        spawn("shutdown-signal", move || {
            let event = shutdown
                .wait()
                .map_or_else(ShellEvent::SignalFailed, |()| ShellEvent::Shutdown);
            if notify.send(event).is_err() {
                debug!(target: PROCESS_TARGET, "shell already stopping");
            }
        })
        .map(drop)
    }

    fn serve_socket(
        &mut self,
        listener: SocketListener,
        notify: Sender<ShellEvent>,
    ) -> Result<(), LaunchError> {
        info!(target: PROCESS_TARGET, endpoint = %listener.endpoint(), "serving socket sessions");
        let handler = Arc::new(SessionConnectionHandler::new(
            Arc::clone(&self.services),
            Arc::clone(&self.channels),
            notify,
        ));
        self.listener = Some(listener.start(handler)?);
        Ok(())
    }

    fn serve_terminal(
        &mut self,
        channel: Arc<dyn TransportChannel>,
        notify: Sender<ShellEvent>,
    ) -> Result<(), LaunchError> {
        let ticket = self.channels.track(Arc::clone(&channel));
        let handle = match self.services.session(channel).start() {
            Ok(handle) => handle,
            Err(error) => {
                self.channels.release(ticket);
                return Err(error.into());
            }
        };
        let channels = Arc::clone(&self.channels);
        self.terminal = Some(spawn("terminal-session", move || {
            let outcome = handle.join();
            channels.release(ticket);
            if notify.send(ShellEvent::TerminalClosed(outcome)).is_err() {
                debug!(target: PROCESS_TARGET, "terminal session ended during shutdown");
            }
        })?);
        Ok(())
    }

    fn stop(self) -> Result<(), LaunchError> {
        let listener_result = self.listener.map_or(Ok(()), |listener| {
            listener.shutdown();
            listener.join()
        });
        self.channels.close_all();
        if let Some(terminal) = self.terminal
            && terminal.join().is_err()
        {
            warn!(target: PROCESS_TARGET, "terminal supervisor panicked");
        }
        listener_result.map_err(LaunchError::from)
    }
}

fn spawn<F>(name: &'static str, body: F) -> Result<JoinHandle<()>, LaunchError>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_owned())
        .spawn(body)
        .map_err(|source| LaunchError::Thread { name, source })
}
