//! Interactive remote-diagnostics shell.
//!
//! An operator types commands on a terminal, or a client sends them over a
//! socket, and the shell runs them against the management interface of a
//! remote target process. Each client is served by a connection session that
//! owns one [`TransportChannel`] and one [`ManagementConnection`] and runs a
//! strictly sequential read-dispatch-respond loop on its own thread.
//!
//! Commands live in a process-wide [`CommandRegistry`]. Commands that need the
//! management connection only become available while at least one session is
//! connected; sessions announce this through the [`EventEmitter`], which the
//! registry listens to. Every dispatch yields an [`Output`], never an error,
//! and the output is rendered as text or JSON before it is written back.
//!
//! Closing a session's transport channel is the only way to cancel it; process
//! shutdown closes every open channel.

mod bootstrap;
pub mod command;
mod events;
mod health;
pub mod output;
mod process;
mod registry;
pub mod remote;
mod session;
mod telemetry;
pub mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Shell, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use command::{Command, CommandError, ExecutionContext};
pub use events::{ConnectionEvent, ConnectionEventKind, ConnectionListener, EventEmitter, SessionId};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use output::{Output, render};
pub use process::{LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_shell};
pub use registry::{CommandRegistry, RegistryError};
pub use remote::{ConnectionProvider, ManagementConnection};
pub use session::{
    CloseReason, Session, SessionError, SessionHandle, SessionSettings, SessionState,
    ShellServices,
};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::TransportChannel;

#[cfg(test)]
mod tests;
