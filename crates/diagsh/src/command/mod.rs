//! The command contract and the commands shipped with the shell.
//!
//! A [`Command`] is a named unit of work. The registry calls
//! [`Command::validate`] before [`Command::execute`], and converts any error
//! returned by `execute` into an [`Output::ExceptionInfo`], so commands report
//! failures by returning [`CommandError`] rather than formatting them.

mod builtin;
mod errors;
mod line;
mod remote;

use crate::events::SessionId;
use crate::output::Output;
use crate::remote::ManagementConnection;

pub use self::builtin::{EchoCommand, HelpCommand, StatusCommand, builtin_commands};
pub use self::errors::CommandError;
pub use self::line::CommandLine;
pub use self::remote::{
    GcCommand, InvokeCommand, PingCommand, PropertiesCommand, ThreadsCommand, reply_to_output,
};

/// Condition under which a command may be dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Availability {
    /// Always dispatchable.
    #[default]
    Always,
    /// Dispatchable only while at least one session holds a live
    /// management connection.
    RequiresConnection,
}

/// A named unit of work producing an [`Output`].
pub trait Command: Send + Sync {
    /// Unique, case-sensitive name used to invoke the command.
    fn name(&self) -> &str;

    /// One-line description shown by `help`.
    fn summary(&self) -> &str;

    /// Argument synopsis, for example `properties [prefix]`.
    fn usage(&self) -> &str {
        self.name()
    }

    /// When the command may be dispatched.
    fn availability(&self) -> Availability {
        Availability::Always
    }

    /// Checks the arguments. Must be side-effect free and must not panic.
    fn validate(&self, args: &[String]) -> bool;

    /// Runs the command. Called at most once per accepted input line.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] when the command cannot complete; the registry
    /// reports it to the user as [`Output::ExceptionInfo`].
    fn execute(
        &self,
        ctx: &mut ExecutionContext<'_>,
        args: &[String],
    ) -> Result<Output, CommandError>;
}

/// Name, summary and usage of a dispatchable command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSummary {
    /// Command name.
    pub name: String,
    /// One-line description.
    pub summary: String,
    /// Argument synopsis.
    pub usage: String,
}

impl CommandSummary {
    /// Captures the descriptive parts of `command`.
    #[must_use]
    pub fn of(command: &dyn Command) -> Self {
        Self {
            name: command.name().to_owned(),
            summary: command.summary().to_owned(),
            usage: command.usage().to_owned(),
        }
    }
}

/// What a command can see and use while executing.
pub struct ExecutionContext<'a> {
    session: SessionId,
    connection: Option<&'a mut dyn ManagementConnection>,
    pub(crate) commands: Vec<CommandSummary>,
}

impl<'a> ExecutionContext<'a> {
    /// Context for `session`, optionally holding its management connection.
    #[must_use]
    pub const fn new(
        session: SessionId,
        connection: Option<&'a mut dyn ManagementConnection>,
    ) -> Self {
        Self {
            session,
            connection,
            commands: Vec::new(),
        }
    }

    /// Session executing the command.
    #[must_use]
    pub const fn session(&self) -> SessionId {
        self.session
    }

    /// The session's management connection.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::NotConnected`] when the session has none.
    pub fn connection(&mut self) -> Result<&mut (dyn ManagementConnection + 'a), CommandError> {
        self.connection
            .as_deref_mut()
            .ok_or(CommandError::NotConnected)
    }

    /// Read-only view of the management connection, if any.
    #[must_use]
    pub fn peek_connection(&self) -> Option<&(dyn ManagementConnection + 'a)> {
        self.connection.as_deref()
    }

    /// Commands that were available when this command was dispatched,
    /// ordered by name.
    #[must_use]
    pub fn commands(&self) -> &[CommandSummary] {
        &self.commands
    }
}
