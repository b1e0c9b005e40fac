//! Command registry and dispatch.
//!
//! The registry owns every command registered at startup and tracks which of
//! them are currently available. It is shared by all sessions and listens for
//! connection events: connection-dependent commands are available while at
//! least one session holds a live management connection.
//!
//! Dispatch never fails past this boundary. [`CommandRegistry::execute`]
//! always yields an [`Output`]: unknown or unavailable commands and rejected
//! arguments become [`Output::Failure`], and command errors or panics become
//! [`Output::ExceptionInfo`].

mod errors;

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, error, info};

use crate::command::{Availability, Command, CommandSummary, ExecutionContext};
use crate::events::{ConnectionEvent, ConnectionEventKind, ConnectionListener, SessionId};
use crate::output::Output;

pub use self::errors::RegistryError;

const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

/// Kind label reported when a command panics.
pub const PANIC_KIND: &str = "panic";

#[derive(Debug, Default)]
struct AvailabilityState {
    live_sessions: BTreeSet<SessionId>,
    available: BTreeSet<String>,
}

/// Name-to-command mapping plus the derived set of available commands.
#[derive(Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, Arc<dyn Command>>,
    state: RwLock<AvailabilityState>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a command. Registration happens before the registry is shared.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateName`] if the name is taken; the
    /// registry is left unchanged.
    pub fn register(&mut self, command: Arc<dyn Command>) -> Result<(), RegistryError> {
        let name = command.name().to_owned();
        if self.is_registered(&name) {
            return Err(RegistryError::DuplicateName { name });
        }
        debug!(target: REGISTRY_TARGET, command = %name, "registered command");
        self.commands.insert(name, command);
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        state.available = compute_available(&self.commands, !state.live_sessions.is_empty());
        Ok(())
    }

    /// Registers every command in `commands`, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateName`] for the first clashing name.
    pub fn register_all<I>(&mut self, commands: I) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = Arc<dyn Command>>,
    {
        commands
            .into_iter()
            .try_for_each(|command| self.register(command))
    }

    /// Returns `true` if `name` is registered.
    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Returns `true` if `name` is registered and may be dispatched now.
    #[must_use]
    pub fn is_available(&self, name: &str) -> bool {
        self.read_state().available.contains(name)
    }

    /// Registered command names in ascending order.
    #[must_use]
    pub fn registered_names(&self) -> Vec<String> {
        self.commands.keys().cloned().collect()
    }

    /// Currently available command names in ascending order.
    #[must_use]
    pub fn available_names(&self) -> Vec<String> {
        self.read_state().available.iter().cloned().collect()
    }

    /// Number of sessions currently holding a live management connection.
    #[must_use]
    pub fn live_sessions(&self) -> usize {
        self.read_state().live_sessions.len()
    }

    /// Summaries of the currently available commands, ordered by name.
    #[must_use]
    pub fn catalogue(&self) -> Vec<CommandSummary> {
        let state = self.read_state();
        self.commands
            .iter()
            .filter(|(name, _)| state.available.contains(name.as_str()))
            .map(|(_, command)| CommandSummary::of(command.as_ref()))
            .collect()
    }

    /// Runs the command's argument check without executing it.
    ///
    /// A panicking check counts as a rejection.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownCommand`] if `name` is not registered.
    pub fn validate(&self, name: &str, args: &[String]) -> Result<bool, RegistryError> {
        let command = self.lookup(name)?;
        Ok(catch_unwind(AssertUnwindSafe(|| command.validate(args))).unwrap_or(false))
    }

    /// Validates and executes a command.
    ///
    /// Rejected arguments yield [`Output::Failure`]; errors and panics raised
    /// by the command yield [`Output::ExceptionInfo`].
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownCommand`] or
    /// [`RegistryError::UnavailableCommand`] without calling the command.
    pub fn try_execute(
        &self,
        name: &str,
        args: &[String],
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<Output, RegistryError> {
        let command = self.lookup(name)?;
        if !self.is_available(name) {
            return Err(RegistryError::UnavailableCommand {
                name: name.to_owned(),
            });
        }
        if !self.validate(name, args)? {
            debug!(target: REGISTRY_TARGET, command = name, "arguments rejected");
            return Ok(Output::failure(format!(
                "invalid arguments for '{name}'; usage: {}",
                command.usage()
            )));
        }

        ctx.commands = self.catalogue();
        let session = ctx.session();
        let outcome = catch_unwind(AssertUnwindSafe(|| command.execute(ctx, args)));
        Ok(match outcome {
            Ok(Ok(output)) => output,
            Ok(Err(failure)) => {
                debug!(
                    target: REGISTRY_TARGET,
                    command = name,
                    %session,
                    kind = failure.kind(),
                    error = %failure,
                    "command failed"
                );
                failure.to_output()
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(
                    target: REGISTRY_TARGET,
                    command = name,
                    %session,
                    panic = %message,
                    "command panicked"
                );
                Output::exception(PANIC_KIND, message)
            }
        })
    }

    /// Validates and executes a command, reporting dispatch errors as
    /// [`Output::Failure`]. Never fails.
    pub fn execute(&self, name: &str, args: &[String], ctx: &mut ExecutionContext<'_>) -> Output {
        self.try_execute(name, args, ctx).unwrap_or_else(|refusal| {
            debug!(target: REGISTRY_TARGET, command = name, reason = %refusal, "dispatch refused");
            Output::failure(refusal.to_string())
        })
    }

    fn lookup(&self, name: &str) -> Result<&Arc<dyn Command>, RegistryError> {
        self.commands
            .get(name)
            .ok_or_else(|| RegistryError::UnknownCommand {
                name: name.to_owned(),
            })
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, AvailabilityState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ConnectionListener for CommandRegistry {
    fn on_connection_event(&self, event: &ConnectionEvent) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let changed = match event.kind() {
            ConnectionEventKind::Connected => state.live_sessions.insert(event.session()),
            ConnectionEventKind::Disconnected => state.live_sessions.remove(&event.session()),
        };
        if !changed {
            return;
        }
        state.available = compute_available(&self.commands, !state.live_sessions.is_empty());
        info!(
            target: REGISTRY_TARGET,
            event = event.kind().as_str(),
            session = %event.session(),
            live_sessions = state.live_sessions.len(),
            available = state.available.len(),
            "recomputed command availability"
        );
    }
}

fn compute_available(
    commands: &BTreeMap<String, Arc<dyn Command>>,
    connected: bool,
) -> BTreeSet<String> {
    commands
        .iter()
        .filter(|(_, command)| match command.availability() {
            Availability::Always => true,
            Availability::RequiresConnection => connected,
        })
        .map(|(name, _)| name.clone())
        .collect()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| String::from("command panicked"))
}
