use thiserror::Error;

/// Registration and dispatch errors raised by the command registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A command with this name is already registered.
    #[error("command '{name}' is already registered")]
    DuplicateName {
        /// Clashing name.
        name: String,
    },
    /// No command with this name is registered.
    #[error("unknown command: {name}")]
    UnknownCommand {
        /// Requested name.
        name: String,
    },
    /// The command exists but its availability condition does not hold.
    #[error("command '{name}' is unavailable without a management connection")]
    UnavailableCommand {
        /// Requested name.
        name: String,
    },
}
