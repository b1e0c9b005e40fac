//! Process lifecycle: bootstrap, serve the configured transports, wait for
//! an exit condition and shut everything down.

mod errors;
mod handler;
mod launch;
mod shutdown;

pub use self::errors::LaunchError;
pub use self::launch::run_shell;
pub use self::shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};

#[cfg(test)]
pub(crate) use self::launch::{LaunchPlan, run_shell_with};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
