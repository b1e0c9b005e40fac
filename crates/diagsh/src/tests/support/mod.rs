//! Test harness utilities shared by unit and behavioural suites.

mod config_loader;
mod connection;
#[cfg(unix)]
mod process_world;
mod reporter;
mod world;

pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use connection::{MockConnection, ScriptedProvider, TargetLedger};
#[cfg(unix)]
pub use process_world::{ProcessWorld, StepResult};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use world::{SessionWorld, world};
