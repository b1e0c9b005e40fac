//! Shared configuration for the diagnostics shell.
//!
//! The [`Config`] type is resolved by `ortho_config` from, in increasing order
//! of precedence, built-in defaults, an optional configuration file, `DIAGSH_`
//! prefixed environment variables and command-line flags. The shell binary
//! consumes it during bootstrap to decide which transports to serve, where the
//! remote target lives, and how results are rendered.

mod defaults;
mod formats;
mod socket;

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_PROMPT, DEFAULT_REMOTE_TIMEOUT_MS, DEFAULT_TARGET_PORT,
    default_listen_socket, default_log_filter, default_log_format, default_target_endpoint,
};
pub use formats::{LogFormat, OutputFormat, SessionMode};
pub use socket::{SocketEndpoint, SocketParseError, SocketPreparationError};

/// Resolved shell configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "DIAGSH")]
#[serde(default)]
pub struct Config {
    /// Management endpoint exposed by the remote target process.
    pub target: SocketEndpoint,
    /// Endpoint on which socket-backed sessions are accepted.
    pub listen_socket: SocketEndpoint,
    /// Transports served by the process.
    pub mode: SessionMode,
    /// `tracing` filter expression applied to log output.
    pub log_filter: String,
    /// Encoding used for log output on stderr.
    pub log_format: LogFormat,
    /// Encoding used when writing command results to a transport.
    pub output_format: OutputFormat,
    /// Prompt written before each read in text mode.
    pub prompt: String,
    /// Echo each trimmed input line back to the operator in text mode.
    pub echo_input: bool,
    /// Connect, read and write timeout for the management connection.
    pub remote_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target: default_target_endpoint(),
            listen_socket: default_listen_socket(),
            mode: SessionMode::default(),
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: default_log_format(),
            output_format: OutputFormat::default(),
            prompt: DEFAULT_PROMPT.to_owned(),
            echo_input: true,
            remote_timeout_ms: DEFAULT_REMOTE_TIMEOUT_MS,
        }
    }
}

impl Config {
    /// Management endpoint of the remote target.
    #[must_use]
    pub const fn target(&self) -> &SocketEndpoint {
        &self.target
    }

    /// Endpoint on which socket sessions are accepted.
    #[must_use]
    pub const fn listen_socket(&self) -> &SocketEndpoint {
        &self.listen_socket
    }

    /// Transports served by the process.
    #[must_use]
    pub const fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output encoding.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Result rendering format.
    #[must_use]
    pub const fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    /// Prompt text.
    #[must_use]
    pub fn prompt(&self) -> &str {
        self.prompt.as_str()
    }

    /// Whether input lines are echoed back in text mode.
    #[must_use]
    pub const fn echo_input(&self) -> bool {
        self.echo_input
    }

    /// Timeout budget for the management connection.
    #[must_use]
    pub const fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }
}
