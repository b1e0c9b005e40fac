//! Enumerated settings: which transports are served and how results and
//! logs are encoded.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Transports served by a shell process.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SessionMode {
    /// A single session on the controlling terminal.
    #[default]
    Interactive,
    /// Sessions accepted on the configured listen socket.
    Socket,
    /// The terminal session plus the socket listener.
    Both,
}

impl SessionMode {
    /// Returns `true` when a terminal session should be started.
    #[must_use]
    pub const fn serves_terminal(self) -> bool {
        matches!(self, Self::Interactive | Self::Both)
    }

    /// Returns `true` when the socket listener should be started.
    #[must_use]
    pub const fn serves_socket(self) -> bool {
        matches!(self, Self::Socket | Self::Both)
    }
}

/// Encoding of command results written to a transport.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum OutputFormat {
    /// Human-readable text, one entry per line.
    #[default]
    Text,
    /// One JSON object per result.
    Json,
}

/// Encoding of the shell's own log lines on stderr.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Single-line human-readable events.
    #[default]
    Compact,
}
