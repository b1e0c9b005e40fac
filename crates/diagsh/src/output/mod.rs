//! Result model shared by every command.
//!
//! An [`Output`] is plain data: it never borrows from, or holds a handle to,
//! the management connection, so it can be rendered and written after the
//! connection that produced it has gone away. Rendering for a transport lives
//! in [`render`].

mod render;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use self::render::{EMPTY_MARKER, SUCCESS_LITERAL, render};

/// Result of executing, or failing to execute, one command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "output", rename_all = "snake_case")]
pub enum Output {
    /// The command completed and has nothing to report.
    Success,
    /// A single free-form message.
    Message {
        /// Message text.
        text: String,
    },
    /// An ordered sequence of entries.
    List {
        /// Entries in the order the command produced them.
        items: Vec<String>,
    },
    /// A keyed collection of entries.
    Map {
        /// Entries keyed by name.
        entries: BTreeMap<String, String>,
    },
    /// The command raised an error while executing.
    ExceptionInfo {
        /// Short label identifying the kind of error.
        kind: String,
        /// Human-readable description.
        message: String,
    },
    /// The input was rejected before execution.
    Failure {
        /// Why the input was rejected.
        reason: String,
    },
}

impl Output {
    /// Builds a [`Output::Message`].
    #[must_use]
    pub fn message(text: impl Into<String>) -> Self {
        Self::Message { text: text.into() }
    }

    /// Builds a [`Output::List`] from any sequence of displayable entries.
    #[must_use]
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self::List {
            items: items.into_iter().map(Into::into).collect(),
        }
    }

    /// Builds a [`Output::Map`] from key/value pairs. Later duplicates win.
    #[must_use]
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Map {
            entries: entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    /// Builds a [`Output::ExceptionInfo`].
    #[must_use]
    pub fn exception(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExceptionInfo {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Builds a [`Output::Failure`].
    #[must_use]
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    /// Stable snake-case name of the populated variant.
    #[must_use]
    pub const fn variant_name(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Message { .. } => "message",
            Self::List { .. } => "list",
            Self::Map { .. } => "map",
            Self::ExceptionInfo { .. } => "exception_info",
            Self::Failure { .. } => "failure",
        }
    }

    /// Returns `true` for [`Output::ExceptionInfo`] and [`Output::Failure`].
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::ExceptionInfo { .. } | Self::Failure { .. })
    }
}
