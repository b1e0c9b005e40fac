//! Parsing of one operator input line.
//!
//! Grammar: `<command-name> [arg]*`, split on whitespace after trimming. There
//! is no quoting or escaping, so an argument never contains whitespace.
//! `exit` and `quit`, in any case, end the session without dispatch.

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    /// Blank line; nothing to dispatch.
    Empty,
    /// `exit` or `quit`.
    Exit,
    /// A command invocation.
    Invoke {
        /// Command name, case preserved.
        name: String,
        /// Remaining whitespace-separated tokens.
        args: Vec<String>,
    },
}

impl CommandLine {
    /// Parses a raw line.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
            return Self::Exit;
        }
        let mut tokens = trimmed.split_whitespace().map(str::to_owned);
        tokens.next().map_or(Self::Empty, |name| Self::Invoke {
            name,
            args: tokens.collect(),
        })
    }
}
