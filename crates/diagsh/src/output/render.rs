//! Text and JSON renderings of [`Output`].
//!
//! Rendering is total: every variant has a defined form and the function never
//! fails. The same rendering is used by every transport.

use diagsh_config::OutputFormat;

use super::Output;

/// Text written for [`Output::Success`].
pub const SUCCESS_LITERAL: &str = "OK";

/// Text written for an empty list or map.
pub const EMPTY_MARKER: &str = "(empty)";

/// Renders an output in the requested format, without a trailing newline.
#[must_use]
pub fn render(output: &Output, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => render_text(output),
        // Text if encoding ever fails.
        OutputFormat::Json => {
            serde_json::to_string(output).unwrap_or_else(|_| render_text(output))
        }
    }
}

fn render_text(output: &Output) -> String {
    match output {
        Output::Success => SUCCESS_LITERAL.to_owned(),
        Output::Message { text } => text.clone(),
        Output::List { items } if items.is_empty() => EMPTY_MARKER.to_owned(),
        Output::List { items } => items.join("\n"),
        Output::Map { entries } if entries.is_empty() => EMPTY_MARKER.to_owned(),
        Output::Map { entries } => entries
            .iter()
            .map(|(key, value)| format!("{key}: {value}"))
            .collect::<Vec<_>>()
            .join("\n"),
        Output::ExceptionInfo { kind, message } => format!("{kind}: {message}"),
        Output::Failure { reason } => reason.clone(),
    }
}
