//! Commands that act on the target through the management connection.

use std::time::Instant;

use serde_json::{Map, Value};

use super::{Availability, Command, CommandError, ExecutionContext};
use crate::output::Output;

/// Converts a management reply into an [`Output`].
///
/// `null` becomes [`Output::Success`], strings, numbers and booleans become
/// [`Output::Message`], arrays become [`Output::List`] and objects become
/// [`Output::Map`]. Nested values are written as compact JSON.
#[must_use]
pub fn reply_to_output(value: Value) -> Output {
    match value {
        Value::Null => Output::Success,
        Value::String(text) => Output::message(text),
        Value::Array(items) => Output::list(items.into_iter().map(scalar_text)),
        Value::Object(entries) => object_to_map(entries, ""),
        scalar => Output::message(scalar.to_string()),
    }
}

fn scalar_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

fn object_to_map(entries: Map<String, Value>, prefix: &str) -> Output {
    Output::map(
        entries
            .into_iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key, scalar_text(value))),
    )
}

const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn unexpected(operation: &str, expected: &'static str, found: &Value) -> CommandError {
    CommandError::UnexpectedReply {
        operation: operation.to_owned(),
        expected,
        found: json_type(found),
    }
}

/// `ping`
#[derive(Debug, Default, Clone, Copy)]
pub struct PingCommand;

impl Command for PingCommand {
    fn name(&self) -> &str {
        "ping"
    }

    fn summary(&self) -> &str {
        "measure the management connection round trip"
    }

    fn availability(&self) -> Availability {
        Availability::RequiresConnection
    }

    fn validate(&self, args: &[String]) -> bool {
        args.is_empty()
    }

    fn execute(
        &self,
        ctx: &mut ExecutionContext<'_>,
        _args: &[String],
    ) -> Result<Output, CommandError> {
        let started = Instant::now();
        ctx.connection()?.invoke("ping", &[])?;
        Ok(Output::message(format!(
            "pong ({} ms)",
            started.elapsed().as_millis()
        )))
    }
}

/// `threads`
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadsCommand;

impl Command for ThreadsCommand {
    fn name(&self) -> &str {
        "threads"
    }

    fn summary(&self) -> &str {
        "list the target's threads"
    }

    fn availability(&self) -> Availability {
        Availability::RequiresConnection
    }

    fn validate(&self, args: &[String]) -> bool {
        args.is_empty()
    }

    fn execute(
        &self,
        ctx: &mut ExecutionContext<'_>,
        _args: &[String],
    ) -> Result<Output, CommandError> {
        match ctx.connection()?.invoke("threads", &[])? {
            list @ Value::Array(_) => Ok(reply_to_output(list)),
            other => Err(unexpected("threads", "array", &other)),
        }
    }
}

/// `properties [prefix]`
#[derive(Debug, Default, Clone, Copy)]
pub struct PropertiesCommand;

impl Command for PropertiesCommand {
    fn name(&self) -> &str {
        "properties"
    }

    fn summary(&self) -> &str {
        "show the target's properties, optionally only those with a key prefix"
    }

    fn usage(&self) -> &str {
        "properties [prefix]"
    }

    fn availability(&self) -> Availability {
        Availability::RequiresConnection
    }

    fn validate(&self, args: &[String]) -> bool {
        args.len() <= 1
    }

    fn execute(
        &self,
        ctx: &mut ExecutionContext<'_>,
        args: &[String],
    ) -> Result<Output, CommandError> {
        let prefix = args.first().map_or("", String::as_str);
        match ctx.connection()?.invoke("properties", &[])? {
            Value::Object(entries) => Ok(object_to_map(entries, prefix)),
            other => Err(unexpected("properties", "object", &other)),
        }
    }
}

/// `gc`
#[derive(Debug, Default, Clone, Copy)]
pub struct GcCommand;

impl Command for GcCommand {
    fn name(&self) -> &str {
        "gc"
    }

    fn summary(&self) -> &str {
        "request a garbage collection in the target"
    }

    fn availability(&self) -> Availability {
        Availability::RequiresConnection
    }

    fn validate(&self, args: &[String]) -> bool {
        args.is_empty()
    }

    fn execute(
        &self,
        ctx: &mut ExecutionContext<'_>,
        _args: &[String],
    ) -> Result<Output, CommandError> {
        Ok(reply_to_output(ctx.connection()?.invoke("gc", &[])?))
    }
}

/// `invoke <operation> [arg]...`
#[derive(Debug, Default, Clone, Copy)]
pub struct InvokeCommand;

impl Command for InvokeCommand {
    fn name(&self) -> &str {
        "invoke"
    }

    fn summary(&self) -> &str {
        "call any management operation and show its reply"
    }

    fn usage(&self) -> &str {
        "invoke <operation> [arg]..."
    }

    fn availability(&self) -> Availability {
        Availability::RequiresConnection
    }

    fn validate(&self, args: &[String]) -> bool {
        !args.is_empty()
    }

    fn execute(
        &self,
        ctx: &mut ExecutionContext<'_>,
        args: &[String],
    ) -> Result<Output, CommandError> {
        let Some((operation, rest)) = args.split_first() else {
            return Ok(Output::failure("invoke needs an operation name"));
        };
        Ok(reply_to_output(ctx.connection()?.invoke(operation, rest)?))
    }
}
