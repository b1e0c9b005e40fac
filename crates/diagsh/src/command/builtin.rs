//! Commands that work without a management connection.

use std::sync::Arc;

use super::remote::{GcCommand, InvokeCommand, PingCommand, PropertiesCommand, ThreadsCommand};
use super::{Command, CommandError, ExecutionContext};
use crate::output::Output;

/// Every command the shell registers at startup.
#[must_use]
pub fn builtin_commands() -> Vec<Arc<dyn Command>> {
    vec![
        Arc::new(HelpCommand),
        Arc::new(EchoCommand),
        Arc::new(StatusCommand),
        Arc::new(PingCommand),
        Arc::new(ThreadsCommand),
        Arc::new(PropertiesCommand),
        Arc::new(GcCommand),
        Arc::new(InvokeCommand),
    ]
}

/// `help [command]`
#[derive(Debug, Default, Clone, Copy)]
pub struct HelpCommand;

impl Command for HelpCommand {
    fn name(&self) -> &str {
        "help"
    }

    fn summary(&self) -> &str {
        "list available commands, or describe one"
    }

    fn usage(&self) -> &str {
        "help [command]"
    }

    fn validate(&self, args: &[String]) -> bool {
        args.len() <= 1
    }

    fn execute(
        &self,
        ctx: &mut ExecutionContext<'_>,
        args: &[String],
    ) -> Result<Output, CommandError> {
        let Some(wanted) = args.first() else {
            return Ok(Output::list(
                ctx.commands()
                    .iter()
                    .map(|command| format!("{} - {}", command.name, command.summary)),
            ));
        };
        Ok(ctx
            .commands()
            .iter()
            .find(|command| &command.name == wanted)
            .map_or_else(
                || Output::failure(format!("no available command named '{wanted}'")),
                |command| Output::message(format!("usage: {}\n{}", command.usage, command.summary)),
            ))
    }
}

/// `echo [word]...`
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoCommand;

impl Command for EchoCommand {
    fn name(&self) -> &str {
        "echo"
    }

    fn summary(&self) -> &str {
        "print the arguments back"
    }

    fn usage(&self) -> &str {
        "echo [word]..."
    }

    fn validate(&self, _args: &[String]) -> bool {
        true
    }

    fn execute(
        &self,
        _ctx: &mut ExecutionContext<'_>,
        args: &[String],
    ) -> Result<Output, CommandError> {
        Ok(Output::message(args.join(" ")))
    }
}

/// `status`
#[derive(Debug, Default, Clone, Copy)]
pub struct StatusCommand;

impl Command for StatusCommand {
    fn name(&self) -> &str {
        "status"
    }

    fn summary(&self) -> &str {
        "show this session and its management connection"
    }

    fn validate(&self, args: &[String]) -> bool {
        args.is_empty()
    }

    fn execute(
        &self,
        ctx: &mut ExecutionContext<'_>,
        _args: &[String],
    ) -> Result<Output, CommandError> {
        let (endpoint, connection) = ctx.peek_connection().map_or_else(
            || (String::from("(none)"), "none"),
            |connection| {
                let state = if connection.is_alive() { "alive" } else { "lost" };
                (connection.endpoint(), state)
            },
        );
        Ok(Output::map([
            (String::from("session"), ctx.session().to_string()),
            (String::from("target"), endpoint),
            (String::from("connection"), connection.to_owned()),
            (String::from("commands"), ctx.commands().len().to_string()),
        ]))
    }
}
