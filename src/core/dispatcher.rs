//! Resolve, gate and run one invocation.
//!
//! Dispatch runs in four gates: resolution, source type, permission, arity.
//! Only when all pass does a handler run, synchronously and with the world
//! borrowed mutably.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use bevy::prelude::*;

use super::scheduler::panic_message;
use super::{
    parse_invocation, Command, CommandArgs, CommandRegistry, CommandResult, CommandSource,
    ConsoleOutputLevel, PermissionResolver, TokenizeError,
};
use crate::lang::{keys, send_lang_with_level};

/// Outcome of a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResult {
    /// No command or alias matches the label.
    UnknownCommand,
    /// Wrong source type or no handler variant for the argument count.
    ShowUsage,
    PermissionDenied,
    /// The handler ran and returned this.
    Executed(CommandResult),
    /// The handler panicked; the payload message is kept for logging.
    Panicked(String),
}

/// Run `label` with `args` on behalf of `source`.
pub fn dispatch(
    world: &mut World,
    source: &CommandSource,
    label: &str,
    args: &CommandArgs,
) -> DispatchResult {
    let Some(command) = lookup(world, label) else {
        return DispatchResult::UnknownCommand;
    };

    if !command.get_allowed_source().permits(source) {
        return DispatchResult::ShowUsage;
    }

    let permitted = world
        .get_resource::<PermissionResolver>()
        .is_some_and(|resolver| resolver.has_permission(source, &command.permission_node()));
    if !permitted {
        debug!(
            "'{}' denied '{}' ({})",
            source.display_name(),
            command.name(),
            command.permission_node()
        );
        return DispatchResult::PermissionDenied;
    }

    let Some(handler) = command.handler_for(args.len()) else {
        return DispatchResult::ShowUsage;
    };

    let result = panic::catch_unwind(AssertUnwindSafe(|| handler(source, args, world)));

    match result {
        Ok(result) => DispatchResult::Executed(result),
        Err(payload) => {
            let message = panic_message(&*payload);
            error!("Command '{}' panicked: {}", command.name(), message);
            DispatchResult::Panicked(message)
        }
    }
}

/// Parse `line`, dispatch it and report the outcome back to `source`.
pub fn execute_line(
    world: &mut World,
    source: &CommandSource,
    line: &str,
) -> Result<DispatchResult, TokenizeError> {
    let invocation = parse_invocation(line)?;
    let result = dispatch(world, source, &invocation.label, &invocation.args);
    report(world, source, &invocation.label, &result);
    Ok(result)
}

/// Send the user-facing message for `result`, if it has one.
pub fn report(world: &mut World, source: &CommandSource, label: &str, result: &DispatchResult) {
    match result {
        DispatchResult::Executed(CommandResult::Success) => {}
        DispatchResult::ShowUsage | DispatchResult::Executed(CommandResult::ShowUsage) => {
            if let Some(command) = lookup(world, label) {
                source.send_with_level(world, ConsoleOutputLevel::Usage, usage_line(&command));
            }
        }
        DispatchResult::Executed(CommandResult::Failure { key, args }) => {
            send_lang_with_level(world, source, ConsoleOutputLevel::Warn, key, args.as_slice());
        }
        DispatchResult::UnknownCommand => {
            send_lang_with_level(world, source, ConsoleOutputLevel::Error, keys::UNKNOWN_COMMAND, &[label]);
        }
        DispatchResult::PermissionDenied => {
            send_lang_with_level::<&str>(
                world,
                source,
                ConsoleOutputLevel::Error,
                keys::COMMAND_NO_PERMISSION,
                &[],
            );
        }
        DispatchResult::Panicked(_) => {
            send_lang_with_level::<&str>(
                world,
                source,
                ConsoleOutputLevel::Error,
                keys::COMMAND_ERROR,
                &[],
            );
        }
    }
}

/// `Use /<name> <usage>`.
pub fn usage_line(command: &Command) -> String {
    format!("Use /{} {}", command.name(), command.get_usage())
        .trim_end()
        .to_string()
}

fn lookup(world: &World, label: &str) -> Option<Arc<Command>> {
    world
        .get_resource::<CommandRegistry>()
        .and_then(|registry| registry.resolve(label))
        .cloned()
}
