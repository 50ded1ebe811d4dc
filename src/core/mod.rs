//! Core command types with zero optional dependencies.
//!
//! This module provides the fundamental building blocks:
//! - [`Command`] - A named command with per-arity handlers
//! - [`CommandRegistry`] - Case-insensitive name and alias lookup
//! - [`PermissionResolver`] - Wildcard layer over a [`PermissionAuthority`]
//! - [`GroupAuthority`] - Default group-based authority
//! - [`TaskScheduler`] - Tick-driven delayed and repeating tasks
//! - [`dispatch`] / [`execute_line`] - The gates every invocation passes
//! - Events for communication with the host

mod args;
mod authority;
mod command;
mod dispatcher;
mod events;
mod permissions;
mod registry;
mod scheduler;
mod source;
mod tokenizer;

pub use args::{ArgumentValue, CommandArgs};
pub use authority::{GroupAuthority, DEFAULT_GROUP};
pub use command::{
    AllowedSource, Arity, Command, CommandHandler, CommandResult, BUILTIN_OWNER,
};
pub use dispatcher::{dispatch, execute_line, report, usage_line, DispatchResult};
pub use events::{
    CommandInputEvent, CommandOutputEvent, ConsoleOutputLevel, EssentialsEventsPlugin,
    OutputTarget, PendingOutput,
};
pub use permissions::{
    AuthorityResult, CommandPermission, PermissionAuthority, PermissionEntry, PermissionGroup,
    PermissionResolver, NEGATION_PREFIX, UMBRELLA_COMMAND, WILDCARD,
};
pub use registry::{CommandRegistry, RegistryError};
pub(crate) use scheduler::panic_message;
pub use scheduler::{sync_scheduler_clock, tick_scheduler, TaskAction, TaskBuilder, TaskHandle, TaskScheduler};
pub use source::{Actor, ActorId, CommandSource, CONSOLE_SUBJECT};
pub use tokenizer::{parse_invocation, tokenize, Invocation, TokenizeError};
