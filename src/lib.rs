//! Command dispatch, layered permissions and deferred tasks for Bevy game servers.
//!
//! bevy_essentials turns lines typed by players or the server console into
//! command invocations:
//!
//! - **Command**: a name, aliases and one handler per argument count
//! - **PermissionResolver**: wildcard layer over a pluggable authority
//! - **TaskScheduler**: delayed and repeating work polled once per tick
//! - **GameHost**: the bridge built-in commands use to reach the game
//!
//! # Features
//!
//! - `persist` (default): RON config, message overrides and permission groups
//! - `terminal`: stdin/stdout backend for dedicated servers
//! - `full`: Enable persist + terminal
//!
//! # Quick Start
//!
//! ```ignore
//! use bevy::prelude::*;
//! use bevy_essentials::prelude::*;
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(MinimalPlugins)
//!         .insert_resource(Host::new(MyServer::default()))
//!         .add_plugins(EssentialsPlugin::default())
//!         .add_systems(Update, forward_chat)
//!         .run();
//! }
//!
//! fn forward_chat(chat: Res<ChatInbox>, mut input: MessageWriter<CommandInputEvent>) {
//!     for (id, name, line) in chat.commands() {
//!         input.write(CommandInputEvent::new(CommandSource::player(id, name), line));
//!     }
//! }
//! ```

use bevy::prelude::*;

// Core module (always available, zero optional deps)
pub mod core;

pub mod bootstrap;
pub mod commands;
pub mod config;
pub mod host;
pub mod lang;
pub mod updater;

// Terminal backend (feature-gated)
#[cfg(feature = "terminal")]
pub mod terminal;

#[cfg(test)]
mod testing;

// Re-export core types at crate root for convenience
pub use crate::core::{
    dispatch, execute_line, tokenize, Actor, ActorId, AllowedSource, Arity, ArgumentValue,
    Command, CommandArgs, CommandInputEvent, CommandOutputEvent, CommandRegistry, CommandResult,
    CommandSource, ConsoleOutputLevel, DispatchResult, GroupAuthority, OutputTarget,
    PendingOutput, PermissionAuthority, PermissionResolver, TaskHandle, TaskScheduler,
    TokenizeError,
};

use bootstrap::BootstrapStatus;
use commands::{notify_spies, SpyList};
use config::{ConfigPath, DEFAULT_CONFIG_FILE};
use crate::core::{sync_scheduler_clock, tick_scheduler, EssentialsEventsPlugin};
use lang::MessageCatalog;
use updater::UpdateStatus;

/// Crate version reported by `/essentials` and the update check.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::bootstrap::BootstrapStatus;
    pub use crate::config::{ConfigPath, EssentialsConfig, TextCommandDef};
    pub use crate::core::{
        Actor, ActorId, AllowedSource, Command, CommandArgs, CommandInputEvent,
        CommandOutputEvent, CommandRegistry, CommandResult, CommandSource, ConsoleOutputLevel,
        GroupAuthority, OutputTarget, PermissionAuthority, PermissionEntry, PermissionGroup,
        PermissionResolver, TaskHandle, TaskScheduler,
    };
    pub use crate::host::{GameHost, Host, ItemInfo, Place, PlayerInfo};
    pub use crate::lang::MessageCatalog;
    pub use crate::updater::{ReleaseInfo, UpdateChecker, UpdateSource, UpdateStatus};
    pub use crate::EssentialsPlugin;

    #[cfg(feature = "terminal")]
    pub use crate::terminal::TerminalPlugin;
}

/// Main plugin that wires the command core into an app.
///
/// A [`PermissionResolver`] inserted before the plugin is kept; otherwise a
/// [`GroupAuthority`] is used.
pub struct EssentialsPlugin {
    /// Path of the RON config file.
    pub config_path: String,
    /// RON file of permission groups for the default authority.
    pub permissions_path: Option<String>,
}

impl Default for EssentialsPlugin {
    fn default() -> Self {
        Self {
            config_path: DEFAULT_CONFIG_FILE.to_string(),
            permissions_path: None,
        }
    }
}

impl Plugin for EssentialsPlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<PermissionResolver>() {
            app.insert_resource(PermissionResolver::new(self.default_authority()));
        }

        app.init_resource::<CommandRegistry>()
            .init_resource::<TaskScheduler>()
            .init_resource::<MessageCatalog>()
            .init_resource::<PendingOutput>()
            .init_resource::<PendingCommands>()
            .init_resource::<SpyList>()
            .init_resource::<UpdateStatus>()
            .init_resource::<BootstrapStatus>()
            .insert_resource(ConfigPath(self.config_path.clone()))
            .add_plugins(EssentialsEventsPlugin);

        app.add_systems(Startup, bootstrap::bootstrap);

        // 1. sync_scheduler_clock: Delays submitted this frame count from now
        // 2. queue_command_input: Read input messages into the queue
        // 3. execute_pending_commands: Dispatch with exclusive World access
        // 4. tick_scheduler: Fire due tasks
        // 5. send_pending_outputs: Flush queued output as messages
        app.add_systems(
            Update,
            (
                sync_scheduler_clock,
                queue_command_input,
                execute_pending_commands,
                tick_scheduler,
                send_pending_outputs,
            )
                .chain(),
        );

        app.add_systems(Last, shutdown_on_exit);

        // Terminal backend (feature-gated)
        #[cfg(feature = "terminal")]
        {
            app.add_plugins(terminal::TerminalPlugin);
        }
    }
}

impl EssentialsPlugin {
    #[cfg(feature = "persist")]
    fn default_authority(&self) -> GroupAuthority {
        let Some(path) = &self.permissions_path else {
            return GroupAuthority::default();
        };

        GroupAuthority::load(path).unwrap_or_else(|e| {
            error!("Using default permission groups: {}", e);
            GroupAuthority::default()
        })
    }

    #[cfg(not(feature = "persist"))]
    fn default_authority(&self) -> GroupAuthority {
        if let Some(path) = &self.permissions_path {
            debug!("Built without `persist`; ignoring '{}'", path);
        }
        GroupAuthority::default()
    }
}

struct QueuedCommand {
    source: CommandSource,
    line: String,
}

/// Resource for queuing command lines between parse and execution.
#[derive(Resource, Default)]
struct PendingCommands {
    queue: Vec<QueuedCommand>,
}

/// System that reads input messages and queues them for execution.
fn queue_command_input(
    mut input_events: MessageReader<CommandInputEvent>,
    mut pending: ResMut<PendingCommands>,
) {
    for event in input_events.read() {
        if event.line.trim().is_empty() {
            continue;
        }

        pending.queue.push(QueuedCommand {
            source: event.source.clone(),
            line: event.line.clone(),
        });
    }
}

/// Exclusive system that runs every queued line in arrival order.
fn execute_pending_commands(world: &mut World) {
    let queue = std::mem::take(&mut world.resource_mut::<PendingCommands>().queue);

    for QueuedCommand { source, line } in queue {
        notify_spies(world, &source, &line);

        if let Err(e) = execute_line(world, &source, &line) {
            source.send_with_level(world, ConsoleOutputLevel::Error, format!("Parse error: {}", e));
        }
    }
}

/// System that flushes queued output as messages.
fn send_pending_outputs(
    mut pending: ResMut<PendingOutput>,
    mut output_events: MessageWriter<CommandOutputEvent>,
) {
    for output in pending.drain() {
        output_events.write(output);
    }
}

/// Drop pending tasks and commands once the app is exiting.
fn shutdown_on_exit(
    mut exits: MessageReader<AppExit>,
    scheduler: Res<TaskScheduler>,
    mut registry: ResMut<CommandRegistry>,
) {
    if exits.read().next().is_none() {
        return;
    }

    scheduler.cancel_all();
    registry.clear();
    info!("Disabled");
}
