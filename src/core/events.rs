//! Messages exchanged between the host and the command core.
//!
//! - Host -> Core: [`CommandInputEvent`] carrying an already-received line
//! - Core -> Host: [`CommandOutputEvent`] addressed to the console or a player
//!
//! Handlers never write messages directly. They queue output in
//! [`PendingOutput`], which is flushed once per tick.

use bevy::prelude::*;

use super::{ActorId, CommandSource};

/// A line of input to execute on behalf of `source`.
///
/// # Examples
///
/// ```ignore
/// fn on_chat(mut events: MessageWriter<CommandInputEvent>) {
///     events.write(CommandInputEvent::new(CommandSource::player(42, "Alice"), "/tp 10 64 10"));
/// }
/// ```
#[derive(Message, Debug, Clone)]
pub struct CommandInputEvent {
    pub source: CommandSource,
    /// The raw line; a leading `/` is accepted and ignored.
    pub line: String,
}

impl CommandInputEvent {
    pub fn new(source: CommandSource, line: impl Into<String>) -> Self {
        Self {
            source,
            line: line.into(),
        }
    }

    /// Input typed into the server console.
    pub fn console(line: impl Into<String>) -> Self {
        Self::new(CommandSource::Console, line)
    }
}

/// Recipient of an output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputTarget {
    Console,
    Player(ActorId),
}

impl From<ActorId> for OutputTarget {
    fn from(id: ActorId) -> Self {
        Self::Player(id)
    }
}

/// Severity/kind of an output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsoleOutputLevel {
    #[default]
    Info,
    Warn,
    Error,
    /// Usage text shown when an invocation does not match a command form.
    Usage,
}

/// A message for the host to deliver.
#[derive(Message, Debug, Clone, PartialEq)]
pub struct CommandOutputEvent {
    pub target: OutputTarget,
    pub message: String,
    pub level: ConsoleOutputLevel,
}

impl CommandOutputEvent {
    pub fn new(target: OutputTarget, level: ConsoleOutputLevel, message: impl Into<String>) -> Self {
        Self {
            target,
            message: message.into(),
            level,
        }
    }
}

/// Output queued during the current tick.
#[derive(Resource, Default, Debug)]
pub struct PendingOutput {
    queue: Vec<CommandOutputEvent>,
}

impl PendingOutput {
    pub fn push(&mut self, event: CommandOutputEvent) {
        self.queue.push(event);
    }

    /// Queue output through the world, logging instead when the resource is
    /// missing (for example in a bare `World` without the plugin).
    pub fn push_to(
        world: &mut World,
        target: OutputTarget,
        level: ConsoleOutputLevel,
        message: impl Into<String>,
    ) {
        let message = message.into();
        match world.get_resource_mut::<PendingOutput>() {
            Some(mut pending) => pending.push(CommandOutputEvent::new(target, level, message)),
            None => info!("[{:?}] {}", target, message),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandOutputEvent> {
        self.queue.iter()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = CommandOutputEvent> + '_ {
        self.queue.drain(..)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Messages queued for one recipient, in order.
    pub fn messages_for(&self, target: OutputTarget) -> Vec<&str> {
        self.queue
            .iter()
            .filter(|event| event.target == target)
            .map(|event| event.message.as_str())
            .collect()
    }
}

/// Plugin that registers all command messages.
pub struct EssentialsEventsPlugin;

impl Plugin for EssentialsEventsPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<CommandInputEvent>()
            .add_message::<CommandOutputEvent>();
    }
}
