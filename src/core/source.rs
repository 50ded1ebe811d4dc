//! Who issued a command.

use std::fmt;

use bevy::prelude::*;

use super::{ConsoleOutputLevel, OutputTarget, PendingOutput};

/// Subject id used for the server console in permission lookups.
pub const CONSOLE_SUBJECT: &str = "console";

/// Stable identity of a connected participant, assigned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActorId(pub u64);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A connected participant able to run commands.
///
/// Position is not cached here; it is queried from the host when needed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Actor {
    pub id: ActorId,
    pub name: Box<str>,
}

impl Actor {
    pub fn new(id: u64, name: impl Into<Box<str>>) -> Self {
        Self {
            id: ActorId(id),
            name: name.into(),
        }
    }
}

/// The origin of an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CommandSource {
    /// The server console. Has no position and cannot be the implicit
    /// target of actor-only command forms.
    Console,
    /// A connected player.
    Player(Actor),
}

impl CommandSource {
    pub fn player(id: u64, name: impl Into<Box<str>>) -> Self {
        Self::Player(Actor::new(id, name))
    }

    #[inline]
    pub fn is_console(&self) -> bool {
        matches!(self, Self::Console)
    }

    /// The actor behind this source, if any.
    #[inline]
    pub fn as_actor(&self) -> Option<&Actor> {
        match self {
            Self::Console => None,
            Self::Player(actor) => Some(actor),
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::Console => "Console",
            Self::Player(actor) => &actor.name,
        }
    }

    /// Identifier handed to the permission authority.
    pub fn subject_id(&self) -> String {
        match self {
            Self::Console => CONSOLE_SUBJECT.to_string(),
            Self::Player(actor) => actor.id.to_string(),
        }
    }

    /// Where output for this source should go.
    pub fn target(&self) -> OutputTarget {
        match self {
            Self::Console => OutputTarget::Console,
            Self::Player(actor) => OutputTarget::Player(actor.id),
        }
    }

    /// Queue a plain message for this source.
    pub fn send_message(&self, world: &mut World, message: impl Into<String>) {
        self.send_with_level(world, ConsoleOutputLevel::Info, message);
    }

    /// Queue a message with an explicit level.
    pub fn send_with_level(
        &self,
        world: &mut World,
        level: ConsoleOutputLevel,
        message: impl Into<String>,
    ) {
        PendingOutput::push_to(world, self.target(), level, message);
    }
}

impl From<Actor> for CommandSource {
    fn from(actor: Actor) -> Self {
        Self::Player(actor)
    }
}
