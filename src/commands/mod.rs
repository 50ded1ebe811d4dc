//! Built-in commands.
//!
//! Every command reaches the game through the [`Host`] resource. A world
//! without a host still dispatches; the handlers just report a failure.

mod essentials;
mod misc;
mod teleport;
mod text;

use bevy::prelude::*;

use crate::core::{Command, CommandRegistry, CommandResult, CommandSource, RegistryError};
use crate::host::{GameHost, Host, PlayerInfo};
use crate::lang::{keys, send_lang};

pub use misc::{notify_spies, SpyList};
pub use text::{register_text_commands, TEXT_OWNER};

/// Register every built-in command. Returns how many were added.
pub fn register_builtin_commands(registry: &mut CommandRegistry) -> Result<usize, RegistryError> {
    let commands: Vec<Command> = vec![
        teleport::tp(),
        misc::ascend(),
        misc::descend(),
        misc::position(),
        misc::online(),
        misc::item(),
        misc::spy(),
        misc::clear(),
        misc::shutdown(),
        essentials::essentials(),
    ];

    let count = commands.len();
    for command in commands {
        registry.register(command)?;
    }
    Ok(count)
}

/// Remove the commands named in `disabled`.
///
/// The umbrella `essentials` command cannot be disabled. Returns how many
/// commands were removed.
pub fn apply_disabled_commands(registry: &mut CommandRegistry, disabled: &[String]) -> usize {
    let mut removed = 0;

    for name in disabled {
        let is_umbrella = registry
            .resolve(name)
            .is_some_and(|cmd| cmd.name().eq_ignore_ascii_case(crate::core::UMBRELLA_COMMAND));

        if is_umbrella {
            warn!("There is no command named '{}' to disable.", name);
            continue;
        }

        match registry.unregister(name) {
            Some(cmd) => {
                info!("Disabled command: '{}'", cmd.name());
                removed += 1;
            }
            None => warn!("There is no command named '{}' to disable.", name),
        }
    }

    removed
}

fn no_host() -> CommandResult {
    CommandResult::failure(keys::NO_HOST, std::iter::empty::<&str>())
}

fn host(world: &World) -> Option<&dyn GameHost> {
    world.get_resource::<Host>().map(|host| &**host)
}

/// Run `f` against the host; `None` when no host is attached.
fn with_host<R>(world: &mut World, f: impl FnOnce(&mut dyn GameHost) -> R) -> Option<R> {
    world.get_resource_mut::<Host>().map(|mut host| f(&mut **host))
}

/// Send a catalog message to a player other than the invoking source.
fn send_lang_to<S: AsRef<str>>(world: &mut World, player: &PlayerInfo, key: &str, args: &[S]) {
    send_lang(world, &CommandSource::from(player.actor()), key, args);
}
