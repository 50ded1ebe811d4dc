//! The umbrella `/essentials` command.

use bevy::prelude::*;

use crate::core::{
    Command, CommandArgs, CommandRegistry, CommandResult, CommandSource, PermissionResolver,
    UMBRELLA_COMMAND,
};
use crate::lang::{keys, send_lang};
use crate::updater::UpdateStatus;
use crate::VERSION;

pub(super) fn essentials() -> Command {
    Command::new(UMBRELLA_COMMAND)
        .usage("[reload|commands]")
        .description("Plugin information and maintenance")
        .arity(0, info)
        .arity(1, |src, args, world| {
            if args[0].is("reload") {
                reload(src, world)
            } else if args[0].is_one_of(&["commands", "cmds"]) {
                list_commands(src, world)
            } else {
                CommandResult::ShowUsage
            }
        })
}

fn info(source: &CommandSource, _: &CommandArgs, world: &mut World) -> CommandResult {
    let commands = world
        .get_resource::<CommandRegistry>()
        .map_or(0, CommandRegistry::len);

    let update = match world.get_resource::<UpdateStatus>() {
        None | Some(UpdateStatus::NotChecked) => "not checked".to_string(),
        Some(UpdateStatus::Checking) => "checking".to_string(),
        Some(UpdateStatus::UpToDate) => "up-to-date".to_string(),
        Some(UpdateStatus::Available(release)) => format!("{} available", release.version),
        Some(UpdateStatus::Failed(reason)) => format!("check failed ({reason})"),
    };

    source.send_message(world, format!("Essentials {VERSION}"));
    source.send_message(world, format!("Commands: {commands}"));
    source.send_message(world, format!("Updates: {update}"));
    CommandResult::Success
}

fn reload(source: &CommandSource, world: &mut World) -> CommandResult {
    match crate::bootstrap::reload(world) {
        Ok(_) => {
            send_lang::<&str>(world, source, keys::RELOADED, &[]);
            CommandResult::Success
        }
        Err(e) => {
            error!("Reload requested by '{}' failed: {}", source.display_name(), e);
            CommandResult::failure(keys::COMMAND_ERROR, std::iter::empty::<&str>())
        }
    }
}

/// Names of the commands `source` may run, sorted.
fn list_commands(source: &CommandSource, world: &mut World) -> CommandResult {
    let mut names: Vec<String> = match (
        world.get_resource::<CommandRegistry>(),
        world.get_resource::<PermissionResolver>(),
    ) {
        (Some(registry), Some(resolver)) => registry
            .iter()
            .filter(|cmd| resolver.has_command_permission(source, cmd, false).granted)
            .map(|cmd| cmd.name().to_string())
            .collect(),
        _ => Vec::new(),
    };
    names.sort();

    source.send_message(world, format!("Commands: {}", names.join(", ")));
    CommandResult::Success
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{dispatch, ActorId, DispatchResult, OutputTarget, PendingOutput};
    use crate::testing::TableAuthority;

    fn world_with(authority: TableAuthority) -> World {
        let mut registry = CommandRegistry::new();
        registry.register(essentials()).unwrap();
        registry.register(Command::new("tp")).unwrap();
        registry.register(Command::new("spy")).unwrap();

        let mut world = World::new();
        world.init_resource::<PendingOutput>();
        world.insert_resource(registry);
        world.insert_resource(PermissionResolver::new(authority));
        world
    }

    fn run(world: &mut World, source: &CommandSource, args: &[&str]) -> DispatchResult {
        dispatch(world, source, "essentials", &CommandArgs::from_tokens(args))
    }

    #[test]
    fn test_info_lines() {
        let mut world = world_with(TableAuthority::new().grant("console", "essentials"));
        world.insert_resource(UpdateStatus::UpToDate);

        assert_eq!(
            run(&mut world, &CommandSource::Console, &[]),
            DispatchResult::Executed(CommandResult::Success)
        );
        let version = format!("Essentials {VERSION}");
        assert_eq!(
            world.resource::<PendingOutput>().messages_for(OutputTarget::Console),
            vec![version.as_str(), "Commands: 3", "Updates: up-to-date"]
        );
    }

    #[test]
    fn test_commands_lists_permitted_only() {
        let mut world = world_with(
            TableAuthority::new()
                .grant("7", "essentials")
                .grant("7", "tp"),
        );
        let player = CommandSource::player(7, "Alice");

        run(&mut world, &player, &["CMDS"]);

        assert_eq!(
            world.resource::<PendingOutput>().messages_for(OutputTarget::Player(ActorId(7))),
            vec!["Commands: essentials, tp"]
        );
    }

    #[test]
    fn test_unknown_subcommand_shows_usage() {
        let mut world = world_with(TableAuthority::new().grant("console", "essentials"));

        assert_eq!(
            run(&mut world, &CommandSource::Console, &["frobnicate"]),
            DispatchResult::Executed(CommandResult::ShowUsage)
        );
        assert_eq!(
            run(&mut world, &CommandSource::Console, &["a", "b"]),
            DispatchResult::ShowUsage
        );
    }

    #[test]
    fn test_reload_without_config_file() {
        let mut world = world_with(TableAuthority::new().grant("console", "essentials"));
        world.insert_resource(crate::config::ConfigPath("does/not/exist.ron".into()));

        assert_eq!(
            run(&mut world, &CommandSource::Console, &["reload"]),
            DispatchResult::Executed(CommandResult::Success)
        );
        assert_eq!(
            world.resource::<PendingOutput>().messages_for(OutputTarget::Console),
            vec!["Configuration reloaded."]
        );
    }
}
