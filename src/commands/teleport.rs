//! `/tp` in its four forms.
//!
//! | args | form                        | source       |
//! |------|-----------------------------|--------------|
//! | 1    | self to player or place     | player only  |
//! | 2    | player to player or place   | any          |
//! | 3    | self to x y z               | player only  |
//! | 4    | player to x y z             | any          |

use bevy::prelude::*;

use super::{host, no_host, send_lang_to, with_host};
use crate::core::{Command, CommandArgs, CommandResult, CommandSource};
use crate::host::GameHost;
use crate::lang::{format_vec3, keys, send_lang};

pub(super) fn tp() -> Command {
    Command::new("tp")
        .usage("[player|place|x y z] or [player] [player|place|x y z]")
        .description("Teleportation command")
        .arity(1, tp_self)
        .arity(2, tp_other)
        .arity(3, tp_self_coords)
        .arity(4, tp_other_coords)
}

/// Players first, then places (one unit above the marker).
fn find_place_or_player(host: &dyn GameHost, query: &str) -> Option<(Vec3, String)> {
    if let Some(player) = host.find_player(query) {
        return Some((player.position, player.name));
    }

    host.find_place(query)
        .map(|place| (place.position + Vec3::Y, place.name))
}

fn tp_self(source: &CommandSource, args: &CommandArgs, world: &mut World) -> CommandResult {
    let Some(actor) = source.as_actor() else {
        return CommandResult::ShowUsage;
    };
    let Some(host) = host(world) else {
        return no_host();
    };

    let Some((position, name)) = find_place_or_player(host, args[0].as_str()) else {
        return CommandResult::failure(keys::FAILED_FIND_PLACE_OR_PLAYER, [&args[0]]);
    };

    with_host(world, |host| host.teleport(actor.id, position));
    send_lang(world, source, keys::TELEPORTED, &[name]);
    CommandResult::Success
}

fn tp_other(source: &CommandSource, args: &CommandArgs, world: &mut World) -> CommandResult {
    let Some(host) = host(world) else {
        return no_host();
    };

    let Some(target) = host.find_player(args[0].as_str()) else {
        return CommandResult::failure(keys::PLAYER_NOT_FOUND, [&args[0]]);
    };
    let Some((position, name)) = find_place_or_player(host, args[1].as_str()) else {
        return CommandResult::failure(keys::FAILED_FIND_PLACE_OR_PLAYER, [&args[1]]);
    };

    with_host(world, |host| host.teleport(target.id, position));
    send_lang_to(world, &target, keys::TELEPORTED, &[name.as_str()]);
    send_lang(world, source, keys::TELEPORTED_SENDER, &[target.name.as_str(), name.as_str()]);
    CommandResult::Success
}

fn tp_self_coords(source: &CommandSource, args: &CommandArgs, world: &mut World) -> CommandResult {
    let Some(actor) = source.as_actor() else {
        return CommandResult::ShowUsage;
    };

    let Some(position) = args.vector3(0) else {
        return CommandResult::failure(keys::INVALID_COORDS, [&args[0], &args[1], &args[2]]);
    };

    if with_host(world, |host| host.teleport(actor.id, position)).is_none() {
        return no_host();
    }
    send_lang(world, source, keys::TELEPORTED, &[format_vec3(position)]);
    CommandResult::Success
}

fn tp_other_coords(source: &CommandSource, args: &CommandArgs, world: &mut World) -> CommandResult {
    let Some(host) = host(world) else {
        return no_host();
    };

    let Some(target) = host.find_player(args[0].as_str()) else {
        return CommandResult::failure(keys::PLAYER_NOT_FOUND, [&args[0]]);
    };
    let Some(position) = args.vector3(1) else {
        return CommandResult::failure(keys::INVALID_COORDS, [&args[1], &args[2], &args[3]]);
    };

    with_host(world, |host| host.teleport(target.id, position));
    let location = format_vec3(position);
    send_lang_to(world, &target, keys::TELEPORTED, &[location.as_str()]);
    send_lang(world, source, keys::TELEPORTED_SENDER, &[target.name.as_str(), location.as_str()]);
    CommandResult::Success
}
