use std::collections::HashSet;
use std::time::Duration;

use bevy::prelude::*;

use super::{host, no_host, send_lang_to, with_host};
use crate::core::{
    ActorId, AllowedSource, ArgumentValue, Command, CommandResult, CommandSource, TaskScheduler,
};
use crate::host::{Host, PlayerInfo};
use crate::lang::{keys, send_lang};

/// Delay between ejecting passengers and destroying their vehicles.
const VEHICLE_DESTROY_DELAY: Duration = Duration::from_millis(200);

/// Players currently watching other players' commands.
#[derive(Resource, Debug, Default)]
pub struct SpyList(pub HashSet<ActorId>);

/// Show a player's command line to every spy except the player.
pub fn notify_spies(world: &mut World, source: &CommandSource, line: &str) {
    let Some(actor) = source.as_actor() else {
        return;
    };
    let Some(spies) = world.get_resource::<SpyList>() else {
        return;
    };

    let watchers: Vec<ActorId> = spies.0.iter().copied().filter(|id| *id != actor.id).collect();
    let line = line.trim().trim_start_matches('/');

    for id in watchers {
        let spy = CommandSource::player(id.0, "");
        send_lang(world, &spy, keys::SPY_COMMAND, &[&*actor.name, line]);
    }
}

pub(super) fn ascend() -> Command {
    Command::new("ascend")
        .alias("asc")
        .usage("[amount]")
        .description("Ascend X \"meters\".")
        .allowed_source(AllowedSource::PlayerOnly)
        .at_least(1, |src, args, world| shift_vertically(src, &args[0], 1.0, keys::ASCENDED, world))
}

pub(super) fn descend() -> Command {
    Command::new("descend")
        .alias("desc")
        .usage("[amount]")
        .description("Descend X \"meters\".")
        .allowed_source(AllowedSource::PlayerOnly)
        .at_least(1, |src, args, world| {
            shift_vertically(src, &args[0], -1.0, keys::DESCENDED, world)
        })
}

fn shift_vertically(
    source: &CommandSource,
    amount: &ArgumentValue,
    direction: f32,
    done_key: &'static str,
    world: &mut World,
) -> CommandResult {
    let Some(actor) = source.as_actor() else {
        return CommandResult::ShowUsage;
    };
    if !amount.is_float() {
        return CommandResult::failure(keys::INVALID_NUMBER, [amount]);
    }
    let meters = amount.to_float();
    if meters <= 0.0 {
        return CommandResult::failure(keys::MUST_POSITIVE, [amount]);
    }

    let Some(host) = host(world) else {
        return no_host();
    };
    let Some(player) = host.player(actor.id) else {
        return CommandResult::failure(keys::PLAYER_NOT_FOUND, [&actor.name]);
    };

    let destination = player.position + Vec3::Y * meters * direction;
    with_host(world, |host| host.teleport(actor.id, destination));
    send_lang(world, source, done_key, &[meters.to_string()]);
    CommandResult::Success
}

pub(super) fn position() -> Command {
    Command::new("position")
        .aliases(["pos", "coords"])
        .usage("<player>")
        .description("View your/another player position.")
        .arity(0, |src, _, world| {
            let Some(actor) = src.as_actor() else {
                return CommandResult::ShowUsage;
            };
            let Some(host) = host(world) else {
                return no_host();
            };
            let Some(player) = host.player(actor.id) else {
                return CommandResult::failure(keys::PLAYER_NOT_FOUND, [&actor.name]);
            };

            let p = player.position;
            send_lang(world, src, keys::POSITION, &coords(p));
            CommandResult::Success
        })
        .arity(1, |src, args, world| {
            let Some(host) = host(world) else {
                return no_host();
            };
            let Some(player) = host.find_player(args[0].as_str()) else {
                return CommandResult::failure(keys::PLAYER_NOT_FOUND, [&args[0]]);
            };

            let [x, y, z] = coords(player.position);
            send_lang(world, src, keys::POSITION_OTHER, &[player.name, x, y, z]);
            CommandResult::Success
        })
}

fn coords(p: Vec3) -> [String; 3] {
    [p.x, p.y, p.z].map(|c| format!("{c:.1}"))
}

pub(super) fn online() -> Command {
    Command::new("online")
        .description("View the number of online players")
        .at_least(0, |src, _, world| {
            let Some(host) = host(world) else {
                return no_host();
            };
            let online = host.online_players().len();
            let max = host.max_players();

            send_lang(world, src, keys::ONLINE_PLAYERS, &[online.to_string(), max.to_string()]);
            CommandResult::Success
        })
}

pub(super) fn spy() -> Command {
    Command::new("spy")
        .description("Toggle spy mode")
        .allowed_source(AllowedSource::PlayerOnly)
        .at_least(0, |src, _, world| {
            let Some(actor) = src.as_actor() else {
                return CommandResult::ShowUsage;
            };

            let mut spies = world.get_resource_or_insert_with(SpyList::default);
            let key = if spies.0.remove(&actor.id) {
                keys::SPY_MODE_OFF
            } else {
                spies.0.insert(actor.id);
                keys::SPY_MODE_ON
            };

            send_lang::<&str>(world, src, key, &[]);
            CommandResult::Success
        })
}

pub(super) fn clear() -> Command {
    Command::new("clear")
        .usage("i = items, v = vehicles, a = all")
        .description("Clear things")
        .at_least(1, |src, args, world| {
            if world.get_resource::<Host>().is_none() {
                return no_host();
            }

            let joined = args.join_from(0).to_lowercase();
            // Any 'a' anywhere selects everything.
            let has_flag = |flag: &str| joined.contains(flag) || joined.contains('a');

            if has_flag("i") {
                with_host(world, |host| host.clear_items());
                send_lang::<&str>(world, src, keys::CLEAR_ITEMS, &[]);
            }

            if has_flag("v") {
                with_host(world, |host| host.eject_vehicle_passengers());
                schedule_vehicle_destruction(world);
                send_lang::<&str>(world, src, keys::CLEAR_VEHICLES, &[]);
            }

            CommandResult::Success
        })
}

fn schedule_vehicle_destruction(world: &mut World) {
    let destroy = |world: &mut World| {
        with_host(world, |host| host.destroy_vehicles());
    };

    match world.get_resource::<TaskScheduler>() {
        Some(scheduler) => {
            scheduler.new_task(destroy).delay(VEHICLE_DESTROY_DELAY).go();
        }
        None => destroy(world),
    }
}

pub(super) fn shutdown() -> Command {
    Command::new("shutdown")
        .alias("stop")
        .usage("<reason>")
        .description("Shutdown server")
        .at_least(0, |_, args, world| {
            let reason = (!args.is_empty()).then(|| args.join_from(0));

            let done = with_host(world, |host| {
                if let Some(reason) = &reason {
                    host.kick_all(reason);
                }
                host.shutdown();
            });
            if done.is_none() {
                return no_host();
            }

            info!("Shutting down{}", reason.map(|r| format!(": {r}")).unwrap_or_default());
            CommandResult::Success
        })
}

pub(super) fn item() -> Command {
    Command::new("item")
        .alias("i")
        .usage("[item] <amount> or [player|* = all] [item] [amount]")
        .description("Give items")
        .arity(1, |src, args, world| {
            let Some(me) = self_player(src, world) else {
                return CommandResult::ShowUsage;
            };
            give_item(world, src, Recipients::One(me), &args[0], None)
        })
        .arity(2, |src, args, world| {
            if args[1].is_int() {
                let Some(me) = self_player(src, world) else {
                    return CommandResult::ShowUsage;
                };
                return give_item(world, src, Recipients::One(me), &args[0], Some(&args[1]));
            }
            if args[0].is("*") {
                return give_item(world, src, Recipients::All, &args[1], None);
            }

            match find_player(world, &args[0]) {
                Ok(target) => give_item(world, src, Recipients::One(target), &args[1], None),
                Err(failure) => failure,
            }
        })
        .arity(3, |src, args, world| {
            if args[0].is("*") {
                return give_item(world, src, Recipients::All, &args[1], Some(&args[2]));
            }

            match find_player(world, &args[0]) {
                Ok(target) => give_item(world, src, Recipients::One(target), &args[1], Some(&args[2])),
                Err(failure) => failure,
            }
        })
}

enum Recipients {
    All,
    One(PlayerInfo),
}

fn self_player(source: &CommandSource, world: &World) -> Option<PlayerInfo> {
    let actor = source.as_actor()?;
    host(world)?.player(actor.id)
}

fn find_player(world: &World, query: &ArgumentValue) -> Result<PlayerInfo, CommandResult> {
    let host = host(world).ok_or_else(no_host)?;
    host.find_player(query.as_str())
        .ok_or_else(|| CommandResult::failure(keys::PLAYER_NOT_FOUND, [query]))
}

fn give_item(
    world: &mut World,
    source: &CommandSource,
    recipients: Recipients,
    item_arg: &ArgumentValue,
    amount_arg: Option<&ArgumentValue>,
) -> CommandResult {
    let Some(host) = host(world) else {
        return no_host();
    };
    let Some(item) = host.find_item(item_arg.as_str()) else {
        return CommandResult::failure(keys::ITEM_NOT_FOUND, [item_arg]);
    };

    let amount = match amount_arg {
        None => 1,
        Some(arg) if !arg.is_short() => return CommandResult::failure(keys::INVALID_NUMBER, [arg]),
        Some(arg) if arg.to_short() <= 0 => {
            return CommandResult::failure(keys::MUST_POSITIVE, std::iter::empty::<&str>());
        }
        Some(arg) => arg.to_ushort(),
    };

    let (id, amt, name) = (item.id.to_string(), amount.to_string(), item.name.clone());

    let players = match recipients {
        Recipients::All => {
            let players = host.online_players();
            send_lang(world, source, keys::GIVEN_ITEM_ALL, &[&amt, &name, &id]);
            players
        }
        Recipients::One(target) => {
            let to_self = source.as_actor().is_some_and(|a| a.id == target.id);
            if !to_self {
                send_lang(world, source, keys::GIVEN_ITEM, &[&amt, &name, &id, &target.name]);
            }
            vec![target]
        }
    };

    for player in players {
        let delivered = with_host(world, |host| host.give_item(player.id, item.id, amount))
            .unwrap_or(false);

        send_lang_to(world, &player, keys::RECEIVED_ITEM, &[&amt, &name, &id]);
        if !delivered {
            send_lang_to::<&str>(world, &player, keys::INVENTORY_FULL, &[]);
        }
    }

    CommandResult::Success
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        dispatch, CommandArgs, CommandRegistry, DispatchResult, OutputTarget, PendingOutput,
        PermissionResolver,
    };
    use crate::testing::{FakeHost, TableAuthority};

    fn setup() -> (World, FakeHost) {
        let fake = FakeHost::new()
            .with_player(1, "Alice", Vec3::new(0.0, 10.0, 0.0))
            .with_player(2, "Bob", Vec3::new(50.0, 20.0, 50.0))
            .with_item(363, "Maplestrike")
            .with_item(15, "Bandage");

        let mut world = World::new();
        world.init_resource::<PendingOutput>();
        world.init_resource::<SpyList>();
        world.init_resource::<TaskScheduler>();
        world.insert_resource(Host::new(fake.clone()));
        world.insert_resource(PermissionResolver::new(
            TableAuthority::new().grant("console", "*").grant("1", "*").grant("2", "*"),
        ));

        let mut registry = CommandRegistry::new();
        for cmd in [ascend(), descend(), position(), online(), spy(), clear(), shutdown(), item()] {
            registry.register(cmd).unwrap();
        }
        world.insert_resource(registry);
        (world, fake)
    }

    fn run(world: &mut World, source: &CommandSource, line: &str) -> DispatchResult {
        let mut tokens = line.split_whitespace();
        let label = tokens.next().unwrap();
        let rest: Vec<&str> = tokens.collect();
        dispatch(world, source, label, &CommandArgs::from_tokens(&rest))
    }

    fn ok() -> DispatchResult {
        DispatchResult::Executed(CommandResult::Success)
    }

    fn alice() -> CommandSource {
        CommandSource::player(1, "Alice")
    }

    fn messages(world: &World, id: u64) -> Vec<String> {
        world
            .resource::<PendingOutput>()
            .messages_for(OutputTarget::Player(ActorId(id)))
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_ascend_and_descend() {
        let (mut world, fake) = setup();

        assert_eq!(run(&mut world, &alice(), "asc 5"), ok());
        assert_eq!(run(&mut world, &alice(), "descend 2.5"), ok());
        assert_eq!(
            fake.state().teleports,
            vec![
                (ActorId(1), Vec3::new(0.0, 15.0, 0.0)),
                (ActorId(1), Vec3::new(0.0, 12.5, 0.0)),
            ]
        );

        assert_eq!(
            run(&mut world, &alice(), "asc -1"),
            DispatchResult::Executed(CommandResult::failure(keys::MUST_POSITIVE, ["-1"]))
        );
        assert_eq!(
            run(&mut world, &alice(), "asc up"),
            DispatchResult::Executed(CommandResult::failure(keys::INVALID_NUMBER, ["up"]))
        );
        assert_eq!(run(&mut world, &alice(), "asc"), DispatchResult::ShowUsage);
        assert_eq!(run(&mut world, &CommandSource::Console, "asc 5"), DispatchResult::ShowUsage);

        // Trailing tokens are ignored.
        assert_eq!(run(&mut world, &alice(), "asc 5 quickly"), ok());
        assert_eq!(run(&mut world, &alice(), "desc 1 2 3"), ok());
        assert_eq!(
            fake.state().teleports[2..],
            [
                (ActorId(1), Vec3::new(0.0, 17.5, 0.0)),
                (ActorId(1), Vec3::new(0.0, 16.5, 0.0)),
            ]
        );
    }

    #[test]
    fn test_position() {
        let (mut world, _) = setup();

        assert_eq!(run(&mut world, &alice(), "pos"), ok());
        assert_eq!(
            run(&mut world, &CommandSource::Console, "coords"),
            DispatchResult::Executed(CommandResult::ShowUsage)
        );
        assert_eq!(run(&mut world, &CommandSource::Console, "position bob"), ok());

        assert_eq!(messages(&world, 1), vec!["Your position: 0.0, 10.0, 0.0."]);
        assert_eq!(
            world.resource::<PendingOutput>().messages_for(OutputTarget::Console),
            vec!["Bob's position: 50.0, 20.0, 50.0."]
        );
    }

    #[test]
    fn test_online_counts_players() {
        let (mut world, _) = setup();

        assert_eq!(run(&mut world, &alice(), "online"), ok());
        assert_eq!(messages(&world, 1), vec!["Online players: 2/24."]);
    }

    #[test]
    fn test_spy_toggle_and_notify() {
        let (mut world, _) = setup();
        let bob = CommandSource::player(2, "Bob");

        assert_eq!(run(&mut world, &alice(), "spy"), ok());
        assert!(world.resource::<SpyList>().0.contains(&ActorId(1)));

        notify_spies(&mut world, &bob, "/tp Alice");
        notify_spies(&mut world, &alice(), "/online");
        notify_spies(&mut world, &CommandSource::Console, "stop");

        assert_eq!(run(&mut world, &alice(), "spy"), ok());
        assert!(world.resource::<SpyList>().0.is_empty());

        assert_eq!(
            messages(&world, 1),
            vec!["Spy mode enabled.", "[Spy] Bob: /tp Alice", "Spy mode disabled."]
        );
        assert_eq!(run(&mut world, &CommandSource::Console, "spy"), DispatchResult::ShowUsage);
    }

    #[test]
    fn test_clear_flags() {
        let (mut world, fake) = setup();

        assert_eq!(run(&mut world, &CommandSource::Console, "clear -i"), ok());
        {
            let state = fake.state();
            assert_eq!(state.items_cleared, 1);
            assert_eq!(state.passengers_ejected, 0);
        }

        assert_eq!(run(&mut world, &CommandSource::Console, "clear -v"), ok());
        assert_eq!(fake.state().passengers_ejected, 1);
        // Destruction waits for the scheduler.
        assert_eq!(fake.state().vehicles_destroyed, 0);

        let scheduler = world.resource::<TaskScheduler>().clone();
        scheduler.poll(Duration::from_millis(199), &mut world);
        assert_eq!(fake.state().vehicles_destroyed, 0);
        scheduler.poll(Duration::from_millis(200), &mut world);
        assert_eq!(fake.state().vehicles_destroyed, 1);

        // "a" anywhere clears everything.
        assert_eq!(run(&mut world, &CommandSource::Console, "clear all"), ok());
        assert_eq!(fake.state().items_cleared, 2);
        assert_eq!(fake.state().passengers_ejected, 2);

        assert_eq!(run(&mut world, &CommandSource::Console, "clear"), DispatchResult::ShowUsage);
    }

    #[test]
    fn test_shutdown_with_reason() {
        let (mut world, fake) = setup();

        assert_eq!(run(&mut world, &CommandSource::Console, "stop back in 5 minutes"), ok());
        let state = fake.state();
        assert_eq!(state.kicked_with.as_deref(), Some("back in 5 minutes"));
        assert!(state.shut_down);
    }

    #[test]
    fn test_shutdown_without_reason() {
        let (mut world, fake) = setup();

        assert_eq!(run(&mut world, &CommandSource::Console, "shutdown"), ok());
        assert_eq!(fake.state().kicked_with, None);
        assert!(fake.state().shut_down);
    }

    #[test]
    fn test_item_forms() {
        let (mut world, fake) = setup();

        assert_eq!(run(&mut world, &alice(), "i 363"), ok());
        assert_eq!(run(&mut world, &alice(), "i bandage 5"), ok());
        assert_eq!(run(&mut world, &alice(), "i bob bandage"), ok());
        assert_eq!(run(&mut world, &CommandSource::Console, "item * 15 3"), ok());

        assert_eq!(
            fake.state().given,
            vec![
                (ActorId(1), 363, 1),
                (ActorId(1), 15, 5),
                (ActorId(2), 15, 1),
                (ActorId(1), 15, 3),
                (ActorId(2), 15, 3),
            ]
        );
        assert_eq!(
            messages(&world, 1),
            vec![
                "You received 1x Maplestrike (363).",
                "You received 5x Bandage (15).",
                "Gave 1x Bandage (15) to Bob.",
                "You received 3x Bandage (15).",
            ]
        );
    }

    #[test]
    fn test_item_errors() {
        let (mut world, fake) = setup();

        assert_eq!(
            run(&mut world, &CommandSource::Console, "i 363"),
            DispatchResult::Executed(CommandResult::ShowUsage)
        );
        assert_eq!(
            run(&mut world, &CommandSource::Console, "i 363 2"),
            DispatchResult::Executed(CommandResult::ShowUsage)
        );
        assert_eq!(
            run(&mut world, &alice(), "i nothing"),
            DispatchResult::Executed(CommandResult::failure(keys::ITEM_NOT_FOUND, ["nothing"]))
        );
        assert_eq!(
            run(&mut world, &alice(), "i zed bandage"),
            DispatchResult::Executed(CommandResult::failure(keys::PLAYER_NOT_FOUND, ["zed"]))
        );
        assert_eq!(
            run(&mut world, &alice(), "i bob 15 lots"),
            DispatchResult::Executed(CommandResult::failure(keys::INVALID_NUMBER, ["lots"]))
        );
        assert_eq!(
            run(&mut world, &alice(), "i bob 15 0"),
            DispatchResult::Executed(CommandResult::failure(
                keys::MUST_POSITIVE,
                std::iter::empty::<&str>()
            ))
        );
        assert!(fake.state().given.is_empty());
    }

    #[test]
    fn test_item_inventory_full() {
        let (mut world, fake) = setup();
        fake.state().full_inventories.insert(ActorId(2));

        assert_eq!(run(&mut world, &alice(), "i bob bandage"), ok());
        assert_eq!(
            messages(&world, 2),
            vec![
                "You received 1x Bandage (15).",
                "Your inventory is full; some items were dropped.",
            ]
        );
    }
}
