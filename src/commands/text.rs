//! Commands defined in config that print fixed lines.

use std::sync::Arc;

use bevy::prelude::*;

use crate::config::TextCommandDef;
use crate::core::{Command, CommandRegistry, CommandResult};

/// Owner scope of every text command, so a reload can drop them in one go.
pub const TEXT_OWNER: &str = "text";

fn text_command(def: &TextCommandDef) -> Command {
    let lines: Arc<[String]> = def.lines.iter().cloned().collect();

    Command::new(def.name.as_str())
        .aliases(def.aliases.iter().map(String::as_str))
        .description(def.description.as_str())
        .owner(TEXT_OWNER)
        .at_least(0, move |src, _, world| {
            for line in lines.iter() {
                src.send_message(world, line.clone());
            }
            CommandResult::Success
        })
}

/// Register `defs`, skipping any whose name or alias is taken.
///
/// Returns how many were registered.
pub fn register_text_commands(registry: &mut CommandRegistry, defs: &[TextCommandDef]) -> usize {
    let mut registered = 0;

    for def in defs {
        if def.name.trim().is_empty() {
            warn!("Skipping text command with an empty name");
            continue;
        }

        match registry.register(text_command(def)) {
            Ok(_) => registered += 1,
            Err(e) => warn!("Text command '{}' not registered: {}", def.name, e),
        }
    }

    debug!("Registered {} text commands", registered);
    registered
}
