//! Localized message templates.
//!
//! Templates use positional placeholders (`{0}`, `{1}`, ...). Unknown keys
//! render as the key itself so a missing translation is visible rather than
//! silent.

use std::collections::HashMap;

use bevy::prelude::*;

use crate::core::{CommandSource, ConsoleOutputLevel};

/// Catalog keys used by the built-in commands and the dispatcher.
pub mod keys {
    pub const UNKNOWN_COMMAND: &str = "UNKNOWN_COMMAND";
    pub const COMMAND_NO_PERMISSION: &str = "COMMAND_NO_PERMISSION";
    pub const COMMAND_ERROR: &str = "COMMAND_ERROR";
    pub const FAILED_FIND_PLACE_OR_PLAYER: &str = "FAILED_FIND_PLACE_OR_PLAYER";
    pub const PLAYER_NOT_FOUND: &str = "PLAYER_NOT_FOUND";
    pub const TELEPORTED: &str = "TELEPORTED";
    pub const TELEPORTED_SENDER: &str = "TELEPORTED_SENDER";
    pub const INVALID_COORDS: &str = "INVALID_COORDS";
    pub const INVALID_NUMBER: &str = "INVALID_NUMBER";
    pub const MUST_POSITIVE: &str = "MUST_POSITIVE";
    pub const ASCENDED: &str = "ASCENDED";
    pub const DESCENDED: &str = "DESCENDED";
    pub const CLEAR_ITEMS: &str = "CLEAR_ITEMS";
    pub const CLEAR_VEHICLES: &str = "CLEAR_VEHICLES";
    pub const ITEM_NOT_FOUND: &str = "ITEM_NOT_FOUND";
    pub const GIVEN_ITEM_ALL: &str = "GIVEN_ITEM_ALL";
    pub const GIVEN_ITEM: &str = "GIVEN_ITEM";
    pub const RECEIVED_ITEM: &str = "RECEIVED_ITEM";
    pub const INVENTORY_FULL: &str = "INVENTORY_FULL";
    pub const SPY_MODE_ON: &str = "SPY_MODE_ON";
    pub const SPY_MODE_OFF: &str = "SPY_MODE_OFF";
    pub const POSITION: &str = "POSITION";
    pub const POSITION_OTHER: &str = "POSITION_OTHER";
    pub const ONLINE_PLAYERS: &str = "ONLINE_PLAYERS";
    pub const NO_HOST: &str = "NO_HOST";
    pub const SPY_COMMAND: &str = "SPY_COMMAND";
    pub const RELOADED: &str = "RELOADED";
}

const ENGLISH: &[(&str, &str)] = &[
    (keys::UNKNOWN_COMMAND, "Unknown command '{0}'."),
    (keys::COMMAND_NO_PERMISSION, "You do not have permission to use this command."),
    (keys::COMMAND_ERROR, "An error occurred while executing this command."),
    (keys::FAILED_FIND_PLACE_OR_PLAYER, "Could not find a place or player named '{0}'."),
    (keys::PLAYER_NOT_FOUND, "Player '{0}' not found."),
    (keys::TELEPORTED, "You were teleported to {0}."),
    (keys::TELEPORTED_SENDER, "Teleported {0} to {1}."),
    (keys::INVALID_COORDS, "Invalid coordinates: {0} {1} {2}."),
    (keys::INVALID_NUMBER, "'{0}' is not a valid number."),
    (keys::MUST_POSITIVE, "The number must be positive."),
    (keys::ASCENDED, "You ascended {0} \"meters\"."),
    (keys::DESCENDED, "You descended {0} \"meters\"."),
    (keys::CLEAR_ITEMS, "Cleared all dropped items."),
    (keys::CLEAR_VEHICLES, "Cleared all vehicles."),
    (keys::ITEM_NOT_FOUND, "Item '{0}' not found."),
    (keys::GIVEN_ITEM_ALL, "Gave {0}x {1} ({2}) to all players."),
    (keys::GIVEN_ITEM, "Gave {0}x {1} ({2}) to {3}."),
    (keys::RECEIVED_ITEM, "You received {0}x {1} ({2})."),
    (keys::INVENTORY_FULL, "Your inventory is full; some items were dropped."),
    (keys::SPY_MODE_ON, "Spy mode enabled."),
    (keys::SPY_MODE_OFF, "Spy mode disabled."),
    (keys::POSITION, "Your position: {0}, {1}, {2}."),
    (keys::POSITION_OTHER, "{0}'s position: {1}, {2}, {3}."),
    (keys::ONLINE_PLAYERS, "Online players: {0}/{1}."),
    (keys::NO_HOST, "No game host is attached."),
    (keys::SPY_COMMAND, "[Spy] {0}: /{1}"),
    (keys::RELOADED, "Configuration reloaded."),
];

/// Resource holding every message template.
#[derive(Resource, Debug, Clone)]
pub struct MessageCatalog {
    templates: HashMap<String, String>,
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self::english()
    }
}

impl MessageCatalog {
    /// An empty catalog; every lookup falls back to the key.
    pub fn empty() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// The built-in English templates.
    pub fn english() -> Self {
        Self {
            templates: ENGLISH
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, template: impl Into<String>) {
        self.templates.insert(key.into(), template.into());
    }

    /// Overwrite templates from `overrides`, keeping the rest.
    pub fn extend(&mut self, overrides: impl IntoIterator<Item = (String, String)>) {
        self.templates.extend(overrides);
    }

    /// The raw template, or the key when none is known.
    pub fn get<'a>(&'a self, key: &'a str) -> &'a str {
        self.templates.get(key).map(String::as_str).unwrap_or(key)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Render `key` with positional arguments.
    ///
    /// Placeholders without a matching argument are left as-is.
    pub fn format<S: AsRef<str>>(&self, key: &str, args: &[S]) -> String {
        render(self.get(key), args)
    }
}

fn render<S: AsRef<str>>(template: &str, args: &[S]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let substituted = after.find('}').and_then(|close| {
            let index: usize = after[..close].parse().ok()?;
            let arg = args.get(index)?;
            Some((arg.as_ref(), close))
        });

        match substituted {
            Some((arg, close)) => {
                out.push_str(arg);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Format a position for messages.
pub fn format_vec3(v: Vec3) -> String {
    format!("{:.1}, {:.1}, {:.1}", v.x, v.y, v.z)
}

/// Send a catalog message to `source`.
pub fn send_lang<S: AsRef<str>>(world: &mut World, source: &CommandSource, key: &str, args: &[S]) {
    send_lang_with_level(world, source, ConsoleOutputLevel::Info, key, args);
}

pub fn send_lang_with_level<S: AsRef<str>>(
    world: &mut World,
    source: &CommandSource,
    level: ConsoleOutputLevel,
    key: &str,
    args: &[S],
) {
    let message = match world.get_resource::<MessageCatalog>() {
        Some(catalog) => catalog.format(key, args),
        None => MessageCatalog::english().format(key, args),
    };
    source.send_with_level(world, level, message);
}

#[cfg(feature = "persist")]
impl MessageCatalog {
    /// Apply `key: template` overrides from a RON map file.
    pub fn load_overrides(
        &mut self,
        path: impl AsRef<std::path::Path>,
    ) -> Result<usize, crate::config::ConfigError> {
        let overrides: HashMap<String, String> = crate::config::load_ron(path.as_ref())?;
        let count = overrides.len();
        self.extend(overrides);
        Ok(count)
    }
}
