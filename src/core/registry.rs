//! Command registry.
//!
//! Central storage mapping lower-cased names and aliases to commands.
//! Registration either inserts every key of a command or none of them.

use std::collections::HashMap;
use std::sync::Arc;

use bevy::prelude::*;
use thiserror::Error;

use super::Command;

/// Errors raised while registering commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The name or alias is already taken (case-insensitive).
    #[error("command name or alias '{key}' is already registered (requested by '{command}')")]
    DuplicateName { key: String, command: String },
}

/// Registry of every command currently accepted by the dispatcher.
///
/// Commands are shared as `Arc<Command>` so a dispatch can release the
/// registry borrow before the handler runs with `&mut World`.
///
/// # Examples
///
/// ```ignore
/// let mut registry = CommandRegistry::new();
/// registry.register(Command::new("online").arity(0, online))?;
///
/// let cmd = registry.resolve("ONLINE").unwrap();
/// assert_eq!(cmd.name(), "online");
/// ```
#[derive(Resource, Default)]
pub struct CommandRegistry {
    /// Lower-cased name -> command.
    commands: HashMap<Box<str>, Arc<Command>>,
    /// Lower-cased alias -> lower-cased owning name.
    aliases: HashMap<Box<str>, Box<str>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_taken(&self, key: &str) -> bool {
        self.commands.contains_key(key) || self.aliases.contains_key(key)
    }

    /// Register a command under its name and all of its aliases.
    ///
    /// Fails without modifying the registry if any key is already taken,
    /// including a command that repeats one of its own keys.
    pub fn register(&mut self, command: Command) -> Result<Arc<Command>, RegistryError> {
        let keys: Vec<Box<str>> = command.keys().map(|k| k.to_lowercase().into()).collect();

        for (i, key) in keys.iter().enumerate() {
            if self.is_taken(key) || keys[..i].contains(key) {
                return Err(RegistryError::DuplicateName {
                    key: key.to_string(),
                    command: command.name().to_string(),
                });
            }
        }

        let command = Arc::new(command);
        // keys[0] is the name, the rest are aliases.
        let name = keys[0].clone();

        for alias in &keys[1..] {
            self.aliases.insert(alias.clone(), name.clone());
        }
        self.commands.insert(name, Arc::clone(&command));

        debug!("Registered command '{}'", command.name());
        Ok(command)
    }

    /// Remove a command (looked up by name or alias) and all of its keys.
    ///
    /// Returns the removed command; unknown names are a no-op.
    pub fn unregister(&mut self, name_or_alias: &str) -> Option<Arc<Command>> {
        let name = self.canonical_key(name_or_alias)?;
        let command = self.commands.remove(&name)?;
        self.aliases.retain(|_, owner| *owner != name);
        Some(command)
    }

    /// Remove every command registered by `owner`. Returns how many were removed.
    pub fn unregister_all(&mut self, owner: &str) -> usize {
        let names: Vec<Box<str>> = self
            .commands
            .iter()
            .filter(|(_, cmd)| cmd.get_owner() == owner)
            .map(|(name, _)| name.clone())
            .collect();

        for name in &names {
            self.commands.remove(name);
        }
        self.aliases.retain(|_, target| !names.contains(target));
        names.len()
    }

    /// Remove every command.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.aliases.clear();
    }

    fn canonical_key(&self, token: &str) -> Option<Box<str>> {
        let key: Box<str> = token.to_lowercase().into();
        if self.commands.contains_key(&key) {
            return Some(key);
        }
        self.aliases.get(&key).cloned()
    }

    /// Case-insensitive lookup, names first then aliases.
    pub fn resolve(&self, token: &str) -> Option<&Arc<Command>> {
        let key = self.canonical_key(token)?;
        self.commands.get(&key)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.canonical_key(token).is_some()
    }

    /// Number of registered commands (aliases not counted).
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Iterate over registered commands in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Command>> {
        self.commands.values()
    }

    /// Registered command names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.values().map(|c| c.name()).collect();
        names.sort_unstable();
        names
    }

    /// Find commands whose name or description contains `query`.
    pub fn search(&self, query: &str) -> Vec<&Arc<Command>> {
        let query = query.to_lowercase();

        let mut matches: Vec<_> = self
            .commands
            .values()
            .filter(|cmd| {
                cmd.name().to_lowercase().contains(&query)
                    || cmd.get_description().to_lowercase().contains(&query)
            })
            .collect();

        matches.sort_by(|a, b| a.name().cmp(b.name()));
        matches
    }
}
