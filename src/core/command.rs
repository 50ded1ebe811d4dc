//! Command definitions.
//!
//! A command is an immutable description plus one handler per accepted
//! argument count. The same name can mean several operations depending on
//! how many tokens follow it.

use std::collections::BTreeMap;
use std::fmt;

use bevy::prelude::*;

use super::{CommandArgs, CommandSource};

/// Scope used for commands that ship with this crate.
pub const BUILTIN_OWNER: &str = "essentials";

/// Which kinds of source may run a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AllowedSource {
    #[default]
    Any,
    ConsoleOnly,
    PlayerOnly,
}

impl AllowedSource {
    /// Whether `source` satisfies this restriction.
    pub fn permits(self, source: &CommandSource) -> bool {
        match self {
            AllowedSource::Any => true,
            AllowedSource::ConsoleOnly => source.is_console(),
            AllowedSource::PlayerOnly => !source.is_console(),
        }
    }
}

/// Outcome reported by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    Success,
    /// Show the command's usage line to the source.
    ShowUsage,
    /// A localized failure: catalog key plus template arguments.
    Failure {
        key: &'static str,
        args: Vec<String>,
    },
}

impl CommandResult {
    /// Build a failure from any displayable template arguments.
    pub fn failure<I, T>(key: &'static str, args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: fmt::Display,
    {
        Self::Failure {
            key,
            args: args.into_iter().map(|a| a.to_string()).collect(),
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Handler for one arity variant.
///
/// Handlers receive:
/// - `source`: who invoked the command
/// - `args`: the positional tokens
/// - `world`: mutable access to the host world (host bridge, scheduler, ...)
pub type CommandHandler =
    Box<dyn Fn(&CommandSource, &CommandArgs, &mut World) -> CommandResult + Send + Sync>;

/// Argument count a handler variant accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Arity {
    /// Exactly this many tokens.
    Exact(usize),
    /// This many tokens or more. Only consulted when no exact variant matches.
    AtLeast(usize),
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{n}"),
            Arity::AtLeast(n) => write!(f, "{n}+"),
        }
    }
}

/// A registered command.
///
/// # Examples
///
/// ```ignore
/// let heal = Command::new("heal")
///     .usage("[player]")
///     .description("Restore health")
///     .arity(0, |src, _args, world| heal_self(src, world))
///     .arity(1, |src, args, world| heal_other(src, &args[0], world));
/// ```
pub struct Command {
    name: Box<str>,
    aliases: Vec<Box<str>>,
    usage: Box<str>,
    description: Box<str>,
    allowed_source: AllowedSource,
    permission: Option<Box<str>>,
    owner: Box<str>,
    handlers: BTreeMap<Arity, CommandHandler>,
}

impl Command {
    /// Create a command with no handlers yet.
    pub fn new(name: impl Into<Box<str>>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            usage: "".into(),
            description: "".into(),
            allowed_source: AllowedSource::Any,
            permission: None,
            owner: BUILTIN_OWNER.into(),
            handlers: BTreeMap::new(),
        }
    }

    pub fn alias(mut self, alias: impl Into<Box<str>>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Box<str>>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn usage(mut self, usage: impl Into<Box<str>>) -> Self {
        self.usage = usage.into();
        self
    }

    pub fn description(mut self, description: impl Into<Box<str>>) -> Self {
        self.description = description.into();
        self
    }

    pub fn allowed_source(mut self, allowed: AllowedSource) -> Self {
        self.allowed_source = allowed;
        self
    }

    /// Override the permission node. Defaults to the lower-cased name.
    pub fn permission(mut self, node: impl Into<Box<str>>) -> Self {
        self.permission = Some(node.into());
        self
    }

    /// Scope this command belongs to, for bulk unregistration.
    pub fn owner(mut self, owner: impl Into<Box<str>>) -> Self {
        self.owner = owner.into();
        self
    }

    /// Add a handler for exactly `count` arguments.
    pub fn arity<F>(self, count: usize, handler: F) -> Self
    where
        F: Fn(&CommandSource, &CommandArgs, &mut World) -> CommandResult + Send + Sync + 'static,
    {
        self.variant(Arity::Exact(count), handler)
    }

    /// Add a handler for `min` or more arguments.
    pub fn at_least<F>(self, min: usize, handler: F) -> Self
    where
        F: Fn(&CommandSource, &CommandArgs, &mut World) -> CommandResult + Send + Sync + 'static,
    {
        self.variant(Arity::AtLeast(min), handler)
    }

    fn variant<F>(mut self, arity: Arity, handler: F) -> Self
    where
        F: Fn(&CommandSource, &CommandArgs, &mut World) -> CommandResult + Send + Sync + 'static,
    {
        if self.handlers.insert(arity, Box::new(handler)).is_some() {
            warn!("Command '{}': replacing handler for arity {}", self.name, arity);
        }
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn get_aliases(&self) -> &[Box<str>] {
        &self.aliases
    }

    #[inline]
    pub fn get_usage(&self) -> &str {
        &self.usage
    }

    #[inline]
    pub fn get_description(&self) -> &str {
        &self.description
    }

    #[inline]
    pub fn get_allowed_source(&self) -> AllowedSource {
        self.allowed_source
    }

    #[inline]
    pub fn get_owner(&self) -> &str {
        &self.owner
    }

    /// The permission node guarding this command.
    pub fn permission_node(&self) -> String {
        match &self.permission {
            Some(node) => node.to_lowercase(),
            None => self.name.to_lowercase(),
        }
    }

    /// Every key this command answers to: its name followed by its aliases.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_ref()).chain(self.aliases.iter().map(AsRef::as_ref))
    }

    /// Declared arity variants, exact ones first.
    pub fn arities(&self) -> impl Iterator<Item = Arity> + '_ {
        self.handlers.keys().copied()
    }

    /// Pick the handler for `count` arguments.
    ///
    /// An exact variant always wins. Otherwise the variadic variant with the
    /// largest minimum not exceeding `count` is used.
    pub fn handler_for(&self, count: usize) -> Option<&CommandHandler> {
        if let Some(handler) = self.handlers.get(&Arity::Exact(count)) {
            return Some(handler);
        }

        self.handlers
            .range(Arity::AtLeast(0)..=Arity::AtLeast(count))
            .next_back()
            .map(|(_, handler)| handler)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("allowed_source", &self.allowed_source)
            .field("arities", &self.handlers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(_: &CommandSource, _: &CommandArgs, _: &mut World) -> CommandResult {
        CommandResult::Success
    }

    #[test]
    fn test_command_creation() {
        let cmd = Command::new("Tp")
            .aliases(["teleport"])
            .usage("[player]")
            .description("Teleportation command")
            .arity(1, ok);

        assert_eq!(cmd.name(), "Tp");
        assert_eq!(cmd.permission_node(), "tp");
        assert_eq!(cmd.keys().collect::<Vec<_>>(), vec!["Tp", "teleport"]);
        assert_eq!(cmd.get_owner(), BUILTIN_OWNER);
    }

    #[test]
    fn test_explicit_permission_is_lowercased() {
        let cmd = Command::new("item").permission("Essentials.Item");
        assert_eq!(cmd.permission_node(), "essentials.item");
    }

    #[test]
    fn test_handler_selection_by_count() {
        let cmd = Command::new("x").arity(1, ok).arity(3, ok);

        assert!(cmd.handler_for(0).is_none());
        assert!(cmd.handler_for(1).is_some());
        assert!(cmd.handler_for(2).is_none());
        assert!(cmd.handler_for(3).is_some());
        assert!(cmd.handler_for(4).is_none());
    }

    #[test]
    fn test_exact_variant_beats_variadic() {
        let cmd = Command::new("x")
            .arity(2, |_, _, _| CommandResult::ShowUsage)
            .at_least(1, ok);

        let mut world = World::new();
        let args = CommandArgs::from_tokens(&["a", "b"]);
        let exact = cmd.handler_for(2).unwrap();
        assert_eq!(exact(&CommandSource::Console, &args, &mut world), CommandResult::ShowUsage);

        let variadic = cmd.handler_for(5).unwrap();
        assert_eq!(variadic(&CommandSource::Console, &args, &mut world), CommandResult::Success);

        assert!(cmd.handler_for(0).is_none());
    }

    #[test]
    fn test_largest_variadic_minimum_wins() {
        let cmd = Command::new("x")
            .at_least(0, |_, _, _| CommandResult::ShowUsage)
            .at_least(2, ok);

        let mut world = World::new();
        let args = CommandArgs::default();
        let mut pick = |n| cmd.handler_for(n).unwrap()(&CommandSource::Console, &args, &mut world);
        assert_eq!(pick(1), CommandResult::ShowUsage);
        assert_eq!(pick(2), CommandResult::Success);
        assert_eq!(pick(9), CommandResult::Success);
    }

    #[test]
    fn test_allowed_source() {
        let console = CommandSource::Console;
        let player = CommandSource::player(1, "p");

        assert!(AllowedSource::Any.permits(&console));
        assert!(AllowedSource::ConsoleOnly.permits(&console));
        assert!(!AllowedSource::ConsoleOnly.permits(&player));
        assert!(AllowedSource::PlayerOnly.permits(&player));
        assert!(!AllowedSource::PlayerOnly.permits(&console));
    }

    #[test]
    fn test_failure_args_are_stringified() {
        let result = CommandResult::failure("INVALID_COORDS", ["1", "x", "3"]);
        assert_eq!(
            result,
            CommandResult::Failure {
                key: "INVALID_COORDS",
                args: vec!["1".into(), "x".into(), "3".into()],
            }
        );
    }
}
