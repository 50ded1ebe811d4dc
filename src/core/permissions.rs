//! Layered permission checks.
//!
//! [`PermissionResolver`] wraps an external [`PermissionAuthority`] that owns
//! the actual grants. The resolver adds exactly one rule on top: a subject
//! holding `*` in the authority is granted every node, even when the
//! authority itself has no wildcard concept. Everything else, including the
//! authority's own negation conventions, is left to the authority.

use bevy::prelude::*;

#[cfg(feature = "persist")]
use serde::{Deserialize, Serialize};

use super::{Command, CommandSource};

/// The universal wildcard node.
pub const WILDCARD: &str = "*";

/// Prefix marking a negated entry in the authority's storage.
pub const NEGATION_PREFIX: char = '!';

/// Name of the umbrella command that is always permitted at command level.
pub const UMBRELLA_COMMAND: &str = "essentials";

/// Outcome of a group mutation on the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorityResult {
    Success,
    UnspecifiedError,
    DuplicateEntry,
    GroupNotFound,
    PlayerNotFound,
}

/// Command-level permission answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandPermission {
    pub granted: bool,
    /// Seconds left before the subject may run the command again, as
    /// reported by the authority. The resolver never computes this itself.
    pub cooldown: Option<u32>,
}

impl CommandPermission {
    pub const fn granted() -> Self {
        Self {
            granted: true,
            cooldown: None,
        }
    }

    pub const fn denied() -> Self {
        Self {
            granted: false,
            cooldown: None,
        }
    }
}

/// A node held by a group, with an optional per-command cooldown.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "persist", derive(Serialize, Deserialize))]
pub struct PermissionEntry {
    pub node: String,
    #[cfg_attr(feature = "persist", serde(default))]
    pub cooldown: u32,
}

impl PermissionEntry {
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            cooldown: 0,
        }
    }

    pub fn with_cooldown(mut self, seconds: u32) -> Self {
        self.cooldown = seconds;
        self
    }
}

/// A named permission group.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "persist", derive(Serialize, Deserialize))]
pub struct PermissionGroup {
    pub id: String,
    #[cfg_attr(feature = "persist", serde(default))]
    pub display_name: String,
    #[cfg_attr(feature = "persist", serde(default))]
    pub parent: Option<String>,
    /// Subject ids (see [`CommandSource::subject_id`]).
    #[cfg_attr(feature = "persist", serde(default))]
    pub members: Vec<String>,
    #[cfg_attr(feature = "persist", serde(default))]
    pub permissions: Vec<PermissionEntry>,
}

impl PermissionGroup {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            ..Default::default()
        }
    }

    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn member(mut self, subject: impl Into<String>) -> Self {
        self.members.push(subject.into());
        self
    }

    pub fn grant(mut self, entry: impl Into<PermissionEntry>) -> Self {
        self.permissions.push(entry.into());
        self
    }
}

impl From<&str> for PermissionEntry {
    fn from(node: &str) -> Self {
        PermissionEntry::new(node)
    }
}

/// The external authority that stores grants and groups.
///
/// The core never persists permission data itself; implementations decide
/// where groups live.
pub trait PermissionAuthority: Send + Sync + 'static {
    /// Whether `subject` holds `node`, falling back to `default` when the
    /// authority has no opinion.
    fn has_permission(&self, subject: &CommandSource, node: &str, default: bool) -> bool;

    /// Command-level check, including any cooldown the authority tracks.
    fn has_command_permission(
        &self,
        subject: &CommandSource,
        command: &Command,
        default: bool,
    ) -> CommandPermission;

    /// Groups `subject` belongs to, optionally including inherited parents.
    fn groups(&self, subject: &CommandSource, include_parents: bool) -> Vec<PermissionGroup>;

    /// Every node `subject` holds.
    fn permissions(&self, subject: &CommandSource) -> Vec<PermissionEntry>;

    fn group(&self, group_id: &str) -> Option<PermissionGroup>;

    fn add_player_to_group(&mut self, group_id: &str, subject: &CommandSource) -> AuthorityResult;

    fn remove_player_from_group(&mut self, group_id: &str, subject: &CommandSource)
    -> AuthorityResult;

    fn add_group(&mut self, group: PermissionGroup) -> AuthorityResult;

    fn save_group(&mut self, group: PermissionGroup) -> AuthorityResult;

    fn delete_group(&mut self, group_id: &str) -> AuthorityResult;

    /// Re-read grants from the authority's backing store.
    fn reload(&mut self);
}

/// Permission checks layered over a [`PermissionAuthority`].
///
/// # Examples
///
/// ```ignore
/// let resolver = PermissionResolver::new(GroupAuthority::default());
/// if resolver.has_permission(&source, "essentials.tp") { /* ... */ }
/// ```
#[derive(Resource)]
pub struct PermissionResolver {
    authority: Box<dyn PermissionAuthority>,
}

impl PermissionResolver {
    pub fn new(authority: impl PermissionAuthority) -> Self {
        Self {
            authority: Box::new(authority),
        }
    }

    pub fn from_boxed(authority: Box<dyn PermissionAuthority>) -> Self {
        Self { authority }
    }

    /// Whether `subject` may use `node`.
    pub fn has_permission(&self, subject: &CommandSource, node: &str) -> bool {
        self.has_permission_or(subject, node, false)
    }

    /// Like [`has_permission`](Self::has_permission) with an explicit
    /// fallback for the authority.
    pub fn has_permission_or(&self, subject: &CommandSource, node: &str, default: bool) -> bool {
        if self.check(subject, node, default) {
            return true;
        }

        self.authority
            .has_permission(subject, &node.to_lowercase(), default)
    }

    /// Command-level check returning the authority's cooldown.
    pub fn has_command_permission(
        &self,
        subject: &CommandSource,
        command: &Command,
        default: bool,
    ) -> CommandPermission {
        if command.name().eq_ignore_ascii_case(UMBRELLA_COMMAND) {
            return CommandPermission::granted();
        }

        if self.check(subject, &command.permission_node(), default) {
            return CommandPermission {
                granted: true,
                cooldown: Some(0),
            };
        }

        self.authority
            .has_command_permission(subject, command, default)
    }

    /// The local layer: grants only through the wildcard.
    ///
    /// A negated entry stops nothing here; it only means this layer does not
    /// grant, and the caller asks the authority about the plain node next.
    fn check(&self, subject: &CommandSource, node: &str, default: bool) -> bool {
        let node = node.to_lowercase();

        if self.authority.has_permission(subject, WILDCARD, default) {
            return true;
        }

        let negated = format!("{NEGATION_PREFIX}{node}");
        if self.authority.has_permission(subject, &negated, default) {
            debug!(
                "'{}' holds '{}'; deferring to the authority for '{}'",
                subject.display_name(),
                negated,
                node
            );
            return false;
        }

        false
    }

    pub fn groups(&self, subject: &CommandSource, include_parents: bool) -> Vec<PermissionGroup> {
        self.authority.groups(subject, include_parents)
    }

    pub fn permissions(&self, subject: &CommandSource) -> Vec<PermissionEntry> {
        self.authority.permissions(subject)
    }

    pub fn group(&self, group_id: &str) -> Option<PermissionGroup> {
        self.authority.group(group_id)
    }

    pub fn add_player_to_group(&mut self, group_id: &str, subject: &CommandSource) -> AuthorityResult {
        self.authority.add_player_to_group(group_id, subject)
    }

    pub fn remove_player_from_group(
        &mut self,
        group_id: &str,
        subject: &CommandSource,
    ) -> AuthorityResult {
        self.authority.remove_player_from_group(group_id, subject)
    }

    pub fn add_group(&mut self, group: PermissionGroup) -> AuthorityResult {
        self.authority.add_group(group)
    }

    pub fn save_group(&mut self, group: PermissionGroup) -> AuthorityResult {
        self.authority.save_group(group)
    }

    pub fn delete_group(&mut self, group_id: &str) -> AuthorityResult {
        self.authority.delete_group(group_id)
    }

    pub fn reload(&mut self) {
        self.authority.reload();
    }

    /// Read-only access to the wrapped authority.
    pub fn authority(&self) -> &dyn PermissionAuthority {
        self.authority.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CommandResult;
    use crate::testing::TableAuthority;

    fn alice() -> CommandSource {
        CommandSource::player(1, "Alice")
    }

    #[test]
    fn test_wildcard_grants_everything() {
        let resolver = PermissionResolver::new(TableAuthority::new().grant("1", "*"));

        assert!(resolver.has_permission(&alice(), "essentials.tp"));
        assert!(resolver.has_permission(&alice(), "anything.at.all"));
    }

    #[test]
    fn test_wildcard_beats_negation() {
        let resolver = PermissionResolver::new(
            TableAuthority::new().grant("1", "*").grant("1", "!tp"),
        );

        assert!(resolver.has_permission(&alice(), "tp"));
    }

    #[test]
    fn test_negation_does_not_force_denial() {
        // The authority itself answers "yes" for the plain node despite the
        // negated entry. The resolver must pass that answer through.
        let authority = TableAuthority::new().grant("1", "!tp").grant("1", "tp");
        let resolver = PermissionResolver::new(authority);
        assert!(resolver.has_permission(&alice(), "tp"));

        // And passes a "no" through unchanged as well.
        let resolver = PermissionResolver::new(TableAuthority::new().grant("1", "!tp"));
        assert!(!resolver.has_permission(&alice(), "tp"));
    }

    #[test]
    fn test_node_is_lowercased_before_delegating() {
        let authority = TableAuthority::new().grant("1", "essentials.item");
        let resolver = PermissionResolver::new(authority);

        assert!(resolver.has_permission(&alice(), "Essentials.ITEM"));
        assert!(!resolver.has_permission(&CommandSource::player(2, "Eve"), "essentials.item"));
    }

    #[test]
    fn test_default_is_forwarded() {
        let resolver = PermissionResolver::new(TableAuthority::new());
        assert!(!resolver.has_permission_or(&alice(), "x", false));
        // The fallback reaches the wildcard probe too, so it grants.
        assert!(resolver.has_permission_or(&alice(), "x", true));
    }

    #[test]
    fn test_umbrella_command_always_permitted() {
        let resolver = PermissionResolver::new(TableAuthority::new());
        let umbrella = Command::new("Essentials");

        assert_eq!(
            resolver.has_command_permission(&alice(), &umbrella, false),
            CommandPermission::granted()
        );
    }

    #[test]
    fn test_command_permission_wildcard_and_fallback() {
        let cmd = Command::new("tp").arity(1, |_, _, _| CommandResult::Success);

        let resolver = PermissionResolver::new(TableAuthority::new().grant("1", "*"));
        assert_eq!(
            resolver.has_command_permission(&alice(), &cmd, false),
            CommandPermission { granted: true, cooldown: Some(0) }
        );

        let resolver =
            PermissionResolver::new(TableAuthority::new().command_cooldown("1", "tp", 30));
        assert_eq!(
            resolver.has_command_permission(&alice(), &cmd, false),
            CommandPermission { granted: false, cooldown: Some(30) }
        );
    }

    #[test]
    fn test_group_operations_pass_through() {
        let mut resolver = PermissionResolver::new(TableAuthority::new());

        assert_eq!(resolver.add_group(PermissionGroup::new("vip")), AuthorityResult::Success);
        assert_eq!(resolver.group("vip").map(|g| g.id), Some("vip".to_string()));
        assert_eq!(
            resolver.add_player_to_group("vip", &alice()),
            AuthorityResult::Success
        );
        assert_eq!(resolver.groups(&alice(), false).len(), 1);
        assert_eq!(resolver.delete_group("vip"), AuthorityResult::Success);
        assert_eq!(resolver.delete_group("vip"), AuthorityResult::GroupNotFound);

        resolver.reload();
    }
}
