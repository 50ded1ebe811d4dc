//! Default in-memory permission authority.
//!
//! Groups hold nodes and members and may inherit from a parent group. Every
//! subject implicitly belongs to the default group. Node matching is exact
//! and case-insensitive: this authority has no wildcard or negation logic of
//! its own, which is what [`PermissionResolver`](super::PermissionResolver)
//! layers on top.

use std::collections::{BTreeMap, HashSet};
#[cfg(feature = "persist")]
use std::path::PathBuf;

use bevy::prelude::*;

use super::{
    AuthorityResult, Command, CommandPermission, CommandSource, PermissionAuthority,
    PermissionEntry, PermissionGroup,
};

/// Id of the group every subject belongs to.
pub const DEFAULT_GROUP: &str = "default";

/// Group-based authority.
pub struct GroupAuthority {
    groups: BTreeMap<String, PermissionGroup>,
    /// Whether the console passes every check.
    console_unrestricted: bool,
    #[cfg(feature = "persist")]
    path: Option<PathBuf>,
}

impl Default for GroupAuthority {
    fn default() -> Self {
        let mut groups = BTreeMap::new();
        groups.insert(DEFAULT_GROUP.to_string(), PermissionGroup::new(DEFAULT_GROUP));

        Self {
            groups,
            console_unrestricted: true,
            #[cfg(feature = "persist")]
            path: None,
        }
    }
}

impl GroupAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a group.
    pub fn with_group(mut self, group: PermissionGroup) -> Self {
        self.groups.insert(group.id.clone(), group);
        self
    }

    /// Subject the console to group checks like any player.
    pub fn restrict_console(mut self) -> Self {
        self.console_unrestricted = false;
        self
    }

    /// Groups of `subject_id`, each followed by its ancestors when asked.
    fn groups_of(&self, subject_id: &str, include_parents: bool) -> Vec<&PermissionGroup> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();

        let direct = self
            .groups
            .values()
            .filter(|g| g.id == DEFAULT_GROUP || g.members.iter().any(|m| m == subject_id));

        for group in direct {
            let mut current = Some(group);
            while let Some(g) = current {
                // Parent cycles end here.
                if !seen.insert(g.id.as_str()) {
                    break;
                }
                out.push(g);
                if !include_parents {
                    break;
                }
                current = g.parent.as_deref().and_then(|p| self.groups.get(p));
            }
        }

        out
    }

    fn find_entry(&self, subject: &CommandSource, node: &str) -> Option<&PermissionEntry> {
        self.groups_of(&subject.subject_id(), true)
            .into_iter()
            .flat_map(|g| g.permissions.iter())
            .find(|entry| entry.node.eq_ignore_ascii_case(node))
    }
}

impl PermissionAuthority for GroupAuthority {
    fn has_permission(&self, subject: &CommandSource, node: &str, default: bool) -> bool {
        if subject.is_console() && self.console_unrestricted {
            return true;
        }

        self.find_entry(subject, node).is_some() || default
    }

    fn has_command_permission(
        &self,
        subject: &CommandSource,
        command: &Command,
        default: bool,
    ) -> CommandPermission {
        if subject.is_console() && self.console_unrestricted {
            return CommandPermission::granted();
        }

        let node = command.permission_node();
        match self.find_entry(subject, &node) {
            Some(entry) => CommandPermission {
                granted: true,
                cooldown: (entry.cooldown > 0).then_some(entry.cooldown),
            },
            None => CommandPermission {
                granted: default,
                cooldown: None,
            },
        }
    }

    fn groups(&self, subject: &CommandSource, include_parents: bool) -> Vec<PermissionGroup> {
        self.groups_of(&subject.subject_id(), include_parents)
            .into_iter()
            .cloned()
            .collect()
    }

    fn permissions(&self, subject: &CommandSource) -> Vec<PermissionEntry> {
        self.groups_of(&subject.subject_id(), true)
            .into_iter()
            .flat_map(|g| g.permissions.iter().cloned())
            .collect()
    }

    fn group(&self, group_id: &str) -> Option<PermissionGroup> {
        self.groups.get(group_id).cloned()
    }

    fn add_player_to_group(&mut self, group_id: &str, subject: &CommandSource) -> AuthorityResult {
        let Some(group) = self.groups.get_mut(group_id) else {
            return AuthorityResult::GroupNotFound;
        };

        let id = subject.subject_id();
        if group.members.contains(&id) {
            return AuthorityResult::DuplicateEntry;
        }
        group.members.push(id);
        self.persist()
    }

    fn remove_player_from_group(
        &mut self,
        group_id: &str,
        subject: &CommandSource,
    ) -> AuthorityResult {
        let Some(group) = self.groups.get_mut(group_id) else {
            return AuthorityResult::GroupNotFound;
        };

        let id = subject.subject_id();
        let Some(pos) = group.members.iter().position(|m| *m == id) else {
            return AuthorityResult::PlayerNotFound;
        };
        group.members.remove(pos);
        self.persist()
    }

    fn add_group(&mut self, group: PermissionGroup) -> AuthorityResult {
        if self.groups.contains_key(&group.id) {
            return AuthorityResult::DuplicateEntry;
        }
        self.groups.insert(group.id.clone(), group);
        self.persist()
    }

    fn save_group(&mut self, group: PermissionGroup) -> AuthorityResult {
        if !self.groups.contains_key(&group.id) {
            return AuthorityResult::GroupNotFound;
        }
        self.groups.insert(group.id.clone(), group);
        self.persist()
    }

    fn delete_group(&mut self, group_id: &str) -> AuthorityResult {
        if group_id == DEFAULT_GROUP {
            return AuthorityResult::UnspecifiedError;
        }
        if self.groups.remove(group_id).is_none() {
            return AuthorityResult::GroupNotFound;
        }
        self.persist()
    }

    fn reload(&mut self) {
        #[cfg(feature = "persist")]
        if let Some(path) = self.path.clone() {
            match crate::config::load_ron::<Vec<PermissionGroup>>(&path) {
                Ok(groups) => {
                    self.replace_groups(groups);
                    info!("Reloaded {} permission groups from '{}'", self.groups.len(), path.display());
                }
                Err(e) => error!("Failed to reload permissions: {}", e),
            }
        }
    }
}

impl GroupAuthority {
    fn replace_groups(&mut self, groups: Vec<PermissionGroup>) {
        self.groups = groups.into_iter().map(|g| (g.id.clone(), g)).collect();
        self.groups
            .entry(DEFAULT_GROUP.to_string())
            .or_insert_with(|| PermissionGroup::new(DEFAULT_GROUP));
    }

    /// Write groups back to the backing file, if there is one.
    fn persist(&self) -> AuthorityResult {
        #[cfg(feature = "persist")]
        if let Some(path) = &self.path {
            let groups: Vec<&PermissionGroup> = self.groups.values().collect();
            if let Err(e) = crate::config::save_ron(&groups, path) {
                error!("Failed to save permissions: {}", e);
                return AuthorityResult::UnspecifiedError;
            }
        }
        AuthorityResult::Success
    }
}

#[cfg(feature = "persist")]
impl GroupAuthority {
    /// Load groups from a RON file and keep it as the backing store.
    ///
    /// A missing file starts with just the default group and is created on
    /// the first mutation.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, crate::config::ConfigError> {
        let path = path.into();
        let mut authority = Self::default();

        if path.exists() {
            let groups = crate::config::load_ron::<Vec<PermissionGroup>>(&path)?;
            authority.replace_groups(groups);
        }

        authority.path = Some(path);
        Ok(authority)
    }
}
