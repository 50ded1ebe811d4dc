//! Test doubles shared by the unit tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use bevy::prelude::*;

use crate::core::{
    ActorId, AuthorityResult, Command, CommandPermission, CommandSource, PermissionAuthority,
    PermissionEntry, PermissionGroup,
};
use crate::host::{GameHost, ItemInfo, Place, PlayerInfo};

/// Authority answering from flat per-subject grant tables.
#[derive(Default)]
pub struct TableAuthority {
    grants: HashMap<String, HashSet<String>>,
    cooldowns: HashMap<(String, String), u32>,
    groups: BTreeMap<String, PermissionGroup>,
    pub reloads: usize,
}

impl TableAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, subject: &str, node: &str) -> Self {
        self.grants
            .entry(subject.to_string())
            .or_default()
            .insert(node.to_string());
        self
    }

    pub fn command_cooldown(mut self, subject: &str, command: &str, seconds: u32) -> Self {
        self.cooldowns
            .insert((subject.to_string(), command.to_string()), seconds);
        self
    }
}

impl PermissionAuthority for TableAuthority {
    fn has_permission(&self, subject: &CommandSource, node: &str, default: bool) -> bool {
        self.grants
            .get(&subject.subject_id())
            .is_some_and(|nodes| nodes.contains(node))
            || default
    }

    fn has_command_permission(
        &self,
        subject: &CommandSource,
        command: &Command,
        default: bool,
    ) -> CommandPermission {
        let key = (subject.subject_id(), command.name().to_lowercase());
        if let Some(&seconds) = self.cooldowns.get(&key) {
            return CommandPermission {
                granted: false,
                cooldown: Some(seconds),
            };
        }

        CommandPermission {
            granted: self.has_permission(subject, &command.permission_node(), default),
            cooldown: None,
        }
    }

    fn groups(&self, subject: &CommandSource, _include_parents: bool) -> Vec<PermissionGroup> {
        let id = subject.subject_id();
        self.groups
            .values()
            .filter(|g| g.members.contains(&id))
            .cloned()
            .collect()
    }

    fn permissions(&self, subject: &CommandSource) -> Vec<PermissionEntry> {
        self.grants
            .get(&subject.subject_id())
            .map(|nodes| nodes.iter().map(|n| PermissionEntry::new(n.as_str())).collect())
            .unwrap_or_default()
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
        AuthorityResult::Success
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
        let before = group.members.len();
        group.members.retain(|m| *m != id);
        if group.members.len() == before {
            AuthorityResult::PlayerNotFound
        } else {
            AuthorityResult::Success
        }
    }

    fn add_group(&mut self, group: PermissionGroup) -> AuthorityResult {
        if self.groups.contains_key(&group.id) {
            return AuthorityResult::DuplicateEntry;
        }
        self.groups.insert(group.id.clone(), group);
        AuthorityResult::Success
    }

    fn save_group(&mut self, group: PermissionGroup) -> AuthorityResult {
        self.groups.insert(group.id.clone(), group);
        AuthorityResult::Success
    }

    fn delete_group(&mut self, group_id: &str) -> AuthorityResult {
        match self.groups.remove(group_id) {
            Some(_) => AuthorityResult::Success,
            None => AuthorityResult::GroupNotFound,
        }
    }

    fn reload(&mut self) {
        self.reloads += 1;
    }
}

/// Everything the fake host has observed.
#[derive(Debug, Default)]
pub struct FakeWorld {
    pub players: Vec<PlayerInfo>,
    pub places: Vec<Place>,
    pub items: Vec<ItemInfo>,
    pub max_players: u32,
    pub teleports: Vec<(ActorId, Vec3)>,
    pub given: Vec<(ActorId, u16, u16)>,
    pub full_inventories: HashSet<ActorId>,
    pub items_cleared: usize,
    pub passengers_ejected: usize,
    pub vehicles_destroyed: usize,
    pub kicked_with: Option<String>,
    pub shut_down: bool,
}

/// Host double that records every call. Clones share state, so a test can
/// keep one and insert another into the world.
#[derive(Clone, Default)]
pub struct FakeHost {
    state: Arc<Mutex<FakeWorld>>,
}

impl FakeHost {
    pub fn new() -> Self {
        let host = Self::default();
        host.state().max_players = 24;
        host
    }

    pub fn state(&self) -> MutexGuard<'_, FakeWorld> {
        self.state.lock().unwrap()
    }

    pub fn with_player(self, id: u64, name: &str, position: Vec3) -> Self {
        self.state().players.push(PlayerInfo {
            id: ActorId(id),
            name: name.to_string(),
            position,
        });
        self
    }

    pub fn with_place(self, name: &str, position: Vec3) -> Self {
        self.state().places.push(Place {
            name: name.to_string(),
            position,
        });
        self
    }

    pub fn with_item(self, id: u16, name: &str) -> Self {
        self.state().items.push(ItemInfo {
            id,
            name: name.to_string(),
        });
        self
    }
}

impl GameHost for FakeHost {
    fn find_player(&self, query: &str) -> Option<PlayerInfo> {
        let query = query.to_lowercase();
        self.state()
            .players
            .iter()
            .find(|p| p.name.to_lowercase().starts_with(&query) || p.id.to_string() == query)
            .cloned()
    }

    fn player(&self, id: ActorId) -> Option<PlayerInfo> {
        self.state().players.iter().find(|p| p.id == id).cloned()
    }

    fn online_players(&self) -> Vec<PlayerInfo> {
        self.state().players.clone()
    }

    fn max_players(&self) -> u32 {
        self.state().max_players
    }

    fn find_place(&self, query: &str) -> Option<Place> {
        let query = query.to_lowercase();
        self.state()
            .places
            .iter()
            .find(|p| p.name.to_lowercase().contains(&query))
            .cloned()
    }

    fn teleport(&mut self, id: ActorId, position: Vec3) {
        let mut state = self.state();
        state.teleports.push((id, position));
        if let Some(player) = state.players.iter_mut().find(|p| p.id == id) {
            player.position = position;
        }
    }

    fn find_item(&self, query: &str) -> Option<ItemInfo> {
        let state = self.state();
        let by_id = query
            .parse::<u16>()
            .ok()
            .and_then(|id| state.items.iter().find(|i| i.id == id));
        by_id
            .or_else(|| {
                state
                    .items
                    .iter()
                    .find(|i| i.name.eq_ignore_ascii_case(query))
            })
            .cloned()
    }

    fn give_item(&mut self, id: ActorId, item: u16, amount: u16) -> bool {
        let mut state = self.state();
        state.given.push((id, item, amount));
        !state.full_inventories.contains(&id)
    }

    fn clear_items(&mut self) {
        self.state().items_cleared += 1;
    }

    fn eject_vehicle_passengers(&mut self) {
        self.state().passengers_ejected += 1;
    }

    fn destroy_vehicles(&mut self) {
        self.state().vehicles_destroyed += 1;
    }

    fn kick_all(&mut self, reason: &str) {
        self.state().kicked_with = Some(reason.to_string());
    }

    fn shutdown(&mut self) {
        self.state().shut_down = true;
    }
}
