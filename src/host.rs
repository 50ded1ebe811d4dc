//! Bridge to the game world.
//!
//! The command core never touches world state directly. Built-in commands
//! reach players, places and items through [`GameHost`], which the host
//! application implements and inserts as the [`Host`] resource.

use bevy::prelude::*;

use crate::core::{Actor, ActorId};

/// A connected player as seen by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerInfo {
    pub id: ActorId,
    pub name: String,
    pub position: Vec3,
}

impl PlayerInfo {
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.id,
            name: self.name.as_str().into(),
        }
    }
}

/// A named location on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub name: String,
    pub position: Vec3,
}

/// An item definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemInfo {
    pub id: u16,
    pub name: String,
}

/// Operations the host exposes to commands.
pub trait GameHost: Send + Sync + 'static {
    /// Find an online player by (possibly partial) name or id.
    fn find_player(&self, query: &str) -> Option<PlayerInfo>;

    fn player(&self, id: ActorId) -> Option<PlayerInfo>;

    fn online_players(&self) -> Vec<PlayerInfo>;

    fn max_players(&self) -> u32;

    /// Find a named place; matching is up to the host.
    fn find_place(&self, query: &str) -> Option<Place>;

    fn teleport(&mut self, id: ActorId, position: Vec3);

    /// Find an item by id or name.
    fn find_item(&self, query: &str) -> Option<ItemInfo>;

    /// Returns `false` when the inventory could not hold everything.
    fn give_item(&mut self, id: ActorId, item: u16, amount: u16) -> bool;

    /// Remove every dropped item from the world.
    fn clear_items(&mut self);

    /// Move every vehicle passenger out of their seat.
    fn eject_vehicle_passengers(&mut self);

    fn destroy_vehicles(&mut self);

    fn kick_all(&mut self, reason: &str);

    fn shutdown(&mut self);
}

/// Resource holding the host bridge.
#[derive(Resource)]
pub struct Host(pub Box<dyn GameHost>);

impl Host {
    pub fn new(host: impl GameHost) -> Self {
        Self(Box::new(host))
    }
}

impl std::ops::Deref for Host {
    type Target = dyn GameHost;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl std::ops::DerefMut for Host {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.0.as_mut()
    }
}
