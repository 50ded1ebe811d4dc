//! Headless server example.
//!
//! Runs the command core against a tiny in-memory world with stdin/stdout as
//! the server console.
//!
//! Run with: `cargo run --example headless --features terminal`
//!
//! Commands:
//! - `essentials` - Show version and command count
//! - `online` - Count connected players
//! - `tp Steve spawn` - Teleport a player to a place
//! - `i Steve 363 5` - Give an item
//! - `clear v` - Clear vehicles (destroyed 200 ms later)
//! - `stop` - Shut down

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bevy::prelude::*;
use bevy_essentials::prelude::*;

fn main() {
    println!("=== Headless Essentials Example ===");
    println!("Type commands and press Enter. Type 'stop' to exit.");
    println!();

    use std::io::Write;
    let _ = std::io::stdout().flush();

    let stop = Arc::new(AtomicBool::new(false));

    App::new()
        .add_plugins(MinimalPlugins)
        .add_plugins(bevy::log::LogPlugin::default())
        .insert_resource(Host::new(SandboxServer::new(stop.clone())))
        .insert_resource(StopFlag(stop))
        .add_plugins(EssentialsPlugin::default())
        .add_systems(Update, exit_on_stop)
        .run();
}

#[derive(Resource)]
struct StopFlag(Arc<AtomicBool>);

fn exit_on_stop(flag: Res<StopFlag>, mut exit: MessageWriter<AppExit>) {
    if flag.0.load(Ordering::SeqCst) {
        exit.write(AppExit::Success);
    }
}

/// One player, one place, one item.
struct SandboxServer {
    players: Vec<PlayerInfo>,
    places: Vec<Place>,
    items: Vec<ItemInfo>,
    stop: Arc<AtomicBool>,
}

impl SandboxServer {
    fn new(stop: Arc<AtomicBool>) -> Self {
        Self {
            players: vec![PlayerInfo {
                id: ActorId(1),
                name: "Steve".into(),
                position: Vec3::ZERO,
            }],
            places: vec![Place {
                name: "Spawn".into(),
                position: Vec3::new(0.0, 64.0, 0.0),
            }],
            items: vec![ItemInfo {
                id: 363,
                name: "Maplestrike".into(),
            }],
            stop,
        }
    }
}

impl GameHost for SandboxServer {
    fn find_player(&self, query: &str) -> Option<PlayerInfo> {
        let query = query.to_lowercase();
        self.players
            .iter()
            .find(|p| p.name.to_lowercase().starts_with(&query))
            .cloned()
    }

    fn player(&self, id: ActorId) -> Option<PlayerInfo> {
        self.players.iter().find(|p| p.id == id).cloned()
    }

    fn online_players(&self) -> Vec<PlayerInfo> {
        self.players.clone()
    }

    fn max_players(&self) -> u32 {
        8
    }

    fn find_place(&self, query: &str) -> Option<Place> {
        let query = query.to_lowercase();
        self.places
            .iter()
            .find(|p| p.name.to_lowercase().contains(&query))
            .cloned()
    }

    fn teleport(&mut self, id: ActorId, position: Vec3) {
        if let Some(player) = self.players.iter_mut().find(|p| p.id == id) {
            player.position = position;
            println!("[world] {} is now at {}", player.name, position);
        }
    }

    fn find_item(&self, query: &str) -> Option<ItemInfo> {
        self.items
            .iter()
            .find(|i| i.id.to_string() == query || i.name.eq_ignore_ascii_case(query))
            .cloned()
    }

    fn give_item(&mut self, id: ActorId, item: u16, amount: u16) -> bool {
        println!("[world] gave {}x {} to {}", amount, item, id);
        true
    }

    fn clear_items(&mut self) {
        println!("[world] dropped items cleared");
    }

    fn eject_vehicle_passengers(&mut self) {
        println!("[world] passengers ejected");
    }

    fn destroy_vehicles(&mut self) {
        println!("[world] vehicles destroyed");
    }

    fn kick_all(&mut self, reason: &str) {
        println!("[world] everyone kicked: {}", reason);
        self.players.clear();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}
