//! Terminal backend for dedicated servers.
//!
//! Lines read from stdin run as console-source commands. Output addressed to
//! the console is printed to stdout; player-addressed output is left to the
//! host's own delivery.

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use bevy::prelude::*;

use crate::core::{CommandInputEvent, CommandOutputEvent, ConsoleOutputLevel, OutputTarget};

/// Plugin that adds stdin/stdout console support.
pub struct TerminalPlugin;

impl Plugin for TerminalPlugin {
    fn build(&self, app: &mut App) {
        let (sender, receiver) = mpsc::channel();
        if let Err(e) = spawn_stdin_reader(sender) {
            error!("Failed to start stdin reader: {}", e);
        }

        app.insert_resource(StdinReceiver(Mutex::new(receiver)))
            .init_resource::<TerminalConfig>()
            .add_systems(Update, (read_stdin, write_stdout));
    }
}

/// Configuration for terminal behavior.
#[derive(Resource)]
pub struct TerminalConfig {
    /// Colour output by level with ANSI escape codes.
    pub colored: bool,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self { colored: false }
    }
}

#[derive(Resource)]
struct StdinReceiver(Mutex<Receiver<String>>);

fn spawn_stdin_reader(sender: Sender<String>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("essentials-stdin".into())
        .spawn(move || {
            let stdin = io::stdin();

            for line in stdin.lock().lines().map_while(Result::ok) {
                let text = line.trim();
                if !text.is_empty() && sender.send(text.to_string()).is_err() {
                    break;
                }
            }
        })
}

fn read_stdin(receiver: Res<StdinReceiver>, mut events: MessageWriter<CommandInputEvent>) {
    let rx = receiver.0.lock().unwrap_or_else(PoisonError::into_inner);
    while let Ok(line) = rx.try_recv() {
        events.write(CommandInputEvent::console(line));
    }
}

fn write_stdout(mut events: MessageReader<CommandOutputEvent>, config: Res<TerminalConfig>) {
    let mut stdout = io::stdout().lock();

    for event in events.read().filter(|e| e.target == OutputTarget::Console) {
        let _ = if config.colored {
            writeln!(stdout, "{}{}\x1b[0m", color(event.level), event.message)
        } else {
            writeln!(stdout, "{}", event.message)
        };
    }
    let _ = stdout.flush();
}

fn color(level: ConsoleOutputLevel) -> &'static str {
    match level {
        ConsoleOutputLevel::Info => "\x1b[0m",
        ConsoleOutputLevel::Warn => "\x1b[33m",
        ConsoleOutputLevel::Error => "\x1b[31m",
        ConsoleOutputLevel::Usage => "\x1b[36m",
    }
}
