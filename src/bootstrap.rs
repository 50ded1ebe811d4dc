//! Startup sequence.
//!
//! Config, built-in commands, text commands, the disable list and the update
//! check are brought up in that order. Any failure, including a panic, is
//! logged and leaves the host running with [`BootstrapStatus::Degraded`].

use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use bevy::prelude::*;
use thiserror::Error;

use crate::commands::{
    apply_disabled_commands, register_builtin_commands, register_text_commands, TEXT_OWNER,
};
use crate::config::{ConfigError, ConfigPath, EssentialsConfig};
use crate::core::{panic_message, CommandRegistry, PermissionResolver, RegistryError, TaskScheduler};
use crate::lang::MessageCatalog;
use crate::updater::{spawn_update_check, UpdateSource, UpdateStatus};
use crate::VERSION;

/// How far startup got.
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq)]
pub enum BootstrapStatus {
    #[default]
    Pending,
    Ready,
    /// Startup failed; the reason is kept for diagnostics.
    Degraded(String),
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("startup panicked: {0}")]
    Panicked(String),
}

/// Exclusive startup system.
pub fn bootstrap(world: &mut World) {
    let started = Instant::now();
    info!("Enabling essentials {}", VERSION);

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| enable(world)))
        .unwrap_or_else(|payload| Err(BootstrapError::Panicked(panic_message(&*payload))));

    let status = match outcome {
        Ok(()) => {
            info!("Enabled ({} ms)", started.elapsed().as_millis());
            BootstrapStatus::Ready
        }
        Err(e) => {
            error!("Failed to enable essentials: {}", e);
            BootstrapStatus::Degraded(e.to_string())
        }
    };

    world.insert_resource(status);
}

fn enable(world: &mut World) -> Result<(), BootstrapError> {
    let config = load_config(world)?;
    apply_locale(world, &config);

    {
        let mut registry = world.get_resource_or_insert_with(CommandRegistry::default);
        register_builtin_commands(&mut registry)?;

        if config.enable_text_commands {
            register_text_commands(&mut registry, &config.text_commands);
        }
        apply_disabled_commands(&mut registry, &config.disabled_commands);

        info!("Loaded {} commands", registry.len());
    }

    let check_updates = config.updater.check_updates;
    world.insert_resource(config);

    if check_updates {
        start_update_check(world);
    }

    Ok(())
}

fn load_config(world: &World) -> Result<EssentialsConfig, ConfigError> {
    let path = world.get_resource::<ConfigPath>().cloned().unwrap_or_default();
    EssentialsConfig::load_or_default(&path.0)
}

#[cfg(feature = "persist")]
fn apply_locale(world: &mut World, config: &EssentialsConfig) {
    let mut catalog = world.get_resource_or_insert_with(MessageCatalog::default);
    let Some(file) = &config.locale_file else {
        return;
    };

    match catalog.load_overrides(file) {
        Ok(count) => info!("Loaded {} message overrides from '{}'", count, file),
        Err(e) => warn!("Keeping default messages: {}", e),
    }
}

#[cfg(not(feature = "persist"))]
fn apply_locale(world: &mut World, config: &EssentialsConfig) {
    world.get_resource_or_insert_with(MessageCatalog::default);
    if let Some(file) = &config.locale_file {
        debug!("Built without `persist`; ignoring locale file '{}'", file);
    }
}

fn start_update_check(world: &mut World) {
    let checker = world
        .get_resource_mut::<UpdateSource>()
        .and_then(|mut source| source.0.take());
    let Some(checker) = checker else {
        debug!("No update source configured");
        return;
    };

    let scheduler = world
        .get_resource_or_insert_with(TaskScheduler::default)
        .clone();

    match spawn_update_check(checker, VERSION, scheduler) {
        Ok(_) => world.insert_resource(UpdateStatus::Checking),
        Err(e) => {
            warn!("Could not start update check: {}", e);
            world.insert_resource(UpdateStatus::Failed(e.to_string()));
        }
    }
}

/// Re-read config, message overrides, permissions and text commands.
///
/// Built-in commands stay as they are until the next restart; the disable
/// list is applied again to the reloaded text commands. Returns how many text
/// commands are registered afterwards.
pub fn reload(world: &mut World) -> Result<usize, BootstrapError> {
    let config = load_config(world)?;
    apply_locale(world, &config);

    if let Some(mut resolver) = world.get_resource_mut::<PermissionResolver>() {
        resolver.reload();
    }

    let registered = {
        let mut registry = world.get_resource_or_insert_with(CommandRegistry::default);
        registry.unregister_all(TEXT_OWNER);

        if !config.enable_text_commands {
            0
        } else {
            let registered = register_text_commands(&mut registry, &config.text_commands);

            let disabled: Vec<String> = config
                .disabled_commands
                .iter()
                .filter(|name| {
                    registry
                        .resolve(name)
                        .is_some_and(|cmd| cmd.get_owner() == TEXT_OWNER)
                })
                .cloned()
                .collect();
            registered - apply_disabled_commands(&mut registry, &disabled)
        }
    };

    world.insert_resource(config);
    info!("Reloaded configuration");
    Ok(registered)
}
