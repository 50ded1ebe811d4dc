//! Background update check.
//!
//! The check runs on its own thread so a slow release feed never stalls a
//! tick. Its only way back into the world is a scheduler task, which applies
//! the result to [`UpdateStatus`] on the next poll.

use std::cmp::Ordering;
use std::thread::{self, JoinHandle};

use bevy::prelude::*;
use thiserror::Error;

use crate::core::TaskScheduler;

/// A published release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
    pub version: String,
    /// Change notes, one entry per line.
    pub changes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpdateError {
    #[error("release feed unavailable: {0}")]
    Unavailable(String),
    #[error("malformed version '{0}'")]
    MalformedVersion(String),
}

/// Source of release information, implemented by the host.
pub trait UpdateChecker: Send + Sync + 'static {
    fn latest(&self) -> Result<ReleaseInfo, UpdateError>;
}

/// Result of the most recent update check.
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq)]
pub enum UpdateStatus {
    #[default]
    NotChecked,
    Checking,
    UpToDate,
    Available(ReleaseInfo),
    Failed(String),
}

/// The checker the bootstrap hands to the worker thread.
///
/// Taken (left empty) once the check starts.
#[derive(Resource, Default)]
pub struct UpdateSource(pub Option<Box<dyn UpdateChecker>>);

impl UpdateSource {
    pub fn new(checker: impl UpdateChecker) -> Self {
        Self(Some(Box::new(checker)))
    }
}

fn parse_version(version: &str) -> Result<Vec<u64>, UpdateError> {
    let trimmed = version.trim();
    let trimmed = trimmed.strip_prefix(['v', 'V']).unwrap_or(trimmed);

    trimmed
        .split('.')
        .map(|part| part.parse::<u64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| UpdateError::MalformedVersion(version.to_string()))
}

/// Compare dotted numeric versions; missing components count as zero.
pub fn compare_versions(a: &str, b: &str) -> Result<Ordering, UpdateError> {
    let a = parse_version(a)?;
    let b = parse_version(b)?;
    let len = a.len().max(b.len());

    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return Ok(other),
        }
    }

    Ok(Ordering::Equal)
}

/// Run the check against `current` without touching the world.
pub fn check_for_updates(checker: &dyn UpdateChecker, current: &str) -> UpdateStatus {
    let outcome = checker.latest().and_then(|release| {
        let newer = compare_versions(&release.version, current)? == Ordering::Greater;
        Ok(if newer {
            UpdateStatus::Available(release)
        } else {
            UpdateStatus::UpToDate
        })
    });

    outcome.unwrap_or_else(|e| UpdateStatus::Failed(e.to_string()))
}

fn log_status(status: &UpdateStatus) {
    match status {
        UpdateStatus::UpToDate => info!("Plugin is up-to-date!"),
        UpdateStatus::Available(release) => {
            info!("New version available: {}", release.version);
            for change in &release.changes {
                info!("  {}", change);
            }
        }
        UpdateStatus::Failed(reason) => {
            error!("Could not update, try again later. ({})", reason);
        }
        UpdateStatus::NotChecked | UpdateStatus::Checking => {}
    }
}

/// Check for updates on a worker thread and report back through `scheduler`.
pub fn spawn_update_check(
    checker: Box<dyn UpdateChecker>,
    current: impl Into<String>,
    scheduler: TaskScheduler,
) -> std::io::Result<JoinHandle<()>> {
    let current = current.into();

    thread::Builder::new()
        .name("essentials-updater".into())
        .spawn(move || {
            info!("Checking updates.");
            let mut status = Some(check_for_updates(checker.as_ref(), &current));

            scheduler
                .new_task(move |world| {
                    if let Some(status) = status.take() {
                        log_status(&status);
                        world.insert_resource(status);
                    }
                })
                .go();
        })
}
