//! Age-based removal of stale inputs.
//!
//! # Responsibilities
//! - Remember inputs kept after a failed conversion
//! - Periodically scan the storage directory and delete inputs whose
//!   modification time is older than the configured age
//!
//! # Design Decisions
//! - The directory scan is authoritative; inputs left by an earlier process
//!   are reaped like any other
//! - Only `{millis}-…` names that are not `.pdf` count as inputs
//! - Files already gone are forgotten silently
//! - Stops on the shutdown broadcast

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use dashmap::DashSet;
use tokio::fs::DirEntry;
use tokio::sync::broadcast;

use crate::config::ReaperConfig;
use crate::observability::metrics;
use crate::storage::names::is_stored_input;

/// Inputs kept on disk after a failed conversion in this process.
#[derive(Debug, Default)]
pub struct RetainedInputs {
    inner: DashSet<PathBuf>,
}

impl RetainedInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self, path: PathBuf) {
        self.inner.insert(path);
    }

    pub fn forget(&self, path: &Path) {
        self.inner.remove(path);
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.inner.contains(path)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Background task deleting expired inputs from the storage directory.
pub struct Reaper {
    root: PathBuf,
    retained: Arc<RetainedInputs>,
    config: ReaperConfig,
}

impl Reaper {
    pub fn new(root: impl Into<PathBuf>, retained: Arc<RetainedInputs>, config: ReaperConfig) -> Self {
        Self {
            root: root.into(),
            retained,
            config,
        }
    }

    /// Sweep on every interval until shutdown. The first sweep runs immediately.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.config.interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!(
            directory = %self.root.display(),
            interval_secs = self.config.interval_secs,
            max_age_secs = self.config.max_age_secs,
            "Input reaper started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.reap_expired_at(SystemTime::now()).await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Input reaper stopping");
                    break;
                }
            }
        }
    }

    /// Delete inputs last modified more than the max age before `now`.
    /// Returns the number removed.
    pub async fn reap_expired_at(&self, now: SystemTime) -> usize {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(directory = %self.root.display(), error = %e, "Failed to scan storage");
                return 0;
            }
        };

        let max_age = self.config.max_age();
        let mut removed = 0;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(directory = %self.root.display(), error = %e, "Storage scan interrupted");
                    break;
                }
            };

            let name = entry.file_name();
            if !name.to_str().is_some_and(is_stored_input) {
                continue;
            }

            let path = entry.path();
            match is_expired(&entry, max_age, now).await {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    self.retained.forget(&path);
                    continue;
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to read input age");
                    continue;
                }
            }

            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    removed += 1;
                    self.retained.forget(&path);
                    tracing::debug!(path = %path.display(), "Reaped input");
                }
                Err(e) if e.kind() == ErrorKind::NotFound => self.retained.forget(&path),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to reap input");
                }
            }
        }

        if removed > 0 {
            metrics::record_reaped(removed);
            tracing::info!(removed, "Stale inputs reaped");
        }
        removed
    }
}

async fn is_expired(entry: &DirEntry, max_age: Duration, now: SystemTime) -> std::io::Result<bool> {
    let metadata = entry.metadata().await?;
    if !metadata.is_file() {
        return Ok(false);
    }
    let age = now.duration_since(metadata.modified()?).unwrap_or_default();
    Ok(age >= max_age)
}
