//! Persistence: local snapshot file for the canvas document.
//!
//! DESIGN
//! ======
//! The document is loaded once at start (or created fresh when no snapshot
//! exists). Afterwards the owner stages full snapshots with `stage`, and a
//! background task writes the latest staged snapshot on a fixed interval.
//! Staging is cheap and never touches the filesystem.
//!
//! ERROR HANDLING
//! ==============
//! A snapshot stays dirty until it has actually been written. A failed
//! flush is logged and retried on the next tick. Writes go to a sibling
//! temp file that is renamed over the snapshot, so a crash mid-write leaves
//! the previous snapshot intact.

#[cfg(test)]
#[path = "persistence_test.rs"]
mod persistence_test;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::doc::{CanvasDoc, DocError};
use crate::error::ErrorCode;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("snapshot io error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("snapshot is not a canvas document: {0}")]
    Corrupt(#[from] DocError),
}

impl ErrorCode for PersistenceError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Io { .. } => "E_SNAPSHOT_IO",
            Self::Corrupt(_) => "E_SNAPSHOT_CORRUPT",
        }
    }
}

#[derive(Default)]
struct Staged {
    bytes: Option<Arc<Vec<u8>>>,
    /// Bumped on every `stage`.
    generation: u64,
    /// Generation last written to disk.
    flushed: u64,
}

/// Snapshot file plus the latest not-yet-written snapshot.
#[derive(Clone)]
pub struct SnapshotStore {
    path: PathBuf,
    staged: Arc<Mutex<Staged>>,
}

impl SnapshotStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), staged: Arc::default() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot, or start a fresh document if none exists yet.
    ///
    /// # Errors
    ///
    /// `Io` for read failures other than a missing file; `Corrupt` if the
    /// file is not a canvas document.
    pub async fn load_or_genesis(&self) -> Result<CanvasDoc, PersistenceError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                let doc = CanvasDoc::load(&bytes)?;
                info!(path = %self.path.display(), boxes = doc.len(), "loaded snapshot");
                Ok(doc)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no snapshot; starting fresh canvas");
                Ok(CanvasDoc::genesis()?)
            }
            Err(source) => Err(PersistenceError::Io { path: self.path.clone(), source }),
        }
    }

    /// Replace the pending snapshot. The flush task writes it later.
    pub fn stage(&self, bytes: Vec<u8>) {
        let mut staged = self.lock();
        staged.bytes = Some(Arc::new(bytes));
        staged.generation += 1;
    }

    /// True while a staged snapshot has not been written.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        let staged = self.lock();
        staged.generation != staged.flushed
    }

    /// Write the pending snapshot, if any. Returns whether a write happened.
    ///
    /// # Errors
    ///
    /// `Io` if the write fails; the snapshot stays dirty.
    pub async fn flush(&self) -> Result<bool, PersistenceError> {
        // PHASE: SNAPSHOT UNDER LOCK
        // WHY: never hold the lock across file I/O.
        let (bytes, generation) = {
            let staged = self.lock();
            match &staged.bytes {
                Some(bytes) if staged.generation != staged.flushed => (Arc::clone(bytes), staged.generation),
                _ => return Ok(false),
            }
        };

        write_atomic(&self.path, &bytes).await?;

        // EDGE: a newer stage during the write keeps the store dirty.
        let mut staged = self.lock();
        staged.flushed = staged.flushed.max(generation);
        drop(staged);
        info!(path = %self.path.display(), bytes = bytes.len(), generation, "snapshot flushed");
        Ok(true)
    }

    fn lock(&self) -> MutexGuard<'_, Staged> {
        self.staged.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Spawn the periodic flush task. Returns a handle for shutdown.
pub fn spawn_flush_task(store: SnapshotStore, interval: Duration) -> JoinHandle<()> {
    info!(flush_interval_ms = interval.as_millis(), path = %store.path.display(), "snapshot flush configured");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = store.flush().await {
                error!(code = e.error_code(), error = %e, "snapshot flush failed");
            }
        }
    })
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistenceError> {
    let io_err = |source| PersistenceError::Io { path: path.to_path_buf(), source };
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, bytes).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_err)
}
