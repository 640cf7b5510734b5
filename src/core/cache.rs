//! Modification-time cache shared by every run in a process.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use lazy_static::lazy_static;
use tracing::debug;

lazy_static! {
    static ref GLOBAL_CACHE: Arc<IncrementalCache> = Arc::new(IncrementalCache::new());
}

/// Maps each processed path to the wall-clock time it was last rewritten.
///
/// Entries are never evicted. Each path is written only by the task that owns
/// it during a run, so last-write-wins is sufficient.
#[derive(Debug, Default)]
pub struct IncrementalCache {
    entries: RwLock<HashMap<PathBuf, SystemTime>>,
}

impl IncrementalCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide instance used when no cache is injected.
    pub fn global() -> Arc<Self> {
        Arc::clone(&*GLOBAL_CACHE)
    }

    /// A file is stale unless its mtime is at or before the recorded timestamp.
    pub fn should_process(&self, path: &Path, mtime: SystemTime) -> bool {
        match self.last_processed(path) {
            Some(recorded) => mtime > recorded,
            None => true,
        }
    }

    /// Record that `path` was rewritten at `timestamp`. Never moves an entry back.
    pub fn mark_processed(&self, path: &Path, timestamp: SystemTime) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let entry = entries.entry(path.to_path_buf()).or_insert(timestamp);
        if timestamp > *entry {
            *entry = timestamp;
        }
        debug!("Cache updated for {}", path.display());
    }

    pub fn last_processed(&self, path: &Path) -> Option<SystemTime> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(path)
            .copied()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
