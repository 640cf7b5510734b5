//! Per-file unit of work.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::core::IncrementalCache;
use crate::utils::{OptimizerResult, stat_file};

/// One eligible file in one run.
///
/// Captures the file's mtime and length when the task starts; owned by the
/// task processing it until its result is merged into the report.
#[derive(Debug, Clone)]
pub struct FileTask {
    /// Absolute path, read from and written back to in place
    pub path: PathBuf,
    /// Modification time observed at task start
    pub mtime: SystemTime,
    /// Length on disk at task start
    pub size_at_start: u64,
}

impl FileTask {
    /// Stat `path` and build a task for it, or `None` when the cache says the
    /// file has not changed since it was last processed.
    pub async fn prepare(path: PathBuf, cache: &IncrementalCache) -> OptimizerResult<Option<Self>> {
        let (mtime, size_at_start) = stat_file(&path).await?;
        if !cache.should_process(&path, mtime) {
            return Ok(None);
        }
        Ok(Some(Self {
            path,
            mtime,
            size_at_start,
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
