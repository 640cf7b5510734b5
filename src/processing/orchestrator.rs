//! Concurrent per-file compression.
//!
//! Every candidate file gets its own tokio task. Each task stats, reads,
//! compresses on the blocking pool, writes back in place when the bytes
//! changed, and updates the cache. A failing file is logged and dropped from the report; it never
//! affects its siblings.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tokio::fs;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::core::{CompressionResult, FileTask, IncrementalCache, Report};
use crate::processing::CodecPipeline;
use crate::utils::{OptimizerError, OptimizerResult};

enum FileOutcome {
    Compressed(CompressionResult),
    Skipped,
    /// Pipeline output matched the input; nothing was written
    Unchanged,
}

/// Runs one pipeline over a batch of files against a shared cache.
#[derive(Clone)]
pub struct CompressionOrchestrator {
    pipeline: Arc<CodecPipeline>,
    cache: Arc<IncrementalCache>,
    semaphore: Option<Arc<Semaphore>>,
    output_dir: PathBuf,
}

impl CompressionOrchestrator {
    pub fn new(pipeline: CodecPipeline, cache: Arc<IncrementalCache>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            cache,
            semaphore: None,
            output_dir: PathBuf::new(),
        }
    }

    /// Bound the number of files in flight. `None` launches every file at once.
    pub fn max_concurrency(mut self, limit: Option<usize>) -> Self {
        self.semaphore = limit.map(|n| Arc::new(Semaphore::new(n.max(1))));
        self
    }

    /// Directory the report's paths are rendered relative to.
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Process `files` concurrently and wait for all of them to settle.
    ///
    /// An empty pipeline counts every file as skipped: nothing is read,
    /// written, or cached.
    pub async fn run(&self, files: Vec<PathBuf>) -> Report {
        let mut report = Report::new(&self.output_dir);

        if self.pipeline.is_empty() {
            debug!("No codecs enabled, leaving {} file(s) untouched", files.len());
            for _ in &files {
                report.record_skipped();
            }
            return report;
        }

        info!("Optimizing up to {} file(s) with {:?}", files.len(), self.pipeline);

        let mut tasks = JoinSet::new();
        for path in files {
            let pipeline = Arc::clone(&self.pipeline);
            let cache = Arc::clone(&self.cache);
            let semaphore = self.semaphore.clone();

            tasks.spawn(async move {
                let _permit = match semaphore {
                    Some(semaphore) => Some(
                        semaphore
                            .acquire_owned()
                            .await
                            .map_err(|e| OptimizerError::task(format!("{}: {e}", path.display())))?,
                    ),
                    None => None,
                };
                process_file(path, pipeline, cache).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(FileOutcome::Compressed(result))) => report.insert(result),
                Ok(Ok(FileOutcome::Skipped | FileOutcome::Unchanged)) => report.record_skipped(),
                Ok(Err(e)) => {
                    warn!("Image optimization failed: {}", e);
                    report.record_failed();
                }
                Err(e) => {
                    warn!("Image optimization task aborted: {}", e);
                    report.record_failed();
                }
            }
        }

        debug!(
            "Run finished: {} compressed, {} skipped, {} failed",
            report.len(),
            report.skipped(),
            report.failed()
        );
        report
    }
}

async fn process_file(
    path: PathBuf,
    pipeline: Arc<CodecPipeline>,
    cache: Arc<IncrementalCache>,
) -> OptimizerResult<FileOutcome> {
    let Some(task) = FileTask::prepare(path, &cache).await? else {
        return Ok(FileOutcome::Skipped);
    };

    let original = fs::read(task.path())
        .await
        .map_err(|e| OptimizerError::io(task.path(), e))?;
    let old_size = original.len() as u64;
    if old_size != task.size_at_start {
        debug!("{} changed size since stat", task.path().display());
    }

    let compressed = compress_blocking(task.path(), pipeline, original.clone()).await?;
    let new_size = compressed.len() as u64;

    if compressed == original {
        // no rewrite keeps the mtime, so the cache entry still covers it
        cache.mark_processed(task.path(), SystemTime::now());
        debug!("{}: no codec changed the file", task.path().display());
        return Ok(FileOutcome::Unchanged);
    }

    fs::write(task.path(), &compressed)
        .await
        .map_err(|e| OptimizerError::io(task.path(), e))?;
    cache.mark_processed(task.path(), SystemTime::now());

    debug!("{}: {} -> {} bytes", task.path().display(), old_size, new_size);
    Ok(FileOutcome::Compressed(CompressionResult::new(
        task.path,
        old_size,
        new_size,
    )))
}

/// Run the whole pipeline on tokio's blocking pool; codecs may be slow or
/// spawn processes.
async fn compress_blocking(
    path: &Path,
    pipeline: Arc<CodecPipeline>,
    bytes: Vec<u8>,
) -> OptimizerResult<Vec<u8>> {
    tokio::task::spawn_blocking(move || pipeline.apply(bytes))
        .await
        .map_err(|e| OptimizerError::task(format!("{}: codec panicked: {e}", path.display())))?
        .map_err(|e| OptimizerError::codec(e.codec, path, e.source))
}
