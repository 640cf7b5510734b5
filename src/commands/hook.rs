//! Post-build hook driving one optimization run.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::core::{BuildConfig, IncrementalCache, PluginOptions, Report, ReportSink, RunConfig, TracingSink, render};
use crate::processing::{CodecRegistry, CompressionOrchestrator};
use crate::utils::walk;

/// What a hook invocation produced.
pub struct PluginRun {
    /// Per-file results of this run
    pub report: Report,
    /// Detached summary rendering, present when verbose
    pub render_task: Option<JoinHandle<()>>,
}

impl PluginRun {
    fn empty(report: Report) -> Self {
        Self {
            report,
            render_task: None,
        }
    }

    /// Wait for the summary to be emitted, if one was scheduled.
    pub async fn finish_rendering(&mut self) {
        if let Some(task) = self.render_task.take() {
            if let Err(e) = task.await {
                debug!("Summary rendering failed: {}", e);
            }
        }
    }
}

/// The asset optimizer as a build plugin.
///
/// Holds the options for every build plus the collaborators that outlive a
/// single run: the codec registry, the mtime cache, and the report sink.
pub struct OptimizerPlugin {
    options: PluginOptions,
    registry: CodecRegistry,
    cache: Arc<IncrementalCache>,
    sink: Arc<dyn ReportSink>,
}

impl OptimizerPlugin {
    /// Built-in codecs, the process-wide cache, and a tracing sink.
    pub fn new(options: PluginOptions) -> Self {
        Self {
            options,
            registry: CodecRegistry::with_builtins(),
            cache: IncrementalCache::global(),
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_registry(mut self, registry: CodecRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_cache(mut self, cache: Arc<IncrementalCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn cache(&self) -> &Arc<IncrementalCache> {
        &self.cache
    }

    /// Fired once after the build has written all of its output.
    ///
    /// Never fails: an unreadable output directory means nothing to do, and
    /// per-file errors are logged and left out of the report. The summary is
    /// rendered on a detached task after every file has settled.
    pub async fn close_bundle(&self, build: &BuildConfig) -> PluginRun {
        let config = RunConfig::resolve(build, &self.options);
        // walked paths are absolute; keep the report root comparable to them
        let output_dir = std::path::absolute(config.output_dir())
            .unwrap_or_else(|_| config.output_dir().to_path_buf());

        if self.options.disable {
            debug!("Optimizer disabled, skipping {}", output_dir.display());
            return PluginRun::empty(Report::new(output_dir));
        }

        let walk_root = output_dir.clone();
        let files = match tokio::task::spawn_blocking(move || walk(walk_root)).await {
            Ok(Ok(files)) => files,
            Ok(Err(e)) => {
                debug!("Nothing to optimize: {}", e);
                return PluginRun::empty(Report::new(output_dir));
            }
            Err(e) => {
                debug!("Directory walk aborted: {}", e);
                return PluginRun::empty(Report::new(output_dir));
            }
        };

        let candidates = config.filter.filter(files);
        debug!("{} candidate file(s) under {}", candidates.len(), output_dir.display());

        let pipeline = self.registry.build_pipeline(&config.codecs);
        let report = CompressionOrchestrator::new(pipeline, Arc::clone(&self.cache))
            .max_concurrency(config.max_concurrency)
            .output_dir(&output_dir)
            .run(candidates)
            .await;

        let render_task = config.verbose.then(|| {
            let snapshot = report.clone();
            let sink = Arc::clone(&self.sink);
            tokio::spawn(async move {
                sink.emit(&render(&snapshot));
            })
        });

        info!(
            "Image optimization done: {} compressed, {} skipped, {} failed",
            report.len(),
            report.skipped(),
            report.failed()
        );

        PluginRun { report, render_task }
    }
}
