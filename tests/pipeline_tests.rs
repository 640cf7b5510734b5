use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::time::{Duration, Instant, SystemTime};

use asset_optimizer_lib::{
    BuildConfig, CandidateFilter, CodecAdapter, CodecError, CodecRegistry, CodecSetting,
    CompressionOrchestrator, IncrementalCache, OptimizerPlugin, PluginOptions, ReportSink,
};
use tempfile::TempDir;

/// Appends a marker byte and counts its invocations.
struct Marker {
    name: &'static str,
    byte: u8,
    calls: Arc<AtomicUsize>,
}

impl CodecAdapter for Marker {
    fn name(&self) -> &str {
        self.name
    }

    fn compress(&self, mut input: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        input.push(self.byte);
        Ok(input)
    }
}

/// Rejects any buffer starting with `BAD`.
struct RejectBad;

impl CodecAdapter for RejectBad {
    fn name(&self) -> &str {
        "reject-bad"
    }

    fn compress(&self, input: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        if input.starts_with(b"BAD") {
            Err(CodecError::other("cannot decode"))
        } else {
            Ok(input)
        }
    }
}

/// Drops the first half of the buffer.
struct Shrink;

impl CodecAdapter for Shrink {
    fn name(&self) -> &str {
        "shrink"
    }

    fn compress(&self, input: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        Ok(input[input.len() / 2..].to_vec())
    }
}

/// Holds any buffer starting with `slow` until released, then appends `!`.
struct Gate {
    release: Arc<Mutex<mpsc::Receiver<()>>>,
}

impl CodecAdapter for Gate {
    fn name(&self) -> &str {
        "gate"
    }

    fn compress(&self, mut input: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        if input.starts_with(b"slow") {
            // a dropped sender also releases
            let _ = self.release.lock().unwrap().recv();
        }
        input.push(b'!');
        Ok(input)
    }
}

#[derive(Default)]
struct CollectingSink {
    emitted: Mutex<Vec<String>>,
}

impl ReportSink for CollectingSink {
    fn emit(&self, rendered: &str) {
        self.emitted.lock().unwrap().push(rendered.to_string());
    }
}

struct Fixture {
    _dir: TempDir,
    root: PathBuf,
}

impl Fixture {
    fn new(files: &[(&str, &str)]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        for (name, content) in files {
            let path = root.join("dist").join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content.as_bytes()).unwrap();
        }
        Self { _dir: dir, root }
    }

    fn build(&self) -> BuildConfig {
        BuildConfig::new(&self.root, "dist")
    }

    fn path(&self, name: &str) -> PathBuf {
        std::path::absolute(self.root.join("dist").join(name)).unwrap()
    }

    fn read(&self, name: &str) -> Vec<u8> {
        fs::read(self.path(name)).unwrap()
    }
}

fn marker_registry(calls: &Arc<AtomicUsize>) -> CodecRegistry {
    let mut registry = CodecRegistry::empty();
    let first = Arc::clone(calls);
    let second = Arc::clone(calls);
    registry
        .register("first", true, move |_| {
            Arc::new(Marker { name: "first", byte: b'1', calls: Arc::clone(&first) })
        })
        .register("second", true, move |_| {
            Arc::new(Marker { name: "second", byte: b'2', calls: Arc::clone(&second) })
        });
    registry
}

fn quiet() -> PluginOptions {
    PluginOptions {
        verbose: false,
        ..PluginOptions::default()
    }
}

fn touch_into_future(path: &Path) {
    fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(SystemTime::now() + Duration::from_secs(30))
        .unwrap();
}

#[tokio::test]
async fn codecs_compose_in_registration_order() {
    let fx = Fixture::new(&[("a.png", "img")]);
    let calls = Arc::new(AtomicUsize::new(0));
    let plugin = OptimizerPlugin::new(quiet())
        .with_registry(marker_registry(&calls))
        .with_cache(Arc::new(IncrementalCache::new()));

    let run = plugin.close_bundle(&fx.build()).await;

    assert_eq!(fx.read("a.png"), b"img12");
    let entry = run.report.get(&fx.path("a.png")).unwrap();
    assert_eq!((entry.old_size, entry.new_size), (3, 5));
}

#[tokio::test]
async fn unchanged_files_are_skipped_on_the_second_run() {
    let fx = Fixture::new(&[("a.png", "img"), ("nested/b.gif", "gif")]);
    let calls = Arc::new(AtomicUsize::new(0));
    let plugin = OptimizerPlugin::new(quiet())
        .with_registry(marker_registry(&calls))
        .with_cache(Arc::new(IncrementalCache::new()));

    let first = plugin.close_bundle(&fx.build()).await;
    assert_eq!(first.report.len(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 4);

    let second = plugin.close_bundle(&fx.build()).await;
    assert!(second.report.is_empty());
    assert_eq!(second.report.skipped(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(fx.read("a.png"), b"img12");
}

#[tokio::test]
async fn touched_files_are_reprocessed() {
    let fx = Fixture::new(&[("a.png", "img"), ("b.png", "other")]);
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = Arc::new(IncrementalCache::new());
    let plugin = OptimizerPlugin::new(quiet())
        .with_registry(marker_registry(&calls))
        .with_cache(Arc::clone(&cache));

    plugin.close_bundle(&fx.build()).await;
    touch_into_future(&fx.path("a.png"));

    let started = SystemTime::now();
    let run = plugin.close_bundle(&fx.build()).await;

    assert_eq!(run.report.len(), 1);
    assert!(run.report.get(&fx.path("a.png")).is_some());
    assert_eq!(fx.read("a.png"), b"img1212");
    assert!(cache.last_processed(&fx.path("a.png")).unwrap() >= started);
}

#[tokio::test]
async fn all_codecs_disabled_leaves_files_alone() {
    let fx = Fixture::new(&[("a.png", "img"), ("c.svg", "<svg/>")]);
    let registry = CodecRegistry::with_builtins();
    let mut options = quiet();
    for key in registry.keys() {
        options = options.codec(key, false);
    }
    let cache = Arc::new(IncrementalCache::new());
    let plugin = OptimizerPlugin::new(options)
        .with_registry(registry)
        .with_cache(Arc::clone(&cache));

    let run = plugin.close_bundle(&fx.build()).await;

    assert!(run.report.is_empty());
    assert_eq!(run.report.skipped(), 2);
    assert_eq!(fx.read("a.png"), b"img");
    assert_eq!(fx.read("c.svg"), b"<svg/>");
    assert!(cache.is_empty());
}

#[tokio::test]
async fn one_failing_file_does_not_stop_the_others() {
    let fx = Fixture::new(&[
        ("x.png", "BAD bytes"),
        ("y.png", "good y!!"),
        ("z.jpg", "good z!!"),
    ]);
    let mut registry = CodecRegistry::empty();
    registry
        .register("reject", true, |_| Arc::new(RejectBad))
        .register("shrink", true, |_| Arc::new(Shrink));
    let cache = Arc::new(IncrementalCache::new());
    let plugin = OptimizerPlugin::new(quiet())
        .with_registry(registry)
        .with_cache(Arc::clone(&cache));

    let run = plugin.close_bundle(&fx.build()).await;

    assert_eq!(run.report.len(), 2);
    assert_eq!(run.report.failed(), 1);
    assert!(run.report.get(&fx.path("x.png")).is_none());
    assert!(run.report.get(&fx.path("y.png")).is_some());
    assert!(run.report.get(&fx.path("z.jpg")).is_some());
    assert_eq!(fx.read("y.png"), b" y!!");
    assert_eq!(fx.read("x.png"), b"BAD bytes");
    assert!(cache.last_processed(&fx.path("x.png")).is_none());
}

#[tokio::test]
async fn late_failure_never_writes_a_partial_result() {
    let fx = Fixture::new(&[("x.png", "BAD but long enough")]);
    let mut registry = CodecRegistry::empty();
    // the marker runs first, so the buffer is already transformed when the rejection happens
    registry
        .register("prefix", true, |_| {
            Arc::new(Marker { name: "prefix", byte: b'!', calls: Arc::new(AtomicUsize::new(0)) })
        })
        .register("reject", true, |_| Arc::new(RejectBad));
    let plugin = OptimizerPlugin::new(quiet())
        .with_registry(registry)
        .with_cache(Arc::new(IncrementalCache::new()));

    let run = plugin.close_bundle(&fx.build()).await;

    assert!(run.report.is_empty());
    assert_eq!(fx.read("x.png"), b"BAD but long enough");
}

#[tokio::test]
async fn default_filter_only_touches_images() {
    let fx = Fixture::new(&[
        ("index.html", "<html>"),
        ("assets/app.js", "js"),
        ("assets/logo.PNG", "png"),
        ("assets/photo.jpeg", "jpg"),
    ]);
    let calls = Arc::new(AtomicUsize::new(0));
    let plugin = OptimizerPlugin::new(quiet())
        .with_registry(marker_registry(&calls))
        .with_cache(Arc::new(IncrementalCache::new()));

    let run = plugin.close_bundle(&fx.build()).await;

    assert_eq!(run.report.len(), 2);
    assert_eq!(fx.read("index.html"), b"<html>");
    assert_eq!(fx.read("assets/app.js"), b"js");
}

#[tokio::test]
async fn predicate_filter_selects_candidates() {
    let fx = Fixture::new(&[("keep.png", "a"), ("drop.png", "b")]);
    let calls = Arc::new(AtomicUsize::new(0));
    let options = PluginOptions {
        filter: CandidateFilter::predicate(|p| p.ends_with("keep.png")),
        ..quiet()
    };
    let plugin = OptimizerPlugin::new(options)
        .with_registry(marker_registry(&calls))
        .with_cache(Arc::new(IncrementalCache::new()));

    let run = plugin.close_bundle(&fx.build()).await;

    assert_eq!(run.report.len(), 1);
    assert_eq!(fx.read("drop.png"), b"b");
}

#[tokio::test]
async fn verbose_run_emits_a_summary() {
    let fx = Fixture::new(&[("a.png", "0123456789")]);
    let mut registry = CodecRegistry::empty();
    registry.register("shrink", true, |_| Arc::new(Shrink));
    let sink = Arc::new(CollectingSink::default());
    let plugin = OptimizerPlugin::new(PluginOptions::default())
        .with_registry(registry)
        .with_cache(Arc::new(IncrementalCache::new()))
        .with_sink(sink.clone());

    let mut run = plugin.close_bundle(&fx.build()).await;
    run.finish_rendering().await;

    let emitted = sink.emitted.lock().unwrap();
    assert_eq!(emitted.len(), 1);
    assert!(emitted[0].contains("dist/a.png"));
    assert!(emitted[0].contains("-50%"));
}

#[tokio::test]
async fn empty_build_renders_header_and_footer() {
    let fx = Fixture::new(&[("readme.txt", "no images here")]);
    let sink = Arc::new(CollectingSink::default());
    let plugin = OptimizerPlugin::new(PluginOptions::default())
        .with_cache(Arc::new(IncrementalCache::new()))
        .with_sink(sink.clone());

    let mut run = plugin.close_bundle(&fx.build()).await;
    run.finish_rendering().await;

    let emitted = sink.emitted.lock().unwrap();
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].lines().count(), 2);
}

#[tokio::test]
async fn codec_options_are_passed_through() {
    let fx = Fixture::new(&[("a.png", "img")]);
    let seen = Arc::new(Mutex::new(None));
    let captured = Arc::clone(&seen);
    let mut registry = CodecRegistry::empty();
    registry.register("tuned", false, move |opts| {
        *captured.lock().unwrap() = opts.cloned();
        Arc::new(Shrink)
    });
    let options = quiet().codec("tuned", serde_json::json!({ "level": 3 }));
    let plugin = OptimizerPlugin::new(options)
        .with_registry(registry)
        .with_cache(Arc::new(IncrementalCache::new()));

    let run = plugin.close_bundle(&fx.build()).await;

    assert_eq!(run.report.len(), 1);
    assert_eq!(*seen.lock().unwrap(), Some(serde_json::json!({ "level": 3 })));
    assert!(matches!(
        CodecSetting::from(serde_json::json!({ "level": 3 })),
        CodecSetting::Options(_)
    ));
}

#[tokio::test]
async fn orchestrator_shares_cache_between_instances() {
    let fx = Fixture::new(&[("a.gif", "gif")]);
    let cache = Arc::new(IncrementalCache::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let pipeline = marker_registry(&calls).build_pipeline(&Default::default());

    let files = vec![fx.path("a.gif")];
    let first = CompressionOrchestrator::new(pipeline.clone(), Arc::clone(&cache))
        .run(files.clone())
        .await;
    let second = CompressionOrchestrator::new(pipeline, Arc::clone(&cache))
        .run(files)
        .await;

    assert_eq!(first.len(), 1);
    assert!(second.is_empty());
    assert_eq!(second.skipped(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn a_stalled_codec_only_holds_up_its_own_file() {
    let fx = Fixture::new(&[
        ("slow.png", "slow"),
        ("a.png", "fast a"),
        ("b.png", "fast b"),
        ("c.png", "fast c"),
    ]);
    let (release, gate) = mpsc::channel();
    let gate = Arc::new(Mutex::new(gate));
    let mut registry = CodecRegistry::empty();
    registry.register("gate", true, move |_| Arc::new(Gate { release: Arc::clone(&gate) }));
    let plugin = OptimizerPlugin::new(quiet())
        .with_registry(registry)
        .with_cache(Arc::new(IncrementalCache::new()));
    let build = fx.build();

    let watcher = async move {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !["a.png", "b.png", "c.png"].iter().all(|name| fx.read(name).ends_with(b"!")) {
            assert!(Instant::now() < deadline, "siblings waited on the stalled file");
            tokio::task::spawn_blocking(|| std::thread::sleep(Duration::from_millis(10)))
                .await
                .unwrap();
        }
        assert_eq!(fx.read("slow.png"), b"slow");
        release.send(()).unwrap();
        fx
    };

    let (run, fx) = tokio::join!(plugin.close_bundle(&build), watcher);

    assert_eq!(run.report.len(), 4);
    assert_eq!(fx.read("slow.png"), b"slow!");
    let last = run.report.entries().last().unwrap();
    assert_eq!(last.path, fx.path("slow.png"));
}
