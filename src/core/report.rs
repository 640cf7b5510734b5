//! Per-run compression report and its text rendering.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::info;

const KB: f64 = 1024.0;
const HEADER: &str = "✨ [asset-optimizer] - compressed image resources:";

/// Outcome of recompressing one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionResult {
    pub path: PathBuf,
    pub old_size: u64,
    pub new_size: u64,
    /// `new_size / old_size - 1`; zero for empty inputs
    pub ratio: f64,
}

impl CompressionResult {
    pub fn new(path: PathBuf, old_size: u64, new_size: u64) -> Self {
        let ratio = if old_size == 0 {
            0.0
        } else {
            new_size as f64 / old_size as f64 - 1.0
        };
        Self {
            path,
            old_size,
            new_size,
            ratio,
        }
    }

    /// `floor(100 * ratio)`, computed on the byte counts so binary float error
    /// cannot knock an exact +20% down to +19%.
    pub fn percent(&self) -> i64 {
        if self.old_size == 0 {
            return 0;
        }
        let delta = self.new_size as i128 - self.old_size as i128;
        (delta * 100).div_euclid(self.old_size as i128) as i64
    }

    /// Signed percentage as shown in the summary, e.g. `-20%` or `+5%`.
    pub fn percent_label(&self) -> String {
        let pct = self.percent();
        if pct > 0 {
            format!("+{pct}%")
        } else {
            format!("{pct}%")
        }
    }
}

/// Results of one run, in the order files finished.
#[derive(Debug, Clone, Default)]
pub struct Report {
    out_dir: PathBuf,
    entries: IndexMap<PathBuf, CompressionResult>,
    skipped: usize,
    failed: usize,
}

impl Report {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            ..Self::default()
        }
    }

    pub fn insert(&mut self, result: CompressionResult) {
        self.entries.insert(result.path.clone(), result);
    }

    pub fn record_skipped(&mut self) {
        self.skipped += 1;
    }

    pub fn record_failed(&mut self) {
        self.failed += 1;
    }

    pub fn get(&self, path: &Path) -> Option<&CompressionResult> {
        self.entries.get(path)
    }

    pub fn entries(&self) -> impl Iterator<Item = &CompressionResult> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn total_old_size(&self) -> u64 {
        self.entries().map(|r| r.old_size).sum()
    }

    pub fn total_new_size(&self) -> u64 {
        self.entries().map(|r| r.new_size).sum()
    }

    /// `dist/assets/logo.png` style name: the output dir's last component plus
    /// the path relative to it.
    fn display_name(&self, path: &Path) -> String {
        match path.strip_prefix(&self.out_dir) {
            Ok(rel) => {
                let base = self
                    .out_dir
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let rel = rel.to_string_lossy().replace('\\', "/");
                if base.is_empty() { rel } else { format!("{base}/{rel}") }
            }
            Err(_) => path.display().to_string(),
        }
    }
}

fn format_kb(bytes: u64) -> String {
    format!("{:.2}kb", bytes as f64 / KB)
}

/// Render an aligned, human-readable summary of `report`.
pub fn render(report: &Report) -> String {
    let rows: Vec<(String, String, &CompressionResult)> = report
        .entries()
        .map(|r| (report.display_name(&r.path), r.percent_label(), r))
        .collect();

    let name_width = rows.iter().map(|(name, _, _)| name.chars().count()).max().unwrap_or(0);
    let pct_width = rows.iter().map(|(_, pct, _)| pct.len()).max().unwrap_or(0);

    let mut out = String::new();
    out.push_str(HEADER);
    out.push('\n');

    for (name, pct, result) in &rows {
        let pad = name_width - name.chars().count();
        out.push_str(&format!(
            "{name}{}  {pct:<pct_width$}  {} / tiny: {}\n",
            " ".repeat(pad),
            format_kb(result.old_size),
            format_kb(result.new_size),
        ));
    }

    out.push_str(&format!(
        "{} file(s) compressed, {} -> {}, {} skipped, {} failed",
        report.len(),
        format_kb(report.total_old_size()),
        format_kb(report.total_new_size()),
        report.skipped(),
        report.failed(),
    ));
    out
}

/// Destination for the rendered summary.
pub trait ReportSink: Send + Sync {
    fn emit(&self, rendered: &str);
}

/// Logs each summary line at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn emit(&self, rendered: &str) {
        for line in rendered.lines() {
            info!("{line}");
        }
    }
}
