//! Core types and state for the optimization pipeline.
//!
//! This module contains the fundamental types used throughout the crate:
//! - [`IncrementalCache`]: mtime cache deciding which files are stale
//! - [`CandidateFilter`]: pattern or predicate selecting candidate files
//! - [`FileTask`]: one file's unit of work
//! - [`Report`]: ordered per-file results and their rendering
//! - [`PluginOptions`] / [`RunConfig`]: user and resolved configuration

mod cache;
mod filter;
mod report;
mod task;
mod types;

pub use cache::IncrementalCache;
pub use filter::{CandidateFilter, DEFAULT_FILTER_PATTERN};
pub use report::{CompressionResult, Report, ReportSink, TracingSink, render};
pub use task::FileTask;
pub use types::{BuildConfig, CodecSetting, PluginOptions, RunConfig};
