// Module declarations in dependency order
pub mod utils;
pub mod core;
pub mod processing;
pub mod commands;

// Public exports for external consumers
pub use crate::core::{
    BuildConfig, CandidateFilter, CodecSetting, CompressionResult, IncrementalCache, PluginOptions,
    Report, ReportSink, RunConfig, TracingSink, render,
};
pub use crate::processing::{CodecAdapter, CodecPipeline, CodecRegistry, CompressionOrchestrator};
pub use crate::utils::{CodecError, OptimizerError, OptimizerResult, walk};
pub use crate::commands::*;

// This library file is the public API; the CLI entry point is in main.rs.
