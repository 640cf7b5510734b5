//! Codec adapters, pipeline construction, and concurrent dispatch.
//!
//! # Architecture
//!
//! - [`CodecAdapter`]: the seam every compressor implements.
//! - [`CodecRegistry`]: known codecs and their defaults; builds a [`CodecPipeline`] per run.
//! - [`external`]: built-in adapters driving the usual optimizer binaries.
//! - [`CompressionOrchestrator`]: fans out one task per file and gathers the [`Report`](crate::core::Report).

mod codec;
pub mod external;
mod orchestrator;
mod registry;

pub use codec::{CodecAdapter, CodecPipeline, PipelineError};
pub use external::ExternalCodec;
pub use orchestrator::CompressionOrchestrator;
pub use registry::{CodecFactory, CodecRegistry};
