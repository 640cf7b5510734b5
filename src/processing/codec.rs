//! Codec adapter seam and the ordered pipeline built from it.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::utils::CodecError;

/// Recompresses one buffer for one image format or tool.
///
/// Every adapter in a pipeline sees every file, so an adapter handed a format
/// it does not handle must return the input unchanged.
pub trait CodecAdapter: Send + Sync {
    /// Configuration key this adapter was registered under
    fn name(&self) -> &str;

    /// Transform `input`, consuming it. Runs on a blocking thread.
    fn compress(&self, input: Vec<u8>) -> Result<Vec<u8>, CodecError>;
}

/// Failure inside a pipeline, tagged with the adapter that raised it.
#[derive(Debug)]
pub struct PipelineError {
    pub codec: String,
    pub source: CodecError,
}

/// Enabled adapters for one run, applied in order.
#[derive(Clone, Default)]
pub struct CodecPipeline {
    adapters: Vec<Arc<dyn CodecAdapter>>,
}

impl CodecPipeline {
    pub fn new(adapters: Vec<Arc<dyn CodecAdapter>>) -> Self {
        Self { adapters }
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    /// Feed `bytes` through every adapter, each consuming the previous output.
    ///
    /// Stops at the first failure. The caller gets either the fully
    /// transformed buffer or an error, never a partially transformed one.
    pub fn apply(&self, bytes: Vec<u8>) -> Result<Vec<u8>, PipelineError> {
        self.adapters.iter().try_fold(bytes, |buf, adapter| {
            let before = buf.len();
            let out = adapter.compress(buf).map_err(|source| PipelineError {
                codec: adapter.name().to_string(),
                source,
            })?;
            debug!("{}: {} -> {} bytes", adapter.name(), before, out.len());
            Ok(out)
        })
    }
}

impl fmt::Debug for CodecPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
