//! Error types for the asset optimizer.
//!
//! Provides a hierarchy of error types using `thiserror`.
//! None of these abort a run: file-level failures are caught at the task boundary
//! and logged.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors raised by a codec adapter while recompressing one buffer.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The external optimizer binary could not be started
    #[error("failed to spawn `{tool}`: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    /// The optimizer ran but rejected the input
    #[error("`{tool}` exited with {status}: {stderr}")]
    Failed {
        tool: String,
        status: ExitStatus,
        stderr: String,
    },

    /// Piping data to or from the optimizer failed
    #[error("I/O error talking to `{tool}`: {source}")]
    Io {
        tool: String,
        #[source]
        source: io::Error,
    },

    /// The options value could not be turned into arguments
    #[error("invalid options for `{codec}`: {reason}")]
    InvalidOptions { codec: String, reason: String },

    /// Free-form failure from an in-process adapter
    #[error("{0}")]
    Other(String),
}

/// Main error type for the optimizer.
#[derive(Error, Debug)]
pub enum OptimizerError {
    /// File IO error
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A codec in the pipeline failed for this file
    #[error("Codec `{codec}` failed on {path}: {source}")]
    Codec {
        codec: String,
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    /// A per-file task panicked or was aborted
    #[error("Task error: {0}")]
    Task(String),
}

/// Convenience result type for optimizer operations.
pub type OptimizerResult<T> = Result<T, OptimizerError>;

impl OptimizerError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn codec(codec: impl Into<String>, path: impl Into<PathBuf>, source: CodecError) -> Self {
        Self::Codec {
            codec: codec.into(),
            path: path.into(),
            source,
        }
    }

    pub fn task<T: Into<String>>(msg: T) -> Self {
        Self::Task(msg.into())
    }
}

impl CodecError {
    pub fn other<T: Into<String>>(msg: T) -> Self {
        Self::Other(msg.into())
    }

    pub fn invalid_options(codec: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOptions {
            codec: codec.into(),
            reason: reason.into(),
        }
    }
}
