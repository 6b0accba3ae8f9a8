//! Error types for header handling and file rewriting.
//!
//! [`TensorError`] is local to one tensor: the run records it and moves on.
//! [`FormatError`] ends the run.

use std::io;
use std::path::PathBuf;

use serde::Serialize;
use stdc_dtype::ConvertError;
use thiserror::Error;

/// A single tensor could not be rewritten.
#[derive(Debug, Error)]
pub enum TensorError {
    #[error("tensor `{name}`: malformed record: {reason}")]
    MalformedRecord { name: String, reason: String },

    #[error("tensor `{name}`: unsupported dtype {dtype:?}")]
    UnsupportedDtype { name: String, dtype: String },

    #[error("tensor `{name}`: failed to read payload: {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("tensor `{name}`: conversion failed: {source}")]
    Conversion {
        name: String,
        #[source]
        source: ConvertError,
    },
}

impl TensorError {
    pub(crate) fn malformed(name: &str, reason: impl Into<String>) -> Self {
        TensorError::MalformedRecord { name: name.to_string(), reason: reason.into() }
    }

    /// Name of the tensor that failed.
    pub fn tensor_name(&self) -> &str {
        match self {
            TensorError::MalformedRecord { name, .. }
            | TensorError::UnsupportedDtype { name, .. }
            | TensorError::Io { name, .. }
            | TensorError::Conversion { name, .. } => name,
        }
    }
}

/// One entry of the failure listing carried by an incomplete run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TensorFailure {
    pub name: String,
    pub reason: String,
}

impl From<&TensorError> for TensorFailure {
    fn from(err: &TensorError) -> Self {
        TensorFailure { name: err.tensor_name().to_string(), reason: err.to_string() }
    }
}

/// Errors that abort a whole conversion run.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("failed to read header length: {0}")]
    HeaderLength(#[source] io::Error),

    #[error("short header: read {read} of {expected} bytes")]
    ShortHeader { read: u64, expected: u64 },

    #[error("malformed header: {0}")]
    MalformedHeader(#[from] serde_json::Error),

    #[error("malformed header: top level is not a JSON object")]
    HeaderNotObject,

    #[error("incomplete conversion: {loaded} of {total} tensors converted")]
    IncompleteConversion { loaded: usize, total: usize, failures: Vec<TensorFailure> },

    #[error(
        "input and output paths are identical ({}); use replace mode for in-place conversion",
        .0.display()
    )]
    SamePath(PathBuf),

    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, FormatError>;
