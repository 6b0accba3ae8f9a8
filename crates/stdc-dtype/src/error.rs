//! Conversion engine error types.

use thiserror::Error;

use crate::DType;

/// Errors produced while widening or narrowing a tensor payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConvertError {
    #[error("unsupported dtype for conversion: {0}")]
    UnsupportedDtype(DType),

    #[error("unknown dtype name: {0:?}")]
    UnknownName(String),

    #[error("unsupported conversion target: {0:?}")]
    UnknownTarget(String),

    #[error("payload length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("failed to allocate {bytes} bytes for conversion buffer")]
    AllocationFailure { bytes: usize },
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, ConvertError>;
