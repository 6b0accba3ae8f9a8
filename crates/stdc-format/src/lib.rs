//! Safetensors header rewriting and atomic re-encoding of tensor payloads.
//!
//! The container is an 8-byte little-endian header length, a JSON header
//! describing every tensor, and the concatenated payloads. Converting a file
//! changes payload sizes, so every tensor's `data_offsets` are reassigned from
//! a running cursor and the header is re-serialized.
//!
//! # Example
//!
//! ```no_run
//! use std::path::{Path, PathBuf};
//! use stdc_dtype::ConversionTarget;
//! use stdc_format::{ConvertOptions, OutputMode, convert_file};
//!
//! let options = ConvertOptions {
//!     target: ConversionTarget::BF16,
//!     output: OutputMode::File(PathBuf::from("model-bf16.safetensors")),
//! };
//! let report = convert_file(Path::new("model.safetensors"), &options).unwrap();
//! println!("{} tensors converted", report.converted_tensors);
//! ```

pub mod error;
pub mod header;
pub mod pipeline;
pub mod report;
pub mod rewrite;
pub mod staging;

pub use error::{FormatError, Result, TensorError, TensorFailure};
pub use header::{HeaderDocument, METADATA_KEY, TensorRecord};
pub use pipeline::{
    ConvertOptions, DEFAULT_OUTPUT, OutputMode, StagedFile, convert_bytes, convert_file,
    stage_conversion,
};
pub use report::{ConversionReport, DtypeTally};
pub use rewrite::{ConvertedTensor, commit_tensor, prepare_tensor, rewrite_tensor};
pub use staging::StagingBuffer;
