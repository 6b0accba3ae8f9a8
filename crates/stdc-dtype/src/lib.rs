//! Element encodings and numeric down-conversion for safetensors payloads.
//!
//! This crate holds everything that works on raw tensor bytes without knowing
//! about the container around them:
//!
//! - [`DType`]: the registry of header dtype names, widths and families.
//! - [`endian`]: little-endian ⇄ host byte-order adaptation.
//! - [`encode`]: binary16 / bfloat16 bit encoders and decoders.
//! - [`convert()`]: widen to a 64-bit intermediate, then narrow to a
//!   [`ConversionTarget`].
//! - [`ConversionStats`]: per-dtype tallies of engine traffic.
//!
//! # Example
//!
//! ```
//! use stdc_dtype::{ConversionTarget, DType, convert};
//!
//! let input: Vec<u8> = [1.0f64, -2.0].iter().flat_map(|v| v.to_ne_bytes()).collect();
//! let out = convert(&input, 2, DType::F64, ConversionTarget::F16).unwrap();
//! assert_eq!(out.dtype, DType::F16);
//! assert_eq!(out.data.len(), 4);
//! ```

pub mod convert;
pub mod dtype;
pub mod encode;
pub mod endian;
pub mod error;
pub mod stats;

pub use convert::{ConversionTarget, Converted, Intermediate, convert};
pub use dtype::DType;
pub use error::{ConvertError, Result};
pub use stats::ConversionStats;
