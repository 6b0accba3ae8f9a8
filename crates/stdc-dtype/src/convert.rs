//! Conversion engine: widen a payload to a canonical 64-bit intermediate,
//! then narrow it to the run's target float encoding.
//!
//! Buffers handled here are in host byte order; callers adapt to and from the
//! little-endian file format with [`crate::endian`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::encode::{f32_to_bf16_bits, f32_to_f16_bits};
use crate::error::{ConvertError, Result};
use crate::DType;

/// Output float encoding chosen once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConversionTarget {
    #[default]
    #[serde(rename = "F32", alias = "f32")]
    F32,
    #[serde(rename = "F16", alias = "f16")]
    F16,
    #[serde(rename = "BF16", alias = "bf16")]
    BF16,
}

impl ConversionTarget {
    pub const fn dtype(self) -> DType {
        match self {
            ConversionTarget::F32 => DType::F32,
            ConversionTarget::F16 => DType::F16,
            ConversionTarget::BF16 => DType::BF16,
        }
    }
}

impl fmt::Display for ConversionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dtype().name())
    }
}

impl FromStr for ConversionTarget {
    type Err = ConvertError;

    /// Accepts `F32`, `F16` and `BF16` in any case.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "F32" => Ok(ConversionTarget::F32),
            "F16" => Ok(ConversionTarget::F16),
            "BF16" => Ok(ConversionTarget::BF16),
            _ => Err(ConvertError::UnknownTarget(s.to_string())),
        }
    }
}

/// Result of [`convert`]: the narrowed payload and the encoding it is in.
#[derive(Debug, Clone, PartialEq)]
pub struct Converted {
    pub data: Vec<u8>,
    pub dtype: DType,
}

/// Canonical 64-bit form every convertible source is widened to.
#[derive(Debug, Clone, PartialEq)]
pub enum Intermediate {
    Float(Vec<f64>),
    Int(Vec<i64>),
}

/// Convert `element_count` host-order elements of `source` into `target`.
///
/// `F16`/`BF16` sources are returned unchanged with their own dtype, whatever
/// the target. `BOOL` and unrecognised sources fail with
/// [`ConvertError::UnsupportedDtype`].
pub fn convert(
    buf: &[u8],
    element_count: usize,
    source: DType,
    target: ConversionTarget,
) -> Result<Converted> {
    if matches!(source, DType::BOOL | DType::Unknown) {
        return Err(ConvertError::UnsupportedDtype(source));
    }

    let expected = element_count
        .checked_mul(source.byte_width())
        .ok_or(ConvertError::AllocationFailure { bytes: usize::MAX })?;
    if buf.len() != expected {
        return Err(ConvertError::LengthMismatch { expected, actual: buf.len() });
    }

    if source.is_compact_float() {
        let mut data = alloc::<u8>(buf.len())?;
        data.extend_from_slice(buf);
        return Ok(Converted { data, dtype: source });
    }

    tracing::trace!(%source, %target, element_count, "widening payload");
    let wide = widen(buf, element_count, source)?;
    let data = narrow(&wide, target)?;
    Ok(Converted { data, dtype: target.dtype() })
}

/// Step one: widen to `f64` (float family) or `i64` (int family).
pub fn widen(buf: &[u8], element_count: usize, source: DType) -> Result<Intermediate> {
    let wide = match source {
        DType::F64 => Intermediate::Float(collect(element_count, elements::<8>(buf).map(f64::from_ne_bytes))?),
        DType::F32 => Intermediate::Float(collect(
            element_count,
            elements::<4>(buf).map(|b| f64::from(f32::from_ne_bytes(b))),
        )?),
        DType::I64 => Intermediate::Int(collect(element_count, elements::<8>(buf).map(i64::from_ne_bytes))?),
        DType::I32 => Intermediate::Int(collect(
            element_count,
            elements::<4>(buf).map(|b| i64::from(i32::from_ne_bytes(b))),
        )?),
        DType::I16 => Intermediate::Int(collect(
            element_count,
            elements::<2>(buf).map(|b| i64::from(i16::from_ne_bytes(b))),
        )?),
        DType::I8 => Intermediate::Int(collect(element_count, buf.iter().map(|&b| i64::from(b as i8)))?),
        DType::U8 => Intermediate::Int(collect(element_count, buf.iter().map(|&b| i64::from(b)))?),
        other => return Err(ConvertError::UnsupportedDtype(other)),
    };
    Ok(wide)
}

/// Step two: narrow the intermediate to `target`, returning host-order bytes.
pub fn narrow(wide: &Intermediate, target: ConversionTarget) -> Result<Vec<u8>> {
    match (wide, target) {
        (Intermediate::Float(xs), ConversionTarget::F32) => {
            pack(collect(xs.len(), xs.iter().map(|&v| saturate_f32(v)))?)
        }
        (Intermediate::Int(xs), ConversionTarget::F32) => {
            pack(collect(xs.len(), xs.iter().map(|&v| v as f32))?)
        }
        (Intermediate::Float(xs), ConversionTarget::F16) => {
            pack(collect(xs.len(), xs.iter().map(|&v| f32_to_f16_bits(v as f32)))?)
        }
        (Intermediate::Int(xs), ConversionTarget::F16) => {
            pack(collect(xs.len(), xs.iter().map(|&v| f32_to_f16_bits(v as f32)))?)
        }
        (Intermediate::Float(xs), ConversionTarget::BF16) => {
            pack(collect(xs.len(), xs.iter().map(|&v| f32_to_bf16_bits(v as f32)))?)
        }
        (Intermediate::Int(xs), ConversionTarget::BF16) => {
            pack(collect(xs.len(), xs.iter().map(|&v| f32_to_bf16_bits(v as f64 as f32)))?)
        }
    }
}

/// Clamp into `[-f32::MAX, f32::MAX]` before narrowing, so out-of-range
/// values (infinities included) land on the nearest finite bound. NaN stays NaN.
pub fn saturate_f32(value: f64) -> f32 {
    value.clamp(-f64::from(f32::MAX), f64::from(f32::MAX)) as f32
}

fn elements<const N: usize>(buf: &[u8]) -> impl Iterator<Item = [u8; N]> + '_ {
    buf.chunks_exact(N).map(|chunk| {
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(chunk);
        bytes
    })
}

fn alloc<T>(len: usize) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|_| ConvertError::AllocationFailure {
        bytes: len.saturating_mul(std::mem::size_of::<T>()),
    })?;
    Ok(v)
}

fn collect<T>(len: usize, iter: impl Iterator<Item = T>) -> Result<Vec<T>> {
    let mut v = alloc(len)?;
    v.extend(iter);
    Ok(v)
}

fn pack<T: bytemuck::Pod>(values: Vec<T>) -> Result<Vec<u8>> {
    let bytes: &[u8] = bytemuck::cast_slice(&values);
    let mut out = alloc::<u8>(bytes.len())?;
    out.extend_from_slice(bytes);
    Ok(out)
}
