//! Per-tensor rewriting.
//!
//! Rewriting is split in two so a failed tensor never leaves the header half
//! updated: [`prepare_tensor`] reads and converts a payload without touching
//! shared state, and [`commit_tensor`] assigns the new offsets and stages the
//! bytes. [`rewrite_tensor`] runs both back to back.

use std::io::{Read, Seek, SeekFrom};

use stdc_dtype::{ConversionTarget, DType, convert, endian};

use crate::error::TensorError;
use crate::header::{HeaderDocument, TensorRecord, decode_record};
use crate::staging::StagingBuffer;

/// A payload ready to be staged, in little-endian byte order.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedTensor {
    pub name: String,
    pub source_dtype: DType,
    pub dtype: DType,
    pub data: Vec<u8>,
    /// `true` when the conversion engine rewrote the payload.
    pub converted: bool,
}

/// Whether a tensor of `dtype` goes through the engine for `target`.
///
/// `F16`/`BF16` sources and sources already in the target encoding are
/// staged unchanged.
pub fn needs_conversion(dtype: DType, target: ConversionTarget) -> bool {
    (dtype.is_int_family() || matches!(dtype, DType::F64 | DType::F32)) && dtype != target.dtype()
}

/// Read and convert one tensor. `data_start` is the absolute file offset of
/// the data section (`8 + header length`).
pub fn prepare_tensor<R: Read + Seek>(
    source: &mut R,
    doc: &HeaderDocument,
    name: &str,
    data_start: u64,
    target: ConversionTarget,
) -> Result<ConvertedTensor, TensorError> {
    let value = doc.get(name).ok_or_else(|| TensorError::malformed(name, "no such entry"))?;
    let record = decode_record(name, value)?;
    prepare_record(source, &record, data_start, target)
}

/// [`prepare_tensor`] for an already decoded record.
pub fn prepare_record<R: Read + Seek>(
    source: &mut R,
    record: &TensorRecord,
    data_start: u64,
    target: ConversionTarget,
) -> Result<ConvertedTensor, TensorError> {
    let name = record.name.as_str();
    let dtype = record.dtype;
    if matches!(dtype, DType::BOOL | DType::Unknown) {
        return Err(TensorError::UnsupportedDtype {
            name: name.to_string(),
            dtype: record.dtype_name.clone(),
        });
    }

    let width = dtype.byte_width() as u64;
    let byte_len = record.byte_len();
    if byte_len % width != 0 {
        return Err(TensorError::malformed(
            name,
            format!("{byte_len} bytes is not a multiple of the {dtype} width {width}"),
        ));
    }
    let element_count = usize::try_from(byte_len / width)
        .map_err(|_| TensorError::malformed(name, format!("{byte_len} bytes does not fit in memory")))?;

    let mut data = read_payload(source, record, data_start)?;
    endian::le_to_host(&mut data, dtype.byte_width());

    let (mut data, out_dtype, converted) = if needs_conversion(dtype, target) {
        let out = convert(&data, element_count, dtype, target)
            .map_err(|source| TensorError::Conversion { name: name.to_string(), source })?;
        (out.data, out.dtype, true)
    } else {
        (data, dtype, false)
    };
    endian::host_to_le(&mut data, out_dtype.byte_width());

    tracing::debug!(
        tensor = name,
        from = %dtype,
        to = %out_dtype,
        bytes_in = byte_len,
        bytes_out = data.len(),
        "prepared tensor"
    );

    Ok(ConvertedTensor { name: name.to_string(), source_dtype: dtype, dtype: out_dtype, data, converted })
}

fn read_payload<R: Read + Seek>(
    source: &mut R,
    record: &TensorRecord,
    data_start: u64,
) -> Result<Vec<u8>, TensorError> {
    let io_err = |source| TensorError::Io { name: record.name.clone(), source };
    let (start, _) = record.data_offsets;
    let byte_len = record.byte_len();

    let offset = data_start.checked_add(start).ok_or_else(|| {
        TensorError::malformed(&record.name, "data_offsets overflow the file offset range")
    })?;
    source.seek(SeekFrom::Start(offset)).map_err(io_err)?;

    let mut data = Vec::new();
    let read = source.by_ref().take(byte_len).read_to_end(&mut data).map_err(io_err)? as u64;
    if read != byte_len {
        return Err(io_err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("payload truncated: read {read} of {byte_len} bytes"),
        )));
    }
    Ok(data)
}

/// Stage a prepared tensor: record its new offsets (and dtype, if it changed)
/// in `doc` and append the payload. Returns the new write cursor.
pub fn commit_tensor(
    doc: &mut HeaderDocument,
    staging: &mut StagingBuffer,
    tensor: ConvertedTensor,
) -> Result<u64, TensorError> {
    let start = staging.len();
    let end = start + tensor.data.len() as u64;
    doc.set_offsets(&tensor.name, start, end)?;
    if tensor.dtype != tensor.source_dtype {
        doc.set_dtype(&tensor.name, tensor.dtype)?;
    }
    let range = staging.append(tensor.data);
    tracing::trace!(tensor = %tensor.name, start = range.start, end = range.end, "committed tensor");
    Ok(range.end)
}

/// Prepare and immediately commit one tensor.
pub fn rewrite_tensor<R: Read + Seek>(
    source: &mut R,
    doc: &mut HeaderDocument,
    name: &str,
    data_start: u64,
    staging: &mut StagingBuffer,
    target: ConversionTarget,
) -> Result<u64, TensorError> {
    let tensor = prepare_tensor(source, doc, name, data_start, target)?;
    commit_tensor(doc, staging, tensor)
}
