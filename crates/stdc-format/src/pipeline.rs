//! Whole-file conversion.
//!
//! A run reads the length prefix and header, prepares every tensor in header
//! order, and only if all of them succeeded assigns offsets and stages the
//! payloads. The staged result is written to a sibling temporary file which
//! is synced and renamed over the destination, so an aborted or incomplete
//! run never leaves a partial file behind and replace mode never truncates
//! the input before the new contents are on disk. In replace mode the
//! destination is the resolved input path, so a symlinked input has its
//! target rewritten and keeps its permissions.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};

use stdc_dtype::{ConversionStats, ConversionTarget};

use crate::error::{FormatError, Result, TensorError, TensorFailure};
use crate::header::{HEADER_LEN_BYTES, HeaderDocument};
use crate::report::{ConversionReport, tallies};
use crate::rewrite::{ConvertedTensor, commit_tensor, prepare_tensor};
use crate::staging::StagingBuffer;

/// Default output path when none is given.
pub const DEFAULT_OUTPUT: &str = "output.safetensors";

/// Where the converted file goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    /// Write a new file at this path.
    File(PathBuf),
    /// Replace the input file.
    Replace,
}

impl Default for OutputMode {
    fn default() -> Self {
        OutputMode::File(PathBuf::from(DEFAULT_OUTPUT))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvertOptions {
    pub target: ConversionTarget,
    pub output: OutputMode,
}

/// A fully converted file held in memory, ready to be written.
#[derive(Debug)]
pub struct StagedFile {
    /// Serialized header (without the length prefix).
    pub header: Vec<u8>,
    pub data: StagingBuffer,
    pub stats: ConversionStats,
    pub total_tensors: usize,
    pub converted_tensors: usize,
}

impl StagedFile {
    /// Write `[len][header][data]` to `writer`, returning the byte count.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<u64> {
        writer.write_all(&(self.header.len() as u64).to_le_bytes())?;
        writer.write_all(&self.header)?;
        let data = self.data.write_to(writer)?;
        Ok(HEADER_LEN_BYTES + self.header.len() as u64 + data)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out =
            Vec::with_capacity(HEADER_LEN_BYTES as usize + self.header.len() + self.data.len() as usize);
        out.extend_from_slice(&(self.header.len() as u64).to_le_bytes());
        out.extend_from_slice(&self.header);
        self.data.copy_into(&mut out);
        out
    }
}

/// Convert a whole container read from `source`.
///
/// Every tensor is attempted even after a failure so the error lists all
/// problem tensors; any failure yields [`FormatError::IncompleteConversion`].
pub fn stage_conversion<R: Read + Seek>(
    source: &mut R,
    target: ConversionTarget,
) -> Result<StagedFile> {
    let (mut doc, header_len) = HeaderDocument::read_from(source)?;
    let data_start = HEADER_LEN_BYTES + header_len;
    let names: Vec<String> = doc.tensor_names().map(str::to_string).collect();
    let total = names.len();
    tracing::debug!(tensors = total, data_start, "header parsed");

    let mut prepared: Vec<ConvertedTensor> = Vec::with_capacity(total);
    let mut failures: Vec<TensorFailure> = Vec::new();
    let mut stats = ConversionStats::new();
    for name in &names {
        match prepare_tensor(source, &doc, name, data_start, target) {
            Ok(tensor) => {
                // Everything not already in the target encoding, pass-through included.
                if tensor.source_dtype != target.dtype() {
                    stats.record(tensor.source_dtype, tensor.dtype);
                }
                prepared.push(tensor);
            }
            Err(err) => {
                tracing::warn!("skipping tensor: {err}");
                failures.push(TensorFailure::from(&err));
            }
        }
    }
    incomplete_unless_done(prepared.len(), total, failures, &stats)?;

    let mut staging = StagingBuffer::new();
    let mut converted = 0;
    let mut failures = Vec::new();
    for tensor in prepared {
        let was_converted = tensor.converted;
        match commit_tensor(&mut doc, &mut staging, tensor) {
            Ok(_) if was_converted => converted += 1,
            Ok(_) => {}
            Err(err) => failures.push(commit_failure(&err)),
        }
    }
    incomplete_unless_done(total - failures.len(), total, failures, &stats)?;

    tracing::debug!(loaded = total, total, "all tensors converted");
    Ok(StagedFile {
        header: doc.to_bytes()?,
        data: staging,
        stats,
        total_tensors: total,
        converted_tensors: converted,
    })
}

fn commit_failure(err: &TensorError) -> TensorFailure {
    tracing::warn!("failed to commit tensor: {err}");
    TensorFailure::from(err)
}

fn incomplete_unless_done(
    loaded: usize,
    total: usize,
    failures: Vec<TensorFailure>,
    stats: &ConversionStats,
) -> Result<()> {
    if failures.is_empty() {
        return Ok(());
    }
    tracing::error!("incomplete load, ({loaded} / {total}) tensors loaded");
    for failure in &failures {
        tracing::error!(tensor = %failure.name, "{}", failure.reason);
    }
    stats.log_summary();
    Err(FormatError::IncompleteConversion { loaded, total, failures })
}

/// Convert an in-memory container and return the new file bytes.
pub fn convert_bytes(input: &[u8], target: ConversionTarget) -> Result<Vec<u8>> {
    let staged = stage_conversion(&mut io::Cursor::new(input), target)?;
    Ok(staged.to_bytes())
}

/// Convert the file at `input` according to `options`.
pub fn convert_file(input: &Path, options: &ConvertOptions) -> Result<ConversionReport> {
    let destination = match &options.output {
        OutputMode::File(path) => {
            if same_path(input, path) {
                return Err(FormatError::SamePath(path.clone()));
            }
            path.clone()
        }
        OutputMode::Replace => fs::canonicalize(input)
            .map_err(|source| FormatError::Open { path: input.to_path_buf(), source })?,
    };

    let staged = {
        let file = File::open(input)
            .map_err(|source| FormatError::Open { path: input.to_path_buf(), source })?;
        let mut reader = BufReader::new(file);
        stage_conversion(&mut reader, options.target)?
        // input handle closed here, before anything is written
    };

    let written = write_atomic(&destination, &staged)
        .map_err(|source| FormatError::Write { path: destination.clone(), source })?;
    tracing::info!(
        "{} of {} tensors converted, {} bytes written to {}",
        staged.converted_tensors,
        staged.total_tensors,
        written,
        destination.display()
    );
    staged.stats.log_summary();

    Ok(ConversionReport {
        input: input.to_path_buf(),
        output: destination,
        target: options.target,
        total_tensors: staged.total_tensors,
        converted_tensors: staged.converted_tensors,
        passthrough_tensors: staged.total_tensors - staged.converted_tensors,
        header_bytes: staged.header.len() as u64,
        data_bytes: staged.data.len(),
        stats: tallies(&staged.stats),
    })
}

/// Write `staged` next to `destination`, sync, then rename into place.
///
/// The temporary file is created exclusively; an existing file at that path
/// fails the write and is left alone. An existing destination's permissions
/// carry over to the new file.
pub fn write_atomic(destination: &Path, staged: &StagedFile) -> io::Result<u64> {
    let temp_path = temp_path_for(destination);
    let file = OpenOptions::new().write(true).create_new(true).open(&temp_path)?;
    let result = write_synced(file, staged).and_then(|written| {
        keep_permissions(destination, &temp_path)?;
        fs::rename(&temp_path, destination)?;
        Ok(written)
    });
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_synced(file: File, staged: &StagedFile) -> io::Result<u64> {
    let mut writer = BufWriter::new(file);
    let written = staged.write_to(&mut writer)?;
    let file = writer.into_inner().map_err(io::IntoInnerError::into_error)?;
    file.sync_all()?;
    Ok(written)
}

fn keep_permissions(destination: &Path, temp_path: &Path) -> io::Result<()> {
    match fs::metadata(destination) {
        Ok(meta) => fs::set_permissions(temp_path, meta.permissions()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

/// `dir/.name.<pid>.tmp` for `dir/name`.
fn temp_path_for(destination: &Path) -> PathBuf {
    let name = destination.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    destination.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
}

/// Same path by spelling, or by canonical form when both exist.
pub fn same_path(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
