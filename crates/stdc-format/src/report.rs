//! Summary of a completed conversion run.

use std::path::PathBuf;

use serde::Serialize;
use stdc_dtype::{ConversionStats, ConversionTarget};

/// Per-dtype engine traffic, flattened for serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DtypeTally {
    pub dtype: &'static str,
    pub incoming: usize,
    pub outgoing: usize,
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub target: ConversionTarget,
    pub total_tensors: usize,
    pub converted_tensors: usize,
    pub passthrough_tensors: usize,
    pub header_bytes: u64,
    pub data_bytes: u64,
    pub stats: Vec<DtypeTally>,
}

impl ConversionReport {
    /// Total size of the written file.
    pub fn file_bytes(&self) -> u64 {
        crate::header::HEADER_LEN_BYTES + self.header_bytes + self.data_bytes
    }
}

pub(crate) fn tallies(stats: &ConversionStats) -> Vec<DtypeTally> {
    stats
        .rows()
        .map(|(dtype, incoming, outgoing)| DtypeTally { dtype: dtype.name(), incoming, outgoing })
        .collect()
}
