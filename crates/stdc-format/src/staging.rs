//! Append-only sink for converted payloads.

use std::io::{self, Write};
use std::ops::Range;

/// Converted tensor payloads in commit order.
///
/// Payloads are kept as separate chunks and streamed to the output once, so
/// staging never copies tensor data. The running length is the write cursor
/// from which every tensor's new `data_offsets` are taken.
#[derive(Debug, Default)]
pub struct StagingBuffer {
    chunks: Vec<Vec<u8>>,
    len: u64,
}

impl StagingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current write cursor (total bytes staged).
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append a payload and return the range it occupies.
    pub fn append(&mut self, payload: Vec<u8>) -> Range<u64> {
        let start = self.len;
        self.len += payload.len() as u64;
        if !payload.is_empty() {
            self.chunks.push(payload);
        }
        start..self.len
    }

    /// Stream every staged byte to `writer`, returning the byte count.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<u64> {
        for chunk in &self.chunks {
            writer.write_all(chunk)?;
        }
        Ok(self.len)
    }

    /// Append every staged byte to `out`.
    pub fn copy_into(&self, out: &mut Vec<u8>) {
        for chunk in &self.chunks {
            out.extend_from_slice(chunk);
        }
    }

    /// Flatten into one contiguous buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.chunks.concat()
    }
}
