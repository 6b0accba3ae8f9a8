//! Per-dtype tallies of what went into and came out of the engine.

use crate::DType;

/// Counts of tensors entering the engine (by source dtype) and leaving it
/// (by output dtype) over one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionStats {
    incoming: [usize; DType::COUNT],
    outgoing: [usize; DType::COUNT],
}

impl ConversionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one tensor converted from `source` to `output`.
    pub fn record(&mut self, source: DType, output: DType) {
        if let Some(i) = source.index() {
            self.incoming[i] += 1;
        }
        if let Some(i) = output.index() {
            self.outgoing[i] += 1;
        }
    }

    pub fn incoming(&self, dtype: DType) -> usize {
        dtype.index().map_or(0, |i| self.incoming[i])
    }

    pub fn outgoing(&self, dtype: DType) -> usize {
        dtype.index().map_or(0, |i| self.outgoing[i])
    }

    /// Total number of engine invocations recorded.
    pub fn total(&self) -> usize {
        self.incoming.iter().sum()
    }

    /// `(dtype, incoming, outgoing)` for every numeric dtype, in registry order.
    pub fn rows(&self) -> impl Iterator<Item = (DType, usize, usize)> + '_ {
        DType::ALL
            .iter()
            .filter(|d| **d != DType::BOOL)
            .map(|&d| (d, self.incoming(d), self.outgoing(d)))
    }

    /// Emit the table at debug level.
    pub fn log_summary(&self) {
        tracing::debug!("data type conversion information");
        for (dtype, incoming, outgoing) in self.rows() {
            tracing::debug!("{:<5} {:>4} -> {}", dtype.name(), incoming, outgoing);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_counts_both_sides() {
        let mut stats = ConversionStats::new();
        stats.record(DType::F64, DType::F32);
        stats.record(DType::I32, DType::F32);
        stats.record(DType::F64, DType::F32);

        assert_eq!(stats.incoming(DType::F64), 2);
        assert_eq!(stats.incoming(DType::I32), 1);
        assert_eq!(stats.outgoing(DType::F32), 3);
        assert_eq!(stats.outgoing(DType::F64), 0);
        assert_eq!(stats.total(), 3);
    }

    #[test]
    fn unknown_is_ignored() {
        let mut stats = ConversionStats::new();
        stats.record(DType::Unknown, DType::Unknown);
        assert_eq!(stats.total(), 0);
        assert_eq!(stats.incoming(DType::Unknown), 0);
    }

    #[test]
    fn rows_skip_bool() {
        let stats = ConversionStats::new();
        let dtypes: Vec<DType> = stats.rows().map(|(d, _, _)| d).collect();
        assert_eq!(dtypes.len(), DType::COUNT - 1);
        assert!(!dtypes.contains(&DType::BOOL));
    }
}
