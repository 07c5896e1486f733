//! Gather stage: sort partitions and emit solid k-mers.
//!
//! Each partition file is loaded whole (the planner sized it to fit in
//! RAM), sorted, and scanned for runs of equal values. A run whose length
//! falls inside the abundance band is a solid k-mer and goes to the solid
//! sink, in ascending order within the partition's contribution. The
//! partition file is deleted as soon as it has been scanned.

use rayon::prelude::*;
use tracing::debug;

use crate::cancel::CancelToken;
use crate::error::SieveError;
use crate::partition::PartitionSet;
use crate::solid::SolidWriter;

/// Inclusive band of admissible abundances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbundanceBand {
    min: u32,
    max: u32,
}

impl AbundanceBand {
    /// Default minimum abundance for a solid k-mer.
    pub const DEFAULT_MIN: u32 = 3;

    /// Default abundance cap (2^31 - 2).
    pub const DEFAULT_MAX: u32 = 2_147_483_646;

    /// Validates and builds a band; `min` must be at least 1 and at most
    /// `max`.
    pub fn new(min: u32, max: u32) -> Result<Self, SieveError> {
        if min < 1 {
            return Err(SieveError::InvalidConfig {
                reason: "minimum abundance (nks) must be at least 1".into(),
            });
        }
        if max < min {
            return Err(SieveError::InvalidConfig {
                reason: format!("abundance band is empty: nks {min} > max-couv {max}"),
            });
        }
        Ok(Self { min, max })
    }

    /// Lower bound (nks).
    #[must_use]
    pub fn min(&self) -> u32 {
        self.min
    }

    /// Upper bound (max-couv).
    #[must_use]
    pub fn max(&self) -> u32 {
        self.max
    }

    /// Whether an occurrence count is admissible.
    #[must_use]
    pub fn contains(&self, count: u64) -> bool {
        count >= u64::from(self.min) && count <= u64::from(self.max)
    }
}

impl Default for AbundanceBand {
    fn default() -> Self {
        Self {
            min: Self::DEFAULT_MIN,
            max: Self::DEFAULT_MAX,
        }
    }
}

/// Sorts and scans every partition of a pass, appending solid k-mers to
/// the sink. Returns the number of solid k-mers emitted.
pub fn gather(
    partitions: &PartitionSet,
    band: AbundanceBand,
    solid: &SolidWriter,
    cancel: &CancelToken,
) -> Result<u64, SieveError> {
    let mut emitted = 0u64;
    for index in 0..partitions.len() {
        if cancel.is_cancelled() {
            return Err(SieveError::Cancelled);
        }
        let mut kmers = partitions.load(index)?;
        kmers.par_sort_unstable();

        let run = filter_runs(&kmers, band);
        debug!(
            partition = index,
            loaded = kmers.len(),
            solid = run.len(),
            "gathered partition"
        );
        solid.append(&run)?;
        emitted += run.len() as u64;
        partitions.remove(index)?;
    }
    Ok(emitted)
}

/// Run-length scan of a sorted slice, keeping one k-mer per run whose
/// length lies inside the band.
#[must_use]
pub fn filter_runs(sorted: &[u64], band: AbundanceBand) -> Vec<u64> {
    let mut solid = Vec::new();
    let mut previous = match sorted.first() {
        Some(&kmer) => kmer,
        None => return solid,
    };
    let mut abundance = 0u64;

    for &kmer in sorted {
        if kmer == previous {
            abundance += 1;
        } else {
            if band.contains(abundance) {
                solid.push(previous);
            }
            abundance = 1;
            previous = kmer;
        }
    }
    // The last run ends at end-of-buffer, not at a value change.
    if band.contains(abundance) {
        solid.push(previous);
    }
    solid
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band(min: u32, max: u32) -> AbundanceBand {
        AbundanceBand::new(min, max).unwrap()
    }

    #[test]
    fn band_validation() {
        assert!(AbundanceBand::new(0, 10).is_err());
        assert!(AbundanceBand::new(5, 4).is_err());
        assert!(AbundanceBand::new(1, 1).is_ok());
        let default = AbundanceBand::default();
        assert_eq!(default.min(), 3);
        assert_eq!(default.max(), 2_147_483_646);
    }

    #[test]
    fn empty_input_emits_nothing() {
        assert!(filter_runs(&[], band(1, 100)).is_empty());
    }

    #[test]
    fn all_identical_is_one_run() {
        let kmers = vec![7u64; 5];
        assert_eq!(filter_runs(&kmers, band(1, 100)), vec![7]);
        assert_eq!(filter_runs(&kmers, band(5, 5)), vec![7]);
        assert!(filter_runs(&kmers, band(6, 100)).is_empty());
    }

    #[test]
    fn last_run_is_emitted() {
        let kmers = vec![1, 1, 1, 2, 2];
        assert_eq!(filter_runs(&kmers, band(2, 100)), vec![1, 2]);
        assert_eq!(filter_runs(&kmers, band(3, 100)), vec![1]);
    }

    #[test]
    fn band_filters_both_ends() {
        // abundances: 1 -> 1, 2 -> 2, 3 -> 3, 4 -> 4
        let kmers = vec![1, 2, 2, 3, 3, 3, 4, 4, 4, 4];
        assert_eq!(filter_runs(&kmers, band(2, 3)), vec![2, 3]);
        assert_eq!(filter_runs(&kmers, band(1, 1)), vec![1]);
        assert_eq!(filter_runs(&kmers, band(4, 10)), vec![4]);
    }

    #[test]
    fn insertion_order_is_irrelevant_after_sorting() {
        let mut a = vec![9u64, 3, 9, 1, 3, 9];
        let mut b = vec![3u64, 9, 1, 9, 3, 9];
        a.sort_unstable();
        b.sort_unstable();
        let band = band(2, 100);
        assert_eq!(filter_runs(&a, band), filter_runs(&b, band));
    }
}
