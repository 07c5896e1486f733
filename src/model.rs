//! K-mer model: canonical k-mer extraction from reads.
//!
//! [`KmerModel`] walks a read once, maintaining the packed forward window
//! and its reverse complement side by side, so each base advances both in
//! O(1). Windows overlapping a base outside {A, C, G, T} are skipped
//! without error. The model is immutable after construction and freely
//! shared across worker threads.

use crate::kmer::{encode_base, KmerLength};

/// Stateless extractor of canonical k-mers.
#[derive(Debug, Clone, Copy)]
pub struct KmerModel {
    k: KmerLength,
}

impl KmerModel {
    /// Creates a model for k-mers of length `k`.
    #[must_use]
    pub fn new(k: KmerLength) -> Self {
        Self { k }
    }

    /// The k-mer length this model extracts.
    #[must_use]
    pub fn k(&self) -> KmerLength {
        self.k
    }

    /// Appends the canonical k-mers of `seq`, in read order, to `out`.
    ///
    /// A read of length `L` with no invalid bases yields exactly
    /// `max(0, L - k + 1)` k-mers.
    pub fn extract_into(&self, seq: &[u8], out: &mut Vec<u64>) {
        let k = self.k.get();
        let mask = self.k.mask();
        let shift = 2 * (k as u32 - 1);

        let mut fwd = 0u64;
        let mut rc = 0u64;
        let mut filled = 0usize;

        for &base in seq {
            match encode_base(base) {
                Some(code) => {
                    fwd = ((fwd << 2) | code) & mask;
                    rc = (rc >> 2) | ((code ^ 2) << shift);
                    filled += 1;
                    if filled >= k {
                        out.push(fwd.min(rc));
                    }
                }
                None => {
                    fwd = 0;
                    rc = 0;
                    filled = 0;
                }
            }
        }
    }

    /// Convenience wrapper returning a fresh vector.
    #[must_use]
    pub fn extract(&self, seq: &[u8]) -> Vec<u64> {
        let mut out = Vec::with_capacity(seq.len().saturating_sub(self.k.get() - 1));
        self.extract_into(seq, &mut out);
        out
    }
}
