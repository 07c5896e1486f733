//! Scatter stage: route one pass's k-mers to partition files.
//!
//! For pass `p` of a P-pass plan, the read bank is streamed once. Every
//! canonical k-mer `x` is hashed; only those with `hash(x) % P == p` belong
//! to this pass, and they are routed to partition `(hash(x) / P) % Q`.
//! Dividing by P before taking the partition residue keeps pass selection
//! and partition selection on independent bits. What lands on disk is the
//! k-mer itself, not its hash: the gather stage needs value identity.
//!
//! Reads are pulled from the bank in batches by the coordinator and fanned
//! out to rayon workers in fixed-size chunks; all k-mers of one read are
//! handled by one worker.

use bytes::Bytes;
use rayon::prelude::*;
use tracing::debug;

use crate::bank::BankReader;
use crate::cancel::CancelToken;
use crate::error::SieveError;
use crate::hash::scramble;
use crate::model::KmerModel;
use crate::partition::{PartitionCache, PartitionSet};
use crate::progress::ProgressTracker;

/// Reads pulled from the bank per coordinator iteration.
const BATCH_READS: usize = 4096;

/// Reads handed to one worker within a batch.
const CHUNK_READS: usize = 64;

/// Streams the bank once, filling `partitions` with pass `pass`'s k-mers.
pub fn scatter(
    bank: &mut BankReader,
    model: &KmerModel,
    partitions: &PartitionSet,
    pass: usize,
    passes: usize,
    cancel: &CancelToken,
    progress: Option<&ProgressTracker>,
) -> Result<(), SieveError> {
    let nb_passes = passes as u64;
    let current = pass as u64;
    let nb_partitions = partitions.len() as u64;
    let mut batches = 0u64;

    loop {
        if cancel.is_cancelled() {
            return Err(SieveError::Cancelled);
        }
        let batch = bank.next_batch(BATCH_READS)?;
        if batch.is_empty() {
            break;
        }
        batches += 1;

        batch
            .par_chunks(CHUNK_READS)
            .try_for_each(|reads: &[Bytes]| {
                let mut cache = PartitionCache::new(partitions);
                let mut kmers = Vec::new();
                for read in reads {
                    kmers.clear();
                    model.extract_into(read, &mut kmers);
                    for &kmer in &kmers {
                        let h = scramble(kmer);
                        if h % nb_passes != current {
                            continue;
                        }
                        let partition = ((h / nb_passes) % nb_partitions) as usize;
                        cache.insert(partition, kmer)?;
                    }
                    if let Some(tracker) = progress {
                        tracker.record_sequence(read.len() as u64);
                    }
                }
                cache.flush()
            })?;
    }

    partitions.flush()?;
    debug!(pass, batches, "scatter complete");
    Ok(())
}
