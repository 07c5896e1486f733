//! # kmersieve
//!
//! `kmersieve` counts exact occurrences of canonical
//! [k-mers](https://en.wikipedia.org/wiki/K-mer) across a genomic read set
//! that is too large to hold in memory, and writes the subset whose
//! abundance reaches a threshold ("solid" k-mers) to a binary output file.
//!
//! Counting is decomposed into P passes of Q disk partitions, both sized
//! from memory, disk and open-file budgets by the [`planner`]. Each pass
//! streams the binary read [`bank`], routes its share of the k-mer universe
//! into partition files ([`scatter`]), then sorts each partition and keeps
//! the k-mers whose run length falls in the abundance band ([`gather`]).
//! Every occurrence of a given k-mer lands in exactly one
//! (pass, partition) pair, so abundances are exact.
//!
//! ```rust,no_run
//! use kmersieve::{run, SieveConfig};
//!
//! let mut config = SieveConfig::new(21, "reads.fa");
//! config.nks = 3;
//! config.max_memory_mb = 512;
//!
//! let summary = run::run(&config)?;
//! println!("{} solid k-mers", summary.solid_kmers);
//! # Ok::<(), kmersieve::SieveError>(())
//! ```

pub mod bank;
pub mod cancel;
pub mod cli;
pub mod error;
pub mod gather;
pub mod hash;
pub mod kmer;
pub mod model;
pub mod partition;
pub mod planner;
pub mod progress;
pub mod run;
pub mod scatter;
pub mod solid;
pub mod stats;

pub use cancel::CancelToken;
pub use error::SieveError;
pub use gather::AbundanceBand;
pub use kmer::KmerLength;
pub use model::KmerModel;
pub use planner::Plan;
pub use run::{RunSummary, SieveConfig};
