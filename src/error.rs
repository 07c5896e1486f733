//! Error types for kmersieve.
//!
//! This module provides exhaustive, strongly-typed errors for all operations
//! in the library, enabling precise error handling and informative messages.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in kmersieve operations.
#[derive(Debug, Error)]
pub enum SieveError {
    /// K-mer length is outside the valid range (1-32).
    #[error("invalid k-mer length {k}: must be between {min} and {max}")]
    InvalidKmerLength { k: usize, min: u8, max: u8 },

    /// A configuration value fails validation before any I/O happens.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// The binary read bank is malformed.
    #[error("malformed read bank '{path}': {details}")]
    BankFormat { details: String, path: PathBuf },

    /// Failed to parse the FASTA/FASTQ input during bank conversion.
    #[error("failed to parse sequence file '{path}': {details}")]
    SequenceParse { details: String, path: PathBuf },

    /// A partition or solid k-mer file has an impossible size or content.
    #[error("corrupt k-mer file '{path}': {details}")]
    KmerFileFormat { details: String, path: PathBuf },

    /// Failed to read a file.
    #[error("failed to read '{path}': {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to write a file.
    #[error("failed to write '{path}': {source}")]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// The planner cannot satisfy the memory and open-file budgets jointly.
    #[error(
        "budget infeasible: counting would need more than {max_passes} passes \
         with {max_memory_mb} MB of RAM and {max_open_files} open files; \
         raise --max-memory or --max-disk"
    )]
    BudgetInfeasible {
        max_passes: usize,
        max_memory_mb: u64,
        max_open_files: usize,
    },

    /// The run was cancelled; intermediate and output files were removed.
    #[error("run cancelled")]
    Cancelled,

    /// Failed to serialize the statistics dump.
    #[error("failed to serialize statistics: {source}")]
    Stats {
        #[from]
        source: serde_json::Error,
    },
}

impl SieveError {
    pub(crate) fn read(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        SieveError::Read {
            source,
            path: path.into(),
        }
    }

    pub(crate) fn write(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        SieveError::Write {
            source,
            path: path.into(),
        }
    }
}

/// Error for invalid k-mer length.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("k-mer length {k} is out of range: must be between {min} and {max}")]
pub struct KmerLengthError {
    /// The invalid k value that was provided.
    pub k: usize,
    /// Minimum valid k-mer length.
    pub min: u8,
    /// Maximum valid k-mer length.
    pub max: u8,
}

impl From<KmerLengthError> for SieveError {
    fn from(err: KmerLengthError) -> Self {
        SieveError::InvalidKmerLength {
            k: err.k,
            min: err.min,
            max: err.max,
        }
    }
}
