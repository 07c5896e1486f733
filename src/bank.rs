//! Binary read bank.
//!
//! The counting core replays its input once per pass, so reads are kept in
//! a flat binary container that is cheap to stream: a 5-byte header (magic
//! `KBNK`, format version) followed by one record per read, each a
//! little-endian `u32` length prefix and the raw sequence bytes over
//! {A, C, G, T, N}. FASTA/FASTQ input is converted into this form up front.
//!
//! # Binary Format (Version 1)
//!
//! ```text
//! +--------+--------+--------------------------------+
//! | MAGIC  | VERSION| RECORDS                        |
//! | 4 bytes| 1 byte | (u32 LE length + bytes) x N    |
//! +--------+--------+--------------------------------+
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::error::SieveError;
use crate::progress::ProgressTracker;

/// Magic bytes identifying a kmersieve read bank.
pub const BANK_MAGIC: &[u8; 4] = b"KBNK";

/// Current bank format version.
const BANK_VERSION: u8 = 1;

const HEADER_LEN: u64 = 5;

/// Upper bound on a single read's length; anything larger is treated as a
/// corrupt length prefix.
const MAX_READ_LEN: u64 = 1 << 28;

/// Size tallies for a bank, gathered while writing or by a length-only scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BankSummary {
    /// Number of reads in the bank.
    pub reads: u64,
    /// Total number of bases across all reads.
    pub bases: u64,
    /// Length of the longest read.
    pub max_read_len: u64,
    /// Total size of the bank file in bytes.
    pub file_bytes: u64,
}

/// Append-only writer producing a bank file.
#[derive(Debug)]
pub struct BankWriter {
    out: BufWriter<File>,
    path: PathBuf,
    summary: BankSummary,
}

impl BankWriter {
    /// Creates (or truncates) a bank file and writes its header.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SieveError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|e| SieveError::write(e, &path))?;
        let mut out = BufWriter::new(file);
        out.write_all(BANK_MAGIC)
            .and_then(|()| out.write_all(&[BANK_VERSION]))
            .map_err(|e| SieveError::write(e, &path))?;
        Ok(Self {
            out,
            path,
            summary: BankSummary {
                file_bytes: HEADER_LEN,
                ..BankSummary::default()
            },
        })
    }

    /// Appends one read.
    pub fn push(&mut self, seq: &[u8]) -> Result<(), SieveError> {
        let len = seq.len() as u64;
        if len > MAX_READ_LEN {
            return Err(SieveError::BankFormat {
                details: format!("read of {len} bases exceeds the record limit"),
                path: self.path.clone(),
            });
        }
        self.out
            .write_all(&(len as u32).to_le_bytes())
            .and_then(|()| self.out.write_all(seq))
            .map_err(|e| SieveError::write(e, &self.path))?;
        self.summary.reads += 1;
        self.summary.bases += len;
        self.summary.max_read_len = self.summary.max_read_len.max(len);
        self.summary.file_bytes += 4 + len;
        Ok(())
    }

    /// Flushes and returns the tallies for the written bank.
    pub fn finish(mut self) -> Result<BankSummary, SieveError> {
        self.out
            .flush()
            .map_err(|e| SieveError::write(e, &self.path))?;
        Ok(self.summary)
    }
}

/// Streaming reader over a bank file.
#[derive(Debug)]
pub struct BankReader {
    input: BufReader<File>,
    path: PathBuf,
    pos: u64,
    end: u64,
}

impl BankReader {
    /// Opens a bank and validates its header.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SieveError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| SieveError::read(e, &path))?;
        let end = file
            .metadata()
            .map_err(|e| SieveError::read(e, &path))?
            .len();
        let mut input = BufReader::new(file);

        let mut header = [0u8; HEADER_LEN as usize];
        input.read_exact(&mut header).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                SieveError::BankFormat {
                    details: "file too short for a bank header".into(),
                    path: path.clone(),
                }
            } else {
                SieveError::read(e, &path)
            }
        })?;
        if &header[..4] != BANK_MAGIC {
            return Err(SieveError::BankFormat {
                details: "bad magic (not a read bank)".into(),
                path,
            });
        }
        if header[4] != BANK_VERSION {
            return Err(SieveError::BankFormat {
                details: format!("unsupported bank version {}", header[4]),
                path,
            });
        }

        Ok(Self {
            input,
            path,
            pos: HEADER_LEN,
            end,
        })
    }

    /// Returns the next read, or `None` at end of bank.
    pub fn next_read(&mut self) -> Result<Option<Bytes>, SieveError> {
        let len = match self.next_len()? {
            Some(len) => len,
            None => return Ok(None),
        };
        let mut payload = vec![0u8; len as usize];
        self.input
            .read_exact(&mut payload)
            .map_err(|e| self.truncated_or_io(e))?;
        self.pos += 4 + len;
        Ok(Some(Bytes::from(payload)))
    }

    /// Pulls up to `max` reads into a batch, amortizing reader contention.
    pub fn next_batch(&mut self, max: usize) -> Result<Vec<Bytes>, SieveError> {
        let mut batch = Vec::with_capacity(max);
        while batch.len() < max {
            match self.next_read()? {
                Some(read) => batch.push(read),
                None => break,
            }
        }
        Ok(batch)
    }

    fn next_len(&mut self) -> Result<Option<u64>, SieveError> {
        if self.pos >= self.end {
            return Ok(None);
        }
        let mut lenbuf = [0u8; 4];
        self.input
            .read_exact(&mut lenbuf)
            .map_err(|e| self.truncated_or_io(e))?;
        let len = u64::from(u32::from_le_bytes(lenbuf));
        if len > MAX_READ_LEN {
            return Err(SieveError::BankFormat {
                details: format!("corrupt length prefix ({len})"),
                path: self.path.clone(),
            });
        }
        if self.pos + 4 + len > self.end {
            return Err(SieveError::BankFormat {
                details: "truncated read record".into(),
                path: self.path.clone(),
            });
        }
        Ok(Some(len))
    }

    fn truncated_or_io(&self, e: std::io::Error) -> SieveError {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            SieveError::BankFormat {
                details: "truncated read record".into(),
                path: self.path.clone(),
            }
        } else {
            SieveError::read(e, &self.path)
        }
    }
}

/// Tallies a bank by scanning length prefixes only (payloads are skipped).
pub fn estimate(path: impl AsRef<Path>) -> Result<BankSummary, SieveError> {
    let mut reader = BankReader::open(&path)?;
    let mut summary = BankSummary {
        file_bytes: reader.end,
        ..BankSummary::default()
    };
    while let Some(len) = reader.next_len()? {
        reader
            .input
            .seek_relative(len as i64)
            .map_err(|e| SieveError::read(e, &reader.path))?;
        reader.pos += 4 + len;
        summary.reads += 1;
        summary.bases += len;
        summary.max_read_len = summary.max_read_len.max(len);
    }
    Ok(summary)
}

/// Checks whether `path` starts with the bank magic.
pub fn is_bank(path: impl AsRef<Path>) -> Result<bool, SieveError> {
    let path = path.as_ref();
    let mut file = File::open(path).map_err(|e| SieveError::read(e, path))?;
    let mut magic = [0u8; 4];
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(&magic == BANK_MAGIC),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(SieveError::read(e, path)),
    }
}

/// Converts a FASTA/FASTQ file (gzip handled by the parser) into a bank.
pub fn convert_fastx(
    src: impl AsRef<Path>,
    dst: impl AsRef<Path>,
    progress: Option<&ProgressTracker>,
) -> Result<BankSummary, SieveError> {
    let src = src.as_ref();
    let mut reader = needletail::parse_fastx_file(src).map_err(|e| SieveError::SequenceParse {
        details: e.to_string(),
        path: src.to_path_buf(),
    })?;

    let mut writer = BankWriter::create(dst)?;
    while let Some(record) = reader.next() {
        let record = record.map_err(|e| SieveError::SequenceParse {
            details: e.to_string(),
            path: src.to_path_buf(),
        })?;
        let seq = record.seq();
        writer.push(seq.as_ref())?;
        if let Some(tracker) = progress {
            tracker.record_sequence(seq.len() as u64);
        }
    }
    writer.finish()
}
