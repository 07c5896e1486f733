//! Solid k-mer sink.
//!
//! The run's output file: raw little-endian `u64` k-mers, same framing-free
//! format as a partition file. Contributions arrive pass-major then
//! partition-major, ascending within each partition's contribution; no
//! total order across the file is maintained. Any pre-existing file at the
//! output path is removed when the sink is created, and the file is only
//! left behind by a run that completes.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::SieveError;
use crate::kmer::KMER_BYTES;

/// Buffered append-only writer of the solid k-mer file.
#[derive(Debug)]
pub struct SolidWriter {
    inner: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl SolidWriter {
    /// Creates the output file, removing any pre-existing one first.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SieveError> {
        let path = path.as_ref().to_path_buf();
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(SieveError::write(e, &path)),
        }
        let file = File::create(&path).map_err(|e| SieveError::write(e, &path))?;
        Ok(Self {
            inner: Mutex::new(BufWriter::new(file)),
            path,
        })
    }

    fn writer(&self) -> MutexGuard<'_, BufWriter<File>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a block of solid k-mers.
    pub fn append(&self, kmers: &[u64]) -> Result<(), SieveError> {
        let mut writer = self.writer();
        for kmer in kmers {
            writer
                .write_all(&kmer.to_le_bytes())
                .map_err(|e| SieveError::write(e, &self.path))?;
        }
        Ok(())
    }

    /// Flushes buffered k-mers to disk.
    pub fn flush(&self) -> Result<(), SieveError> {
        self.writer()
            .flush()
            .map_err(|e| SieveError::write(e, &self.path))
    }

    /// Path of the output file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the output file; used when a run aborts.
    pub fn discard(self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Number of k-mers in a solid file, from its size.
pub fn count(path: impl AsRef<Path>) -> Result<u64, SieveError> {
    let path = path.as_ref();
    let bytes = fs::metadata(path)
        .map_err(|e| SieveError::read(e, path))?
        .len();
    if bytes % KMER_BYTES != 0 {
        return Err(SieveError::KmerFileFormat {
            details: format!("size {bytes} is not a multiple of the k-mer width"),
            path: path.to_path_buf(),
        });
    }
    Ok(bytes / KMER_BYTES)
}

/// Reads a whole solid file into memory.
pub fn read(path: impl AsRef<Path>) -> Result<Vec<u64>, SieveError> {
    crate::partition::read_kmer_file(path)
}
