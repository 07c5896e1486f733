//! Partition files: the disk side of the scatter stage.
//!
//! A [`PartitionSet`] is one pass's worth of append-only binary files, one
//! per partition, holding raw little-endian `u64` k-mers with no framing.
//! Worker threads never write to the files directly: each worker owns a
//! [`PartitionCache`] of fixed-size per-partition buffers and appends a
//! full buffer at a time under that partition's file lock, so writes to the
//! same partition are serialized while different partitions flush
//! concurrently.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::SieveError;
use crate::kmer::KMER_BYTES;

/// K-mers buffered per partition per worker before a flush (64 KiB).
pub const CACHE_KMERS: usize = 8 * 1024;

/// Path of partition file `index` under `prefix`.
///
/// `prefix` is used verbatim, so `"tmp/dsk."` yields `tmp/dsk.partition.3`.
#[must_use]
pub fn partition_path(prefix: &str, index: usize) -> PathBuf {
    PathBuf::from(format!("{prefix}partition.{index}"))
}

/// The partition files of one pass.
#[derive(Debug)]
pub struct PartitionSet {
    files: Vec<Mutex<BufWriter<File>>>,
    paths: Vec<PathBuf>,
}

impl PartitionSet {
    /// Creates (truncating) `count` partition files under `prefix`.
    pub fn create(prefix: &str, count: usize) -> Result<Self, SieveError> {
        let mut files = Vec::with_capacity(count);
        let mut paths = Vec::with_capacity(count);
        for index in 0..count {
            let path = partition_path(prefix, index);
            let file = File::create(&path).map_err(|e| SieveError::write(e, &path))?;
            files.push(Mutex::new(BufWriter::new(file)));
            paths.push(path);
        }
        Ok(Self { files, paths })
    }

    /// Number of partitions in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Path of partition `index`.
    #[must_use]
    pub fn path(&self, index: usize) -> &Path {
        &self.paths[index]
    }

    fn writer(&self, index: usize) -> MutexGuard<'_, BufWriter<File>> {
        self.files[index]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a block of k-mers to partition `index`.
    pub fn append(&self, index: usize, kmers: &[u64]) -> Result<(), SieveError> {
        let mut writer = self.writer(index);
        for kmer in kmers {
            writer
                .write_all(&kmer.to_le_bytes())
                .map_err(|e| SieveError::write(e, &self.paths[index]))?;
        }
        Ok(())
    }

    /// Flushes every partition file to disk.
    ///
    /// After this, each file's size is its k-mer count times the k-mer
    /// width.
    pub fn flush(&self) -> Result<(), SieveError> {
        for index in 0..self.files.len() {
            self.writer(index)
                .flush()
                .map_err(|e| SieveError::write(e, &self.paths[index]))?;
        }
        Ok(())
    }

    /// Loads the whole of partition `index` into memory.
    pub fn load(&self, index: usize) -> Result<Vec<u64>, SieveError> {
        read_kmer_file(&self.paths[index])
    }

    /// Deletes partition `index`'s file.
    pub fn remove(&self, index: usize) -> Result<(), SieveError> {
        std::fs::remove_file(&self.paths[index])
            .map_err(|e| SieveError::write(e, &self.paths[index]))
    }

    /// Best-effort deletion of every partition file, for abort paths.
    pub fn remove_all(&self) {
        for path in &self.paths {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Reads a raw k-mer file (partition or solid output) into memory.
pub fn read_kmer_file(path: impl AsRef<Path>) -> Result<Vec<u64>, SieveError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| SieveError::read(e, path))?;
    let bytes = file
        .metadata()
        .map_err(|e| SieveError::read(e, path))?
        .len();
    if bytes % KMER_BYTES != 0 {
        return Err(SieveError::KmerFileFormat {
            details: format!("size {bytes} is not a multiple of the k-mer width"),
            path: path.to_path_buf(),
        });
    }

    let mut kmers = Vec::with_capacity((bytes / KMER_BYTES) as usize);
    let mut reader = BufReader::with_capacity(1 << 20, file);
    let mut word = [0u8; KMER_BYTES as usize];
    loop {
        match reader.read_exact(&mut word) {
            Ok(()) => kmers.push(u64::from_le_bytes(word)),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(SieveError::read(e, path)),
        }
    }
    Ok(kmers)
}

/// A worker's private write buffers, one per partition.
///
/// Holds a non-owning handle on the set; whatever is still buffered is
/// flushed on drop, but callers that need the I/O error should call
/// [`PartitionCache::flush`] themselves first.
#[derive(Debug)]
pub struct PartitionCache<'a> {
    set: &'a PartitionSet,
    bufs: Vec<Vec<u64>>,
}

impl<'a> PartitionCache<'a> {
    /// Creates an empty cache over `set`.
    #[must_use]
    pub fn new(set: &'a PartitionSet) -> Self {
        Self {
            set,
            bufs: vec![Vec::new(); set.len()],
        }
    }

    /// Buffers one k-mer for partition `index`, appending to the file when
    /// the buffer reaches [`CACHE_KMERS`].
    pub fn insert(&mut self, index: usize, kmer: u64) -> Result<(), SieveError> {
        let buf = &mut self.bufs[index];
        buf.push(kmer);
        if buf.len() >= CACHE_KMERS {
            self.set.append(index, buf)?;
            buf.clear();
        }
        Ok(())
    }

    /// Drains every non-empty buffer to its partition file.
    pub fn flush(&mut self) -> Result<(), SieveError> {
        for (index, buf) in self.bufs.iter_mut().enumerate() {
            if !buf.is_empty() {
                self.set.append(index, buf)?;
                buf.clear();
            }
        }
        Ok(())
    }
}

impl Drop for PartitionCache<'_> {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
