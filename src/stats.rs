//! Run statistics.
//!
//! A run's execution report is a tree of three groups — `config` (planner
//! inputs and outputs), `result` (solid k-mer tally), `time` (wall-clock
//! per stage) — serialized to JSON on request. Stage timings are captured
//! by scoped timers that publish on release along every exit path.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use serde::Serialize;

use crate::error::SieveError;

/// The full statistics tree for one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub config: ConfigStats,
    pub result: ResultStats,
    /// Seconds of wall-clock per stage.
    pub time: BTreeMap<String, f64>,
}

/// Planner inputs and outputs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigStats {
    pub db: PathBuf,
    pub kmer_size: usize,
    pub nks: u32,
    pub max_couv: u32,
    pub bank_size_mb: u64,
    pub reads: u64,
    pub bases: u64,
    pub kmers: u64,
    pub kmers_volume_mb: u64,
    pub max_memory_mb: u64,
    pub max_disk_mb: Option<u64>,
    pub nb_passes: usize,
    pub nb_partitions: usize,
    pub bits_per_kmer: u32,
}

/// Outcome of the run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResultStats {
    pub solid_kmers: u64,
    pub out: PathBuf,
}

/// Accumulator of per-stage wall-clock times.
#[derive(Debug, Default)]
pub struct TimeSheet {
    entries: Mutex<BTreeMap<String, f64>>,
}

impl TimeSheet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts timing `stage`; elapsed time is published when the returned
    /// guard drops.
    #[must_use]
    pub fn scope(&self, stage: &str) -> StageTimer<'_> {
        StageTimer {
            sheet: self,
            stage: stage.to_string(),
            start: Instant::now(),
        }
    }

    /// Snapshot of the accumulated timings.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, stage: String, seconds: f64) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        *entries.entry(stage).or_insert(0.0) += seconds;
    }
}

/// Guard that publishes a stage's elapsed wall-clock on drop.
#[derive(Debug)]
pub struct StageTimer<'a> {
    sheet: &'a TimeSheet,
    stage: String,
    start: Instant,
}

impl Drop for StageTimer<'_> {
    fn drop(&mut self) {
        let stage = std::mem::take(&mut self.stage);
        self.sheet.record(stage, self.start.elapsed().as_secs_f64());
    }
}

/// Writes the statistics tree as pretty-printed JSON.
pub fn dump(stats: &RunStats, path: impl AsRef<Path>) -> Result<(), SieveError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| SieveError::write(e, path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, stats)?;
    writer
        .write_all(b"\n")
        .and_then(|()| writer.flush())
        .map_err(|e| SieveError::write(e, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn scoped_timers_accumulate_per_stage() {
        let sheet = TimeSheet::new();
        {
            let _timer = sheet.scope("fill partitions");
        }
        {
            let _timer = sheet.scope("fill partitions");
        }
        {
            let _timer = sheet.scope("fill solid kmers");
        }

        let map = sheet.to_map();
        assert_eq!(map.len(), 2);
        assert!(map.contains_key("fill partitions"));
        assert!(map.contains_key("fill solid kmers"));
        assert!(map.values().all(|&secs| secs >= 0.0));
    }

    #[test]
    fn dump_is_valid_json_with_all_groups() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stats.json");

        let mut stats = RunStats::default();
        stats.config.kmer_size = 21;
        stats.result.solid_kmers = 42;
        stats.time.insert("fill partitions".into(), 0.5);
        dump(&stats, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["config"]["kmer_size"], 21);
        assert_eq!(value["result"]["solid_kmers"], 42);
        assert!(value["time"]["fill partitions"].is_number());
    }
}
