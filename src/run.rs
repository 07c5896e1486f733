//! Run orchestration.
//!
//! [`run`] drives a whole counting run: validate the configuration,
//! convert the input to a binary read bank if needed, estimate the k-mer
//! volume, derive a (passes × partitions) plan, then for each pass scatter
//! the bank into partition files and gather them into the solid sink. The
//! bank is replayed once per pass; the design trades input re-reads for
//! bounded disk and RAM.
//!
//! There are no partial results: on any error or cancellation the solid
//! output and all partition files are removed before returning.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::bank::{self, BankReader};
use crate::cancel::CancelToken;
use crate::error::SieveError;
use crate::gather::{gather, AbundanceBand};
use crate::kmer::{KmerLength, KMER_BYTES};
use crate::model::KmerModel;
use crate::partition::{partition_path, PartitionSet};
use crate::planner::{plan, Budget, Plan, DEFAULT_MAX_OPEN_FILES};
use crate::progress::{ProgressTracker, DEFAULT_NOTIFY_EVERY};
use crate::scatter::scatter;
use crate::solid::SolidWriter;
use crate::stats::{ConfigStats, ResultStats, RunStats, TimeSheet};

const MBYTE: u64 = 1024 * 1024;

/// Configuration of one counting run.
#[derive(Debug, Clone)]
pub struct SieveConfig {
    /// K-mer length in bases.
    pub k: usize,
    /// Input: a FASTA/FASTQ file or an existing binary read bank.
    pub db: PathBuf,
    /// Solid k-mer output path.
    pub out: PathBuf,
    /// Path prefix for partition files.
    pub prefix: String,
    /// Worker pool size; `None` uses the global rayon default.
    pub nb_cores: Option<usize>,
    /// RAM budget for one partition, in MB.
    pub max_memory_mb: u64,
    /// Optional cap on temporary disk usage, in MB.
    pub max_disk_mb: Option<u64>,
    /// Minimum abundance of a solid k-mer (inclusive).
    pub nks: u32,
    /// Maximum abundance of a solid k-mer (inclusive).
    pub max_couv: u32,
    /// Suppress the progress observer.
    pub quiet: bool,
    /// Optional path for the JSON statistics dump.
    pub stats_path: Option<PathBuf>,
    /// Open-file budget assumed by the planner.
    pub max_open_files: usize,
}

impl SieveConfig {
    /// Configuration with the documented defaults for everything but `k`
    /// and the input path.
    pub fn new(k: usize, db: impl Into<PathBuf>) -> Self {
        Self {
            k,
            db: db.into(),
            out: PathBuf::from("solid.bin"),
            prefix: "dsk.".to_string(),
            nb_cores: None,
            max_memory_mb: 1024,
            max_disk_mb: None,
            nks: AbundanceBand::DEFAULT_MIN,
            max_couv: AbundanceBand::DEFAULT_MAX,
            quiet: false,
            stats_path: None,
            max_open_files: DEFAULT_MAX_OPEN_FILES,
        }
    }

    fn validate(&self) -> Result<(KmerLength, AbundanceBand), SieveError> {
        let k = KmerLength::new(self.k)?;
        let band = AbundanceBand::new(self.nks, self.max_couv)?;
        if self.max_memory_mb < 1 {
            return Err(SieveError::InvalidConfig {
                reason: "max-memory must be at least 1 MB".into(),
            });
        }
        if self.max_open_files < 4 {
            return Err(SieveError::InvalidConfig {
                reason: "open-file budget must be at least 4".into(),
            });
        }
        Ok((k, band))
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Number of solid k-mers written to the output file.
    pub solid_kmers: u64,
    /// The plan the run executed.
    pub plan: Plan,
    /// The full statistics tree.
    pub stats: RunStats,
}

/// Runs a counting run to completion.
pub fn run(config: &SieveConfig) -> Result<RunSummary, SieveError> {
    run_with_cancel(config, &CancelToken::new())
}

/// Runs a counting run, honoring `cancel` at batch and partition
/// boundaries.
pub fn run_with_cancel(
    config: &SieveConfig,
    cancel: &CancelToken,
) -> Result<RunSummary, SieveError> {
    let (k, band) = config.validate()?;
    match config.nb_cores {
        Some(cores) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(cores)
                .build()
                .map_err(|e| SieveError::InvalidConfig {
                    reason: format!("cannot build a {cores}-worker pool: {e}"),
                })?;
            pool.install(|| run_inner(config, k, band, cancel))
        }
        None => run_inner(config, k, band, cancel),
    }
}

struct PassContext<'a> {
    config: &'a SieveConfig,
    plan: Plan,
    model: KmerModel,
    bank_path: &'a Path,
    solid: &'a SolidWriter,
    band: AbundanceBand,
    cancel: &'a CancelToken,
    times: &'a TimeSheet,
    progress: Option<&'a ProgressTracker>,
}

fn run_inner(
    config: &SieveConfig,
    k: KmerLength,
    band: AbundanceBand,
    cancel: &CancelToken,
) -> Result<RunSummary, SieveError> {
    let times = TimeSheet::new();
    let progress = (!config.quiet).then(|| {
        ProgressTracker::new().with_observer(DEFAULT_NOTIFY_EVERY, |p| {
            info!(
                reads = p.reads_processed,
                bases = p.bases_processed,
                "progress"
            );
        })
    });

    let bank_path = if bank::is_bank(&config.db)? {
        config.db.clone()
    } else {
        let dst = bank_path_for(&config.db);
        info!(
            src = %config.db.display(),
            dst = %dst.display(),
            "converting input to a binary read bank"
        );
        {
            let _timer = times.scope("bank conversion");
            bank::convert_fastx(&config.db, &dst, progress.as_ref())?;
        }
        if let Some(tracker) = &progress {
            tracker.reset();
        }
        dst
    };

    let summary = bank::estimate(&bank_path)?;
    let kmers_nb = summary
        .bases
        .saturating_sub(summary.reads.saturating_mul(k.get() as u64 - 1));
    let volume_mb = kmers_nb * KMER_BYTES / MBYTE;
    let bank_size_mb = summary.file_bytes / MBYTE;

    let plan = plan(&Budget {
        volume_mb,
        bank_size_mb,
        max_memory_mb: config.max_memory_mb,
        max_disk_mb: config.max_disk_mb,
        max_open_files: config.max_open_files,
    })?;
    info!(
        passes = plan.passes,
        partitions = plan.partitions,
        volume_mb,
        reads = summary.reads,
        "planned counting run"
    );

    let solid = SolidWriter::create(&config.out)?;
    let ctx = PassContext {
        config,
        plan,
        model: KmerModel::new(k),
        bank_path: &bank_path,
        solid: &solid,
        band,
        cancel,
        times: &times,
        progress: progress.as_ref(),
    };

    let solid_kmers = match run_passes(&ctx) {
        Ok(count) => count,
        Err(e) => {
            remove_partitions(&config.prefix, plan.partitions);
            solid.discard();
            return Err(e);
        }
    };
    if let Err(e) = solid.flush() {
        solid.discard();
        return Err(e);
    }

    let stats = RunStats {
        config: ConfigStats {
            db: config.db.clone(),
            kmer_size: k.get(),
            nks: band.min(),
            max_couv: band.max(),
            bank_size_mb,
            reads: summary.reads,
            bases: summary.bases,
            kmers: kmers_nb,
            kmers_volume_mb: volume_mb,
            max_memory_mb: config.max_memory_mb,
            max_disk_mb: config.max_disk_mb,
            nb_passes: plan.passes,
            nb_partitions: plan.partitions,
            bits_per_kmer: k.bits(),
        },
        result: ResultStats {
            solid_kmers,
            out: config.out.clone(),
        },
        time: times.to_map(),
    };
    if let Some(path) = &config.stats_path {
        crate::stats::dump(&stats, path)?;
    }
    info!(solid_kmers, out = %config.out.display(), "run complete");

    Ok(RunSummary {
        solid_kmers,
        plan,
        stats,
    })
}

fn run_passes(ctx: &PassContext<'_>) -> Result<u64, SieveError> {
    let mut solid_kmers = 0u64;
    for pass in 0..ctx.plan.passes {
        if ctx.cancel.is_cancelled() {
            return Err(SieveError::Cancelled);
        }
        info!(pass = pass + 1, total = ctx.plan.passes, "starting pass");

        let partitions = PartitionSet::create(&ctx.config.prefix, ctx.plan.partitions)?;
        let outcome = (|| {
            {
                let _timer = ctx.times.scope("fill partitions");
                let mut bank = BankReader::open(ctx.bank_path)?;
                scatter(
                    &mut bank,
                    &ctx.model,
                    &partitions,
                    pass,
                    ctx.plan.passes,
                    ctx.cancel,
                    ctx.progress,
                )?;
            }
            let _timer = ctx.times.scope("fill solid kmers");
            gather(&partitions, ctx.band, ctx.solid, ctx.cancel)
        })();

        match outcome {
            Ok(emitted) => solid_kmers += emitted,
            Err(e) => {
                partitions.remove_all();
                return Err(e);
            }
        }
    }
    Ok(solid_kmers)
}

/// Bank path derived from a sequence-file path (`reads.fa` →
/// `reads.fa.bnk`).
fn bank_path_for(db: &Path) -> PathBuf {
    let mut os = db.as_os_str().to_os_string();
    os.push(".bnk");
    PathBuf::from(os)
}

fn remove_partitions(prefix: &str, count: usize) {
    for index in 0..count {
        let _ = std::fs::remove_file(partition_path(prefix, index));
    }
}
