//! Command-line interface definition.

use clap::Parser;
use std::path::PathBuf;

use crate::gather::AbundanceBand;
use crate::run::SieveConfig;

/// A disk-streaming counter of solid k-mers.
///
/// Counts exact canonical k-mer occurrences across a read set larger than
/// RAM by scattering k-mers into hash-routed partition files over several
/// passes, then sorting each partition and keeping the k-mers whose
/// abundance falls in the configured band.
///
/// # Examples
///
/// ```bash
/// # Count 21-mers seen at least 3 times
/// kmersieve 21 reads.fa
///
/// # Force a small memory budget and keep statistics
/// kmersieve 27 reads.fastq --max-memory 512 --stats run.json
/// ```
#[derive(Parser, Debug)]
#[command(name = "kmersieve")]
#[command(version, author, about, long_about = None)]
pub struct Args {
    /// K-mer length (1-32)
    #[arg(value_parser = parse_k)]
    pub k: usize,

    /// Input: FASTA/FASTQ file or binary read bank
    pub db: PathBuf,

    /// Solid k-mer output path
    #[arg(short, long, default_value = "solid.bin")]
    pub out: PathBuf,

    /// Path prefix for temporary partition files
    #[arg(long, default_value = "dsk.")]
    pub prefix: String,

    /// Worker pool size (defaults to hardware concurrency)
    #[arg(long)]
    pub nb_cores: Option<usize>,

    /// RAM budget per partition, in MB
    #[arg(long, default_value_t = 1024)]
    pub max_memory: u64,

    /// Cap on temporary disk usage, in MB
    #[arg(long)]
    pub max_disk: Option<u64>,

    /// Minimum abundance (inclusive) for a solid k-mer
    #[arg(long, default_value_t = AbundanceBand::DEFAULT_MIN)]
    pub nks: u32,

    /// Maximum abundance (inclusive) for a solid k-mer
    #[arg(long, default_value_t = AbundanceBand::DEFAULT_MAX)]
    pub max_couv: u32,

    /// Suppress progress and informational output
    #[arg(short, long)]
    pub quiet: bool,

    /// Dump execution statistics as JSON to this path
    #[arg(long)]
    pub stats: Option<PathBuf>,
}

impl Args {
    /// Builds the library configuration for this invocation.
    #[must_use]
    pub fn to_config(&self) -> SieveConfig {
        SieveConfig {
            out: self.out.clone(),
            prefix: self.prefix.clone(),
            nb_cores: self.nb_cores,
            max_memory_mb: self.max_memory,
            max_disk_mb: self.max_disk,
            nks: self.nks,
            max_couv: self.max_couv,
            quiet: self.quiet,
            stats_path: self.stats.clone(),
            ..SieveConfig::new(self.k, &self.db)
        }
    }
}

fn parse_k(s: &str) -> Result<usize, String> {
    let k: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if k == 0 {
        return Err("k-mer length must be at least 1".to_string());
    }
    if k > 32 {
        return Err("k-mer length must be at most 32".to_string());
    }
    Ok(k)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_invocation_with_defaults() {
        let args = Args::try_parse_from(["kmersieve", "21", "reads.fa"]).unwrap();
        assert_eq!(args.k, 21);
        assert_eq!(args.db, PathBuf::from("reads.fa"));
        assert_eq!(args.out, PathBuf::from("solid.bin"));
        assert_eq!(args.prefix, "dsk.");
        assert_eq!(args.nks, 3);
        assert_eq!(args.max_couv, 2_147_483_646);
        assert!(!args.quiet);
        assert!(args.stats.is_none());
    }

    #[test]
    fn rejects_out_of_range_k() {
        assert!(Args::try_parse_from(["kmersieve", "0", "reads.fa"]).is_err());
        assert!(Args::try_parse_from(["kmersieve", "33", "reads.fa"]).is_err());
        assert!(Args::try_parse_from(["kmersieve", "abc", "reads.fa"]).is_err());
    }

    #[test]
    fn config_carries_all_options() {
        let args = Args::try_parse_from([
            "kmersieve",
            "5",
            "reads.fa",
            "--out",
            "result.bin",
            "--prefix",
            "tmp/x.",
            "--nb-cores",
            "2",
            "--max-memory",
            "64",
            "--nks",
            "1",
            "--quiet",
        ])
        .unwrap();
        let config = args.to_config();
        assert_eq!(config.k, 5);
        assert_eq!(config.out, PathBuf::from("result.bin"));
        assert_eq!(config.prefix, "tmp/x.");
        assert_eq!(config.nb_cores, Some(2));
        assert_eq!(config.max_memory_mb, 64);
        assert_eq!(config.nks, 1);
        assert!(config.quiet);
    }
}
