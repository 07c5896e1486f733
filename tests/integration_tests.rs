//! CLI integration tests.
//!
//! These tests drive the installed binary end-to-end: argument handling,
//! a full counting run over a temporary FASTA file, intermediate-file
//! cleanup, and the statistics dump.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

fn kmersieve_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_kmersieve"))
}

fn write_fasta(dir: &TempDir, reads: &[&str]) -> PathBuf {
    let path = dir.path().join("reads.fa");
    let mut contents = String::new();
    for (i, read) in reads.iter().enumerate() {
        contents.push_str(&format!(">r{i}\n{read}\n"));
    }
    std::fs::write(&path, contents).unwrap();
    path
}

fn run_args(dir: &TempDir, fasta: &Path, extra: &[&str]) -> (std::process::Output, PathBuf) {
    let out = dir.path().join("solid.bin");
    let prefix = format!("{}/dsk.", dir.path().display());
    let output = kmersieve_cmd()
        .arg("3")
        .arg(fasta)
        .args(["--out", out.to_str().unwrap()])
        .args(["--prefix", &prefix])
        .args(["--nks", "1"])
        .arg("--quiet")
        .args(extra)
        .output()
        .expect("Failed to execute");
    (output, out)
}

#[test]
fn cli_help_flag() {
    let output = kmersieve_cmd()
        .arg("--help")
        .output()
        .expect("Failed to execute");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("kmersieve"));
    assert!(stdout.contains("k-mer"));
}

#[test]
fn cli_version_flag() {
    let output = kmersieve_cmd()
        .arg("--version")
        .output()
        .expect("Failed to execute");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn cli_missing_args() {
    let output = kmersieve_cmd().output().expect("Failed to execute");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("required") || stderr.contains("Usage"));
}

#[test]
fn cli_invalid_k() {
    for bad_k in ["0", "33", "abc"] {
        let output = kmersieve_cmd()
            .args([bad_k, "reads.fa"])
            .output()
            .expect("Failed to execute");
        assert!(!output.status.success(), "k={bad_k} should be rejected");
    }
}

#[test]
fn cli_invalid_file_path() {
    let output = kmersieve_cmd()
        .args(["5", "/nonexistent/path/to/file.fa"])
        .output()
        .expect("Failed to execute");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("kmersieve:"));
}

#[test]
fn cli_counts_a_small_corpus() {
    let dir = TempDir::new().unwrap();
    let fasta = write_fasta(&dir, &["ACGTACGT"]);
    let (output, solid) = run_args(&dir, &fasta, &[]);

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    // Two solid canonical 3-mers, 8 bytes each.
    assert_eq!(std::fs::metadata(&solid).unwrap().len(), 16);
}

#[test]
fn cli_threshold_excludes_rare_kmers() {
    let dir = TempDir::new().unwrap();
    let fasta = write_fasta(&dir, &["ACGTACGT"]);
    let out = dir.path().join("solid.bin");
    let prefix = format!("{}/dsk.", dir.path().display());
    let output = kmersieve_cmd()
        .arg("3")
        .arg(&fasta)
        .args(["--out", out.to_str().unwrap()])
        .args(["--prefix", &prefix])
        .args(["--nks", "3"])
        .arg("--quiet")
        .output()
        .expect("Failed to execute");

    assert!(output.status.success());
    // Only ACG (abundance 4) survives nks=3.
    assert_eq!(std::fs::metadata(&out).unwrap().len(), 8);
}

#[test]
fn cli_cleans_up_partition_files() {
    let dir = TempDir::new().unwrap();
    let fasta = write_fasta(&dir, &["ACGTACGTACGTACGT"]);
    let (output, _) = run_args(&dir, &fasta, &[]);
    assert!(output.status.success());

    let leftovers: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|entry| {
            let name = entry.unwrap().file_name().to_string_lossy().into_owned();
            name.contains("partition").then_some(name)
        })
        .collect();
    assert!(leftovers.is_empty(), "partition files left behind: {leftovers:?}");
}

#[test]
fn cli_reuses_a_binary_bank() {
    let dir = TempDir::new().unwrap();
    let fasta = write_fasta(&dir, &["ACGTACGT"]);
    let (output, _) = run_args(&dir, &fasta, &[]);
    assert!(output.status.success());

    // The conversion left a bank next to the FASTA; counting it directly
    // produces the same output size.
    let bank = PathBuf::from(format!("{}.bnk", fasta.display()));
    assert!(bank.exists());
    let out2 = dir.path().join("solid2.bin");
    let prefix = format!("{}/again.", dir.path().display());
    let output = kmersieve_cmd()
        .arg("3")
        .arg(&bank)
        .args(["--out", out2.to_str().unwrap()])
        .args(["--prefix", &prefix])
        .args(["--nks", "1"])
        .arg("--quiet")
        .output()
        .expect("Failed to execute");
    assert!(output.status.success());
    assert_eq!(std::fs::metadata(&out2).unwrap().len(), 16);
}

#[test]
fn cli_writes_statistics() {
    let dir = TempDir::new().unwrap();
    let fasta = write_fasta(&dir, &["ACGTACGT"]);
    let stats = dir.path().join("stats.json");
    let (output, _) = run_args(&dir, &fasta, &["--stats", stats.to_str().unwrap()]);
    assert!(output.status.success());

    let text = std::fs::read_to_string(&stats).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["config"]["kmer_size"], 3);
    assert_eq!(value["result"]["solid_kmers"], 2);
    assert!(value["time"].is_object());
}

#[test]
fn cli_nb_cores_does_not_change_output_size() {
    let dir = TempDir::new().unwrap();
    let fasta = write_fasta(&dir, &["ACGTACGTACGT", "GATTACAGATTACA"]);
    let (output_a, solid_a) = run_args(&dir, &fasta, &["--nb-cores", "1"]);
    assert!(output_a.status.success());
    let size_a = std::fs::metadata(&solid_a).unwrap().len();

    let dir_b = TempDir::new().unwrap();
    let fasta_b = write_fasta(&dir_b, &["ACGTACGTACGT", "GATTACAGATTACA"]);
    let (output_b, solid_b) = run_args(&dir_b, &fasta_b, &["--nb-cores", "4"]);
    assert!(output_b.status.success());
    let size_b = std::fs::metadata(&solid_b).unwrap().len();

    assert_eq!(size_a, size_b);
}
