//! End-to-end CLI tests for the scale command.

use std::fs;
use std::path::Path;

use minute_metrics::ScalingInfo;
use minute_metrics::writer::read_metrics;
use tempfile::TempDir;

use crate::helpers::{arg, assert_failure_with, assert_success, run_minute};

fn setup(dir: &Path, treatment_reads: u64) {
    fs::write(dir.join("libraries.tsv"), "H3K4\t1\tACGTAC\tpoolA\nInput\t1\tGGGGGG\tpoolA\n")
        .unwrap();
    fs::write(dir.join("groups.tsv"), "H3K4\t1\tInput\tgroup1\n").unwrap();
    fs::write(dir.join("treatment.txt"), format!("{treatment_reads}\n")).unwrap();
    fs::write(dir.join("control.txt"), "500000\n").unwrap();
    fs::write(dir.join("genome_size.txt"), "3000000000\n").unwrap();
}

fn scale(dir: &Path) -> std::process::Output {
    run_minute([
        "scale",
        "-l",
        arg(&dir.join("libraries.tsv")),
        "-g",
        arg(&dir.join("groups.tsv")),
        "-G",
        "group1",
        "-t",
        arg(&dir.join("treatment.txt")),
        "-C",
        arg(&dir.join("control.txt")),
        "-s",
        arg(&dir.join("genome_size.txt")),
        "-f",
        "200",
        "-d",
        arg(dir),
        "-o",
        arg(&dir.join("scalinginfo.tsv")),
    ])
}

#[test]
fn test_scale_writes_factor_and_info() {
    let dir = TempDir::new().unwrap();
    setup(dir.path(), 1_000_000);
    assert_success(&scale(dir.path()));

    let factor: f64 = fs::read_to_string(dir.path().join("H3K4_rep1.scalefactor.txt"))
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    assert!((factor - 15.0).abs() < 1e-9, "factor = {factor}");

    let infos: Vec<ScalingInfo> = read_metrics(dir.path().join("scalinginfo.tsv")).unwrap();
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].scaling_group, "group1");
    assert_eq!(infos[0].treatment, "H3K4_rep1");
    assert_eq!(infos[0].control, "Input_rep1");
    assert_eq!(infos[0].reference_control_reads, Some(500_000));
}

#[test]
fn test_scale_zero_treatment_fails_after_writing_info() {
    let dir = TempDir::new().unwrap();
    setup(dir.path(), 0);

    let output = scale(dir.path());
    assert_failure_with(&output, "H3K4_rep1");
    assert!(!dir.path().join("H3K4_rep1.scalefactor.txt").exists());
    assert!(dir.path().join("scalinginfo.tsv").exists());
}

#[test]
fn test_scale_unknown_group() {
    let dir = TempDir::new().unwrap();
    setup(dir.path(), 1_000_000);
    let output = run_minute([
        "scale",
        "-l",
        arg(&dir.path().join("libraries.tsv")),
        "-g",
        arg(&dir.path().join("groups.tsv")),
        "-G",
        "nope",
        "-t",
        arg(&dir.path().join("treatment.txt")),
        "-C",
        arg(&dir.path().join("control.txt")),
        "-s",
        arg(&dir.path().join("genome_size.txt")),
        "-f",
        "200",
        "-o",
        arg(&dir.path().join("scalinginfo.tsv")),
    ]);
    assert_failure_with(&output, "Unknown scaling group 'nope'");
}
