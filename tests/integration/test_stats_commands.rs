//! End-to-end CLI tests for genome-size, stats and summarize.

use std::fs;

use minute_metrics::LibraryStats;
use minute_metrics::writer::read_metrics;
use tempfile::TempDir;

use crate::helpers::{arg, assert_failure_with, assert_success, run_minute};

const DUPLICATION: &str = "## htsjdk.samtools.metrics.StringHeader\n\
    # MarkDuplicates INPUT=[in.bam]\n\
    \n\
    ## METRICS CLASS\tpicard.sam.DuplicationMetrics\n\
    LIBRARY\tREAD_PAIRS_EXAMINED\tPERCENT_DUPLICATION\tESTIMATED_LIBRARY_SIZE\n\
    lib1\t1000\t0.125\t52000\n";

const INSERT_SIZE: &str = "## METRICS CLASS\tpicard.analysis.InsertSizeMetrics\n\
    MEDIAN_INSERT_SIZE\tMODE_INSERT_SIZE\n\
    187\t170\n";

#[test]
fn test_genome_size_counts_non_n_bases() {
    let dir = TempDir::new().unwrap();
    let fasta = dir.path().join("ref.fa");
    fs::write(&fasta, ">chr1\nACGTNNNN\nACGT\n>chr2\nnnGG\n").unwrap();
    let output_path = dir.path().join("size.txt");

    assert_success(&run_minute(["genome-size", "--fasta", arg(&fasta), "-o", arg(&output_path)]));
    assert_eq!(fs::read_to_string(&output_path).unwrap().trim(), "10");
}

#[test]
fn test_stats_then_summarize() {
    let dir = TempDir::new().unwrap();
    let path = |name: &str| dir.path().join(name);
    fs::write(path("dup.txt"), DUPLICATION).unwrap();
    fs::write(path("insert.txt"), INSERT_SIZE).unwrap();
    fs::write(path("mapped.txt"), "1000\n").unwrap();
    fs::write(path("dedup.txt"), "875\n").unwrap();
    fs::write(path("restricted.txt"), "800\n").unwrap();

    for (library, insert) in [("lib1", true), ("lib2", false)] {
        let out = path(&format!("{library}.stats.tsv"));
        let mut args = vec![
            "stats".to_string(),
            "--library".to_string(),
            library.to_string(),
            "--mapped".to_string(),
            arg(&path("mapped.txt")).to_string(),
            "--dedup".to_string(),
            arg(&path("dedup.txt")).to_string(),
            "--restricted".to_string(),
            arg(&path("restricted.txt")).to_string(),
            "--duplication-metrics".to_string(),
            arg(&path("dup.txt")).to_string(),
            "-o".to_string(),
            arg(&out).to_string(),
        ];
        if insert {
            args.push("--insert-size-metrics".to_string());
            args.push(arg(&path("insert.txt")).to_string());
        }
        assert_success(&run_minute(args));
    }

    let summary = path("summary.tsv");
    assert_success(&run_minute([
        "summarize",
        "-o",
        arg(&summary),
        arg(&path("lib1.stats.tsv")),
        arg(&path("lib2.stats.tsv")),
    ]));

    let rows: Vec<LibraryStats> = read_metrics(&summary).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].library, "lib1");
    assert_eq!(rows[0].mapped_reads, 1000);
    assert_eq!(rows[0].dedup_mapped_reads, 875);
    assert_eq!(rows[0].restricted_reads, 800);
    assert_eq!(rows[0].estimated_library_size, "52000");
    assert!((rows[0].percent_duplication - 12.5).abs() < 1e-9);
    assert_eq!(rows[0].median_insert_size, "187");
    assert_eq!(rows[1].library, "lib2");
    assert_eq!(rows[1].median_insert_size, "NA");
}

#[test]
fn test_stats_rejects_wrong_metrics_class() {
    let dir = TempDir::new().unwrap();
    let path = |name: &str| dir.path().join(name);
    fs::write(path("dup.txt"), INSERT_SIZE).unwrap();
    for name in ["mapped.txt", "dedup.txt", "restricted.txt"] {
        fs::write(path(name), "10\n").unwrap();
    }

    let output = run_minute([
        "stats",
        "--library",
        "lib1",
        "--mapped",
        arg(&path("mapped.txt")),
        "--dedup",
        arg(&path("dedup.txt")),
        "--restricted",
        arg(&path("restricted.txt")),
        "--duplication-metrics",
        arg(&path("dup.txt")),
        "-o",
        arg(&path("out.tsv")),
    ]);
    assert_failure_with(&output, "expected metrics class picard.sam.DuplicationMetrics");
    assert!(!path("out.tsv").exists());
}
