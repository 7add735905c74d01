//! End-to-end tests of duplicate marking by proxy.
//!
//! These tests run `minute proxy`, `minute dedup-proxy` and `minute propagate` in sequence
//! and validate the flags of the final paired-end alignments.

use std::path::{Path, PathBuf};

use minute_lib::bam_io::bai_path;
use minute_lib::sam::builder::{RecordBuilder, coordinate_sorted_header, read_bam, write_bam};
use minute_metrics::writer::read_metrics;
use minute_metrics::{ProjectionMetrics, PropagationMetrics, SingleEndDedupMetrics};
use tempfile::TempDir;

use crate::helpers::{
    Fragment, arg, assert_failure_with, assert_success, duplicate_names, run_minute,
    write_fragments_bam,
};

/// Three fragments share R1 position 100; two of them also share the UMI `AAAAAA`.
fn fragments() -> Vec<Fragment> {
    vec![
        Fragment::new("a", "AAAAAA", 100, 300),
        Fragment::new("b", "AAAAAA", 100, 300).quality(20),
        Fragment::new("c", "CCCCCC", 100, 300),
        Fragment::new("d", "AAAAAA", 500, 700),
    ]
}

struct Pipeline {
    _dir: TempDir,
    input: PathBuf,
    proxy: PathBuf,
    marked: PathBuf,
    output: PathBuf,
}

impl Pipeline {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let path = |name: &str| dir.path().join(name);
        let (input, proxy, marked, output) =
            (path("input.bam"), path("proxy.bam"), path("marked.bam"), path("output.bam"));
        write_fragments_bam(&input, &fragments());
        Self { _dir: dir, input, proxy, marked, output }
    }

    fn metrics(&self, name: &str) -> PathBuf {
        self.input.with_file_name(name)
    }

    fn project(&self) {
        assert_success(&run_minute([
            "proxy",
            "-i",
            arg(&self.input),
            "-o",
            arg(&self.proxy),
            "-m",
            arg(&self.metrics("proxy.tsv")),
        ]));
    }

    fn dedup(&self) {
        assert_success(&run_minute([
            "dedup-proxy",
            "-i",
            arg(&self.proxy),
            "-o",
            arg(&self.marked),
            "--umi-length",
            "6",
            "--umi-mismatches",
            "1",
            "-m",
            arg(&self.metrics("dedup.tsv")),
        ]));
    }

    fn propagate(&self, extra: &[&str]) {
        let metrics = self.metrics("propagate.tsv");
        let mut args = vec![
            "propagate",
            "-i",
            arg(&self.input),
            "-p",
            arg(&self.marked),
            "-o",
            arg(&self.output),
            "-m",
            arg(&metrics),
        ];
        args.extend_from_slice(extra);
        assert_success(&run_minute(args));
    }
}

fn names(path: &Path) -> Vec<String> {
    let (_, records) = read_bam(path).unwrap();
    records.iter().map(|r| r.name().unwrap().to_string()).collect()
}

#[test]
fn test_proxy_writes_one_record_per_fragment() {
    let pipeline = Pipeline::new();
    pipeline.project();

    assert_eq!(
        names(&pipeline.proxy),
        vec!["a_AAAAAA_1p", "b_AAAAAA_1p", "c_CCCCCC_1p", "d_AAAAAA_1p"]
    );
    let (_, records) = read_bam(&pipeline.proxy).unwrap();
    assert!(records.iter().all(|r| !r.flags().is_segmented()));
    assert!(bai_path(&pipeline.proxy).exists());

    let metrics: Vec<ProjectionMetrics> = read_metrics(pipeline.metrics("proxy.tsv")).unwrap();
    assert_eq!(metrics[0].records, 8);
    assert_eq!(metrics[0].fragments, 4);
    assert_eq!(metrics[0].dropped_unmapped, 0);
}

#[test]
fn test_full_pipeline_marks_both_reads_of_duplicate_fragment() {
    let pipeline = Pipeline::new();
    pipeline.project();
    pipeline.dedup();

    let (_, marked) = read_bam(&pipeline.marked).unwrap();
    assert_eq!(duplicate_names(&marked), vec!["b_AAAAAA_1p"]);
    let dedup: Vec<SingleEndDedupMetrics> = read_metrics(pipeline.metrics("dedup.tsv")).unwrap();
    assert_eq!(dedup[0].total, 4);
    assert_eq!(dedup[0].duplicates, 1);

    pipeline.propagate(&[]);
    let (_, output) = read_bam(&pipeline.output).unwrap();
    assert_eq!(output.len(), 8);
    assert_eq!(duplicate_names(&output), vec!["b_AAAAAA", "b_AAAAAA"]);
    assert!(bai_path(&pipeline.output).exists());

    let metrics: Vec<PropagationMetrics> =
        read_metrics(pipeline.metrics("propagate.tsv")).unwrap();
    assert_eq!(metrics[0].proxy_fragments, 4);
    assert_eq!(metrics[0].proxy_duplicates, 1);
    assert_eq!(metrics[0].duplicate_records, 2);
    assert_eq!(metrics[0].unmatched_records, 0);
}

#[test]
fn test_full_pipeline_remove_duplicates() {
    let pipeline = Pipeline::new();
    pipeline.project();
    pipeline.dedup();
    pipeline.propagate(&["--remove-duplicates", "--no-index"]);

    let output = names(&pipeline.output);
    assert_eq!(output.len(), 6);
    assert!(!output.iter().any(|n| n == "b_AAAAAA"));
    assert!(!bai_path(&pipeline.output).exists());
}

#[test]
fn test_propagate_rejects_ambiguous_proxy() {
    let pipeline = Pipeline::new();
    let header = coordinate_sorted_header(&[("chr1", 100_000)]);
    let proxy = |start: usize| {
        RecordBuilder::mapped_read()
            .name("a_AAAAAA_1p")
            .sequence("ACGTACGT")
            .reference_sequence_id(0)
            .alignment_start(start)
            .build()
    };
    write_bam(&pipeline.marked, &header, &[proxy(100), proxy(120)]).unwrap();

    let output = run_minute([
        "propagate",
        "-i",
        arg(&pipeline.input),
        "-p",
        arg(&pipeline.marked),
        "-o",
        arg(&pipeline.output),
    ]);
    assert_failure_with(&output, "a_AAAAAA_1p");
    assert_failure_with(&output, "occurs 2 times");
    assert!(!pipeline.output.exists());
    assert!(!bai_path(&pipeline.output).exists());
}

#[test]
fn test_proxy_missing_input() {
    let dir = TempDir::new().unwrap();
    let output = run_minute([
        "proxy",
        "-i",
        arg(&dir.path().join("missing.bam")),
        "-o",
        arg(&dir.path().join("proxy.bam")),
    ]);
    assert_failure_with(&output, "file does not exist");
    assert!(!dir.path().join("proxy.bam").exists());
}
