//! End-to-end CLI tests for the overview command.

use std::fs;

use tempfile::TempDir;

use crate::helpers::{arg, assert_failure_with, assert_success, run_minute};

fn write_tables(dir: &TempDir, libraries: &str, groups: &str) {
    fs::write(dir.path().join("libraries.tsv"), libraries).unwrap();
    fs::write(dir.path().join("groups.tsv"), groups).unwrap();
}

#[test]
fn test_overview_lists_pools_and_pairs() {
    let dir = TempDir::new().unwrap();
    write_tables(
        &dir,
        "# sample\treplicate\tbarcode\tfastqbase\n\
         H3K4\t1\tACGTAC\tpoolA\n\
         H3K4\t2\tTGCATG\tpoolA\n\
         Input\t1\tGGGGGG\tpoolA\n",
        "H3K4\t1\tInput\tgroup1\n\
         H3K4\tpooled\tInput\tgroup1\n",
    );

    let output = run_minute([
        "overview",
        "-l",
        arg(&dir.path().join("libraries.tsv")),
        "-g",
        arg(&dir.path().join("groups.tsv")),
    ]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("H3K4_pooled"), "{stdout}");
    assert!(stdout.contains(" - H3K4_rep1 -- Input_rep1"), "{stdout}");
    assert!(stdout.contains(" - H3K4_pooled -- Input_rep1"), "{stdout}");
}

#[test]
fn test_overview_missing_replicate_fails_without_output() {
    let dir = TempDir::new().unwrap();
    write_tables(&dir, "H3K4\t1\tACGTAC\tpoolA\nH3K27\t\tTTTTTT\tpoolA\n", "H3K4\t1\tH3K27\tg\n");

    let output = run_minute([
        "overview",
        "-l",
        arg(&dir.path().join("libraries.tsv")),
        "-g",
        arg(&dir.path().join("groups.tsv")),
    ]);
    assert_failure_with(&output, "missing a replicate");
    assert_failure_with(&output, "H3K27");
    assert!(output.stdout.is_empty());
}

#[test]
fn test_overview_rejects_pool_of_single_replicate() {
    let dir = TempDir::new().unwrap();
    write_tables(
        &dir,
        "H3K4\t1\tACGTAC\tpoolA\nInput\t1\tGGGGGG\tpoolA\n",
        "H3K4\tpooled\tInput\tg\n",
    );

    let output = run_minute([
        "overview",
        "-l",
        arg(&dir.path().join("libraries.tsv")),
        "-g",
        arg(&dir.path().join("groups.tsv")),
    ]);
    assert_failure_with(&output, "single replicate");
}
