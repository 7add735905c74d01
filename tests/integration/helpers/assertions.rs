//! Custom assertion helpers for integration tests.

#![allow(dead_code)]

use std::process::Output;

use noodles::sam::alignment::record_buf::RecordBuf;

/// Asserts that a command exited successfully, printing its stderr otherwise.
///
/// # Panics
///
/// Panics if the command failed.
pub fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "command failed with {}:\n{}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Asserts that a command failed and that its stderr contains `message`.
///
/// # Panics
///
/// Panics if the command succeeded or the message is missing.
pub fn assert_failure_with(output: &Output, message: &str) {
    assert!(!output.status.success(), "command unexpectedly succeeded");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains(message), "expected '{message}' in stderr:\n{stderr}");
}

/// Names of the records carrying the duplicate flag, in file order.
pub fn duplicate_names(records: &[RecordBuf]) -> Vec<String> {
    records
        .iter()
        .filter(|r| r.flags().is_duplicate())
        .map(|r| r.name().map(ToString::to_string).unwrap_or_default())
        .collect()
}
