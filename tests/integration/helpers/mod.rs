//! Helper utilities for integration tests.

pub mod assertions;
pub mod bam_generator;

use std::path::Path;
use std::process::{Command, Output};

pub use assertions::*;
pub use bam_generator::*;

/// Runs `minute` with the given arguments.
pub fn run_minute<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    Command::new(env!("CARGO_BIN_EXE_minute"))
        .args(args)
        .output()
        .expect("Failed to run minute")
}

/// Path as a `&str` for command arguments.
pub fn arg(path: &Path) -> &str {
    path.to_str().expect("temporary paths are valid UTF-8")
}
