//! Combine per-library statistics into one table.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

use minute_lib::stats::summarize;
use minute_lib::validation::validate_file_exists;

use crate::commands::command::Command;

/// Statistics summary command.
#[derive(Debug, Parser)]
#[command(
    name = "summarize",
    about = "\x1b[38;5;180m[STATS]\x1b[0m         \x1b[36mCombine per-library statistics into one table\x1b[0m"
)]
pub struct Summarize {
    /// Output summary table
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,

    /// Statistics files written by `minute stats`, in output order
    #[arg(required = true)]
    pub stats: Vec<PathBuf>,
}

impl Command for Summarize {
    fn execute(&self, _command_line: &str) -> Result<()> {
        for path in &self.stats {
            validate_file_exists(path, "stats")?;
        }
        let rows = summarize(&self.stats, &self.output)?;
        info!("Wrote {} libraries to {}", rows.len(), self.output.display());
        Ok(())
    }
}
