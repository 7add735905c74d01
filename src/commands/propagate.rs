//! Propagate proxy duplicate verdicts onto the original paired-end alignments.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use minute_lib::logging::log_propagation_summary;
use minute_lib::proxy::{PropagationOptions, propagate_bam};
use minute_lib::validation::validate_file_exists;
use minute_metrics::write_metrics_auto;

use crate::commands::command::Command;
use crate::commands::common::{BamIoOptions, OutputOptions, program_info};

/// Duplicate propagation command.
#[derive(Debug, Parser)]
#[command(
    name = "propagate",
    about = "\x1b[38;5;151m[DEDUP]\x1b[0m         \x1b[36mCopy proxy duplicate flags back to paired-end alignments\x1b[0m",
    long_about = r#"
Sets the duplicate flag of every record of the input (target) BAM from the
verdict of its fragment's proxy in the deduplicated proxy BAM.

Both mates and all secondary and supplementary records of a fragment receive
the same verdict. Records whose fragment has no proxy (for example fragments
dropped during projection) are written as non-duplicates. A proxy identifier
that occurs more than once in the proxy BAM is an error.
"#
)]
pub struct Propagate {
    /// Target BAM file and output BAM file
    #[command(flatten)]
    pub io: BamIoOptions,

    /// Deduplicated proxy BAM file
    #[arg(short = 'p', long = "proxy")]
    pub proxy: PathBuf,

    /// Remove duplicates instead of just marking them
    #[arg(short = 'r', long = "remove-duplicates", default_value = "false")]
    pub remove_duplicates: bool,

    /// Metrics and index options
    #[command(flatten)]
    pub output: OutputOptions,
}

impl Command for Propagate {
    fn execute(&self, command_line: &str) -> Result<()> {
        self.io.validate()?;
        validate_file_exists(&self.proxy, "proxy")?;

        let options = PropagationOptions {
            remove_duplicates: self.remove_duplicates,
            write_index: self.output.write_index(),
            program: Some(program_info(command_line)),
        };
        let metrics = propagate_bam(&self.io.input, &self.proxy, &self.io.output, &options)?;
        log_propagation_summary(&metrics);

        if let Some(path) = &self.output.metrics {
            write_metrics_auto(path, &[metrics])?;
        }
        Ok(())
    }
}
