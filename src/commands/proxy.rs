//! Project paired-end alignments to single-end proxy records.

use anyhow::Result;
use clap::Parser;
use log::info;

use minute_lib::logging::log_projection_summary;
use minute_lib::proxy::{ProjectionOptions, project_bam};
use minute_metrics::write_metrics_auto;

use crate::commands::command::Command;
use crate::commands::common::{BamIoOptions, ConfigOptions, OutputOptions, program_info};

/// Proxy projection command.
#[derive(Debug, Parser)]
#[command(
    name = "proxy",
    about = "\x1b[38;5;151m[DEDUP]\x1b[0m         \x1b[36mProject paired-end alignments to single-end proxies\x1b[0m",
    long_about = r#"
Writes one single-end proxy record per fragment so that a single-end duplicate
caller can be applied to paired-end data.

The proxy is made from the first segment when it is mapped, otherwise from the
mapped last segment (only with --keep-unmapped). It keeps that record's position,
strand, CIGAR, sequence and qualities, and is renamed to
`<name>_<segment><pairing>` (for example `read1_1p`) so that duplicate verdicts
can be propagated back with `minute propagate`.

Secondary and supplementary records and fragments without any mapped segment
are never projected. Output order equals input order.
"#
)]
pub struct Proxy {
    /// Input and output BAM files
    #[command(flatten)]
    pub io: BamIoOptions,

    /// Also project fragments whose mate is unmapped
    #[arg(short = 'k', long = "keep-unmapped", default_value = "false")]
    pub keep_unmapped: bool,

    /// Metrics and index options
    #[command(flatten)]
    pub output: OutputOptions,

    /// Optional run configuration (dedup.keep_unmapped)
    #[command(flatten)]
    pub config: ConfigOptions,
}

impl Command for Proxy {
    fn execute(&self, command_line: &str) -> Result<()> {
        self.io.validate()?;
        let config = self.config.load()?;
        let keep_unmapped =
            self.keep_unmapped || config.as_ref().is_some_and(|c| c.dedup.keep_unmapped);
        info!("Keep fragments with unmapped mate: {keep_unmapped}");

        let options = ProjectionOptions {
            keep_unmapped,
            write_index: self.output.write_index(),
            program: Some(program_info(command_line)),
        };
        let metrics = project_bam(&self.io.input, &self.io.output, &options)?;
        log_projection_summary(&metrics);

        if let Some(path) = &self.output.metrics {
            write_metrics_auto(path, &[metrics])?;
        }
        Ok(())
    }
}
