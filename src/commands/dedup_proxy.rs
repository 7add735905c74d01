//! Mark duplicates on a single-end proxy BAM.

use anyhow::Result;
use clap::Parser;
use log::info;

use minute_lib::logging::log_dedup_summary;
use minute_lib::se_dedup::{DedupParams, SingleEndDedupOptions, mark_duplicates_se};
use minute_lib::validation::validate_positive;
use minute_metrics::write_metrics_auto;

use crate::commands::command::Command;
use crate::commands::common::{BamIoOptions, ConfigOptions, OutputOptions, program_info};

/// Single-end duplicate marking command.
#[derive(Debug, Parser)]
#[command(
    name = "dedup-proxy",
    about = "\x1b[38;5;151m[DEDUP]\x1b[0m         \x1b[36mMark UMI-aware duplicates on single-end proxies\x1b[0m",
    long_about = r#"
Marks duplicates on a single-end BAM, typically the output of `minute proxy`.

Reads are grouped by reference, unclipped 5' position and strand. The UMI is the
last --umi-length characters of the read name (any proxy suffix is ignored).
UMIs at one position are clustered with the directional method; in each cluster
the read with the highest sum of base qualities among those carrying the most
abundant UMI is kept and all others are marked.

Reads with a mapping quality below --multimap-cutoff are counted but never
marked. Values not given on the command line are taken from --config, then from
the defaults (6, 1 and 5).
"#
)]
pub struct DedupProxy {
    /// Input and output BAM files
    #[command(flatten)]
    pub io: BamIoOptions,

    /// Number of trailing read-name characters holding the UMI
    #[arg(short = 'u', long = "umi-length")]
    pub umi_length: Option<usize>,

    /// Maximum number of mismatches for two UMIs to be merged
    #[arg(short = 'e', long = "umi-mismatches")]
    pub umi_mismatches: Option<u32>,

    /// Reads with a mapping quality below this are never marked
    #[arg(short = 'q', long = "multimap-cutoff")]
    pub multimap_cutoff: Option<u8>,

    /// Remove duplicates instead of just marking them
    #[arg(short = 'r', long = "remove-duplicates", default_value = "false")]
    pub remove_duplicates: bool,

    /// Metrics and index options
    #[command(flatten)]
    pub output: OutputOptions,

    /// Optional run configuration (umi_length and dedup section)
    #[command(flatten)]
    pub config: ConfigOptions,
}

impl DedupProxy {
    fn params(&self, base: DedupParams) -> DedupParams {
        DedupParams {
            umi_length: self.umi_length.unwrap_or(base.umi_length),
            umi_mismatches: self.umi_mismatches.unwrap_or(base.umi_mismatches),
            multimap_cutoff: self.multimap_cutoff.unwrap_or(base.multimap_cutoff),
        }
    }
}

impl Command for DedupProxy {
    fn execute(&self, command_line: &str) -> Result<()> {
        self.io.validate()?;
        let config = self.config.load()?;
        let base = config.as_ref().map(DedupParams::from_config).unwrap_or_default();
        let params = self.params(base);
        validate_positive(params.umi_length, "umi-length")?;
        info!(
            "UMI length: {}, UMI mismatches: {}, multimap cutoff: {}",
            params.umi_length, params.umi_mismatches, params.multimap_cutoff
        );

        let remove_duplicates =
            self.remove_duplicates || config.as_ref().is_some_and(|c| c.dedup.remove_duplicates);
        let options = SingleEndDedupOptions {
            params,
            remove_duplicates,
            write_index: self.output.write_index(),
            program: Some(program_info(command_line)),
        };
        let metrics = mark_duplicates_se(&self.io.input, &self.io.output, &options)?;
        log_dedup_summary(&metrics);

        if let Some(path) = &self.output.metrics {
            write_metrics_auto(path, &[metrics])?;
        }
        Ok(())
    }
}
