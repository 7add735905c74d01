//! Compute scaling factors for the normalization pairs of one scaling group.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use log::info;

use minute_lib::experiment::{Experiment, GROUPS_FILE, LIBRARIES_FILE};
use minute_lib::logging::log_scaling_summary;
use minute_lib::scaling::{ReferenceKind, ReferencePolicy, compute_scaling, read_count};
use minute_lib::stats::read_int_from_file;
use minute_lib::validation::{validate_dir_exists, validate_same_length};
use minute_metrics::write_metrics_auto;

use crate::commands::command::Command;
use crate::commands::common::ConfigOptions;

/// Scaling factor command.
#[derive(Debug, Parser)]
#[command(
    name = "scale",
    about = "\x1b[38;5;180m[SCALING]\x1b[0m       \x1b[36mCompute scaling factors of a scaling group\x1b[0m",
    long_about = r#"
Computes one scaling factor per treatment/control pair of a scaling group:

    factor = genome_size / (fragment_size * T) * (C_reference / C)

where T and C are the mapped read counts of the treatment and its control and
C_reference is the normalization basis chosen by --policy:

- minimum-control: the smallest control count of the group (default)
- first-pair: the control count of the group's first pair
- first-pair-ratio: both counts of the first pair, so that
  factor = genome_size / fragment_size * (C_first / T_first) / C
- fixed: the value of --fixed-count (e.g. from a spike-in)

Counts are given in group order, one file per pair, each holding either a single
integer or `samtools flagstat` output. A factor file `<treatment>.scalefactor.txt`
is written for every pair, and --info receives one diagnostic row per pair. A pair
with zero treatment or control reads fails the command after the other pairs
have been written.
"#
)]
pub struct Scale {
    /// Library table
    #[arg(short = 'l', long = "libraries", default_value = LIBRARIES_FILE)]
    pub libraries: PathBuf,

    /// Scaling group table
    #[arg(short = 'g', long = "groups", default_value = GROUPS_FILE)]
    pub groups: PathBuf,

    /// Name of the scaling group
    #[arg(short = 'G', long = "group")]
    pub group: String,

    /// Treatment read count files, in group order
    #[arg(short = 't', long = "treatment-counts", num_args = 1.., required = true)]
    pub treatment_counts: Vec<PathBuf>,

    /// Control read count files, in group order
    #[arg(short = 'C', long = "control-counts", num_args = 1.., required = true)]
    pub control_counts: Vec<PathBuf>,

    /// File holding the effective genome size
    #[arg(short = 's', long = "genome-size")]
    pub genome_size: PathBuf,

    /// Fragment size (defaults to the configured fragment_size)
    #[arg(short = 'f', long = "fragment-size")]
    pub fragment_size: Option<u64>,

    /// Reference control count policy (defaults to the configured policy)
    #[arg(short = 'P', long = "policy", value_enum)]
    pub policy: Option<ReferenceKind>,

    /// Reference count for the fixed policy
    #[arg(long = "fixed-count")]
    pub fixed_count: Option<u64>,

    /// Directory for the `<treatment>.scalefactor.txt` files
    #[arg(short = 'd', long = "factors-dir", default_value = ".")]
    pub factors_dir: PathBuf,

    /// Output file for the per-pair scaling report
    #[arg(short = 'o', long = "info")]
    pub info: PathBuf,

    /// Optional run configuration (fragment_size and scaling section)
    #[command(flatten)]
    pub config: ConfigOptions,
}

impl Scale {
    fn resolve_policy(&self, configured: Option<ReferencePolicy>) -> Result<ReferencePolicy> {
        match self.policy {
            Some(kind) => ReferencePolicy::from_kind(kind, self.fixed_count)
                .map_err(|reason| anyhow!("Invalid --policy: {reason}")),
            None if self.fixed_count.is_some() => {
                ReferencePolicy::from_kind(ReferenceKind::Fixed, self.fixed_count)
                    .map_err(|reason| anyhow!("Invalid --fixed-count: {reason}"))
            }
            None => Ok(configured.unwrap_or_default()),
        }
    }
}

impl Command for Scale {
    fn execute(&self, _command_line: &str) -> Result<()> {
        validate_same_length(
            &self.treatment_counts,
            "treatment-counts",
            &self.control_counts,
            "control-counts",
        )?;
        validate_dir_exists(&self.factors_dir, "factors-dir")?;

        let config = self.config.load()?;
        let fragment_size = self
            .fragment_size
            .or(config.as_ref().map(|c| c.fragment_size))
            .context("No fragment size: pass --fragment-size or --config")?;
        let configured = config.as_ref().map(|c| c.scaling.policy()).transpose()?;
        let policy = self.resolve_policy(configured)?;
        info!("Fragment size: {fragment_size}, reference policy: {policy:?}");

        let experiment = Experiment::load(&self.libraries, &self.groups)?;
        let group = experiment
            .scaling_group(&self.group)
            .with_context(|| format!("Unknown scaling group '{}'", self.group))?;

        let genome_size = read_int_from_file(&self.genome_size)?;
        let treatment_counts =
            self.treatment_counts.iter().map(read_count).collect::<Result<Vec<_>, _>>()?;
        let control_counts =
            self.control_counts.iter().map(read_count).collect::<Result<Vec<_>, _>>()?;

        let report = compute_scaling(
            group,
            &treatment_counts,
            &control_counts,
            genome_size,
            fragment_size,
            policy,
        )?;
        log_scaling_summary(&report);

        report.write_factor_files(&self.factors_dir)?;
        write_metrics_auto(&self.info, &report.to_infos())?;

        let failed: Vec<String> = report.failures().map(|row| row.treatment.clone()).collect();
        if !failed.is_empty() {
            bail!("No scaling factor for: {}", failed.join(", "));
        }
        Ok(())
    }
}
