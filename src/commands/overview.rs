//! Validate the experiment description and print an overview.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

use minute_lib::experiment::{Experiment, GROUPS_FILE, LIBRARIES_FILE};

use crate::commands::command::Command;
use crate::commands::common::ConfigOptions;

/// Experiment overview command.
#[derive(Debug, Parser)]
#[command(
    name = "overview",
    about = "\x1b[38;5;180m[EXPERIMENT]\x1b[0m    \x1b[36mValidate the experiment description and print an overview\x1b[0m",
    long_about = r#"
Reads the library table and the scaling group table, derives the pools of samples
with more than one replicate, resolves every treatment/control pair and prints
the libraries, pools, scaling groups and FASTQ files of the experiment.

Any inconsistency (missing replicate, unknown control, a pool of a sample with a
single replicate, ...) fails the command before any file is written.
"#
)]
pub struct Overview {
    /// Library table (sample, replicate, barcode, fastqbase)
    #[arg(short = 'l', long = "libraries", default_value = LIBRARIES_FILE)]
    pub libraries: PathBuf,

    /// Scaling group table (treatment, replicate, control, scaling group)
    #[arg(short = 'g', long = "groups", default_value = GROUPS_FILE)]
    pub groups: PathBuf,

    /// Optional run configuration to validate alongside the tables
    #[command(flatten)]
    pub config: ConfigOptions,
}

impl Command for Overview {
    fn execute(&self, _command_line: &str) -> Result<()> {
        if let Some(config) = self.config.load()? {
            info!(
                "Configuration: {} reference(s), fragment size {}, UMI length {}",
                config.references.len(),
                config.fragment_size,
                config.umi_length
            );
        }
        let experiment = Experiment::load(&self.libraries, &self.groups)?;
        info!(
            "{} libraries, {} pools, {} scaling groups",
            experiment.libraries.len(),
            experiment.pools.len(),
            experiment.scaling_groups.len()
        );
        print!("{}", experiment.overview());
        Ok(())
    }
}
