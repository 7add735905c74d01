//! Compute the effective genome size of a reference FASTA.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::info;

use minute_lib::stats::compute_genome_size;
use minute_lib::validation::validate_file_exists;
use minute_metrics::format_count;

use crate::commands::command::Command;
use crate::commands::common::ConfigOptions;

/// Genome size command.
#[derive(Debug, Parser)]
#[command(
    name = "genome-size",
    about = "\x1b[38;5;180m[SCALING]\x1b[0m       \x1b[36mCount the non-N bases of a reference FASTA\x1b[0m",
    long_about = r#"
Counts the non-N bases of a reference FASTA and writes the count as a single
integer.

The FASTA is either given with --fasta or taken from the run configuration: with
--config, --reference names one of the configured references and may be left out
when only one is configured.
"#
)]
pub struct GenomeSize {
    /// Reference FASTA, optionally gzip compressed
    #[arg(short = 'r', long = "fasta", conflicts_with = "reference")]
    pub fasta: Option<PathBuf>,

    /// Name of a reference in the run configuration
    #[arg(short = 'n', long = "reference", requires = "config")]
    pub reference: Option<String>,

    /// Output file receiving the size as a single integer
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,

    /// Run configuration listing the references
    #[command(flatten)]
    pub config: ConfigOptions,
}

impl GenomeSize {
    /// The FASTA to measure: `--fasta`, or the configured reference.
    fn fasta_path(&self) -> Result<PathBuf> {
        if let Some(fasta) = &self.fasta {
            return Ok(fasta.clone());
        }
        let Some(config) = self.config.load()? else {
            bail!("No reference: pass --fasta, or --config with --reference");
        };
        let (name, reference) = config.reference(self.reference.as_deref())?;
        info!("Using reference '{name}' from the configuration");
        Ok(reference.fasta.clone())
    }
}

impl Command for GenomeSize {
    fn execute(&self, _command_line: &str) -> Result<()> {
        let fasta = self.fasta_path()?;
        validate_file_exists(&fasta, "fasta")?;
        let size = compute_genome_size(&fasta)?;
        info!("Genome size of {}: {} bases", fasta.display(), format_count(size));
        fs::write(&self.output, format!("{size}\n"))
            .with_context(|| format!("Failed to write genome size: {}", self.output.display()))?;
        Ok(())
    }
}
