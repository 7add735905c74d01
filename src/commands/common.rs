//! Common CLI options shared across commands.
//!
//! This module provides shared argument structures that can be composed into
//! command structs using `#[command(flatten)]`.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use log::info;

use minute_lib::config::Config;
use minute_lib::header::ProgramInfo;
use minute_lib::validation::validate_file_exists;

use crate::version::VERSION;

/// Common input/output options for commands that read a BAM and write a BAM.
#[derive(Debug, Clone, Args)]
pub struct BamIoOptions {
    /// Input BAM file
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,

    /// Output BAM file
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
}

impl BamIoOptions {
    /// Validates that the input file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the input file does not exist.
    pub fn validate(&self) -> Result<()> {
        validate_file_exists(&self.input, "input")?;
        Ok(())
    }
}

/// Options controlling BAM output side files.
#[derive(Debug, Clone, Default, Args)]
pub struct OutputOptions {
    /// Optional output file for metrics
    #[arg(short = 'm', long = "metrics")]
    pub metrics: Option<PathBuf>,

    /// Do not write a BAI index for coordinate-sorted output
    #[arg(long = "no-index", default_value = "false")]
    pub no_index: bool,
}

impl OutputOptions {
    /// Whether a BAI index should be written.
    #[must_use]
    pub fn write_index(&self) -> bool {
        !self.no_index
    }
}

/// Optional run configuration.
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigOptions {
    /// Run configuration (YAML); command-line values take precedence over it
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
}

impl ConfigOptions {
    /// Loads and validates the configuration, if one was given.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid.
    pub fn load(&self) -> Result<Option<Config>> {
        match &self.config {
            Some(path) => {
                let config = Config::from_path(path)?;
                info!("Loaded configuration from {}", path.display());
                Ok(Some(config))
            }
            None => Ok(None),
        }
    }
}

/// Program information for the @PG record of an output BAM.
#[must_use]
pub fn program_info(command_line: &str) -> ProgramInfo {
    ProgramInfo::new(VERSION, command_line)
}
