//! Run configuration (`minute.yaml`).
//!
//! ```yaml
//! references:
//!   hg38:
//!     fasta: ref/hg38.fa.gz
//!     exclude: ref/hg38.exclude.bed
//! fragment_size: 150
//! umi_length: 6
//! dedup:
//!   keep_unmapped: false
//!   umi_mismatches: 1
//!   multimap_cutoff: 5
//! scaling:
//!   reference: minimum-control
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::{MinuteError, Result};
use crate::scaling::{ReferenceKind, ReferencePolicy};

/// A reference genome the libraries are aligned to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Reference {
    /// Path to the (optionally gzip-compressed) FASTA.
    pub fasta: PathBuf,
    /// BED file of regions excluded from the restricted read counts.
    ///
    /// The restricted counts are produced outside minute; this path is only checked for
    /// being non-empty.
    #[serde(default)]
    pub exclude: Option<PathBuf>,
}

/// Duplicate-marking options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DedupConfig {
    /// Project fragments whose mate is unmapped instead of dropping them.
    pub keep_unmapped: bool,
    /// Maximum Hamming distance for two UMIs to be merged.
    pub umi_mismatches: u32,
    /// Reads with a mapping quality below this are never marked as duplicates.
    pub multimap_cutoff: u8,
    /// Drop duplicates from the output instead of flagging them.
    pub remove_duplicates: bool,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self { keep_unmapped: false, umi_mismatches: 1, multimap_cutoff: 5, remove_duplicates: false }
    }
}

/// Scaling options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ScalingConfig {
    /// How the reference control count of a scaling group is chosen.
    pub reference: ReferenceKind,
    /// Reference count for [`ReferenceKind::Fixed`].
    pub fixed_count: Option<u64>,
}

impl ScalingConfig {
    /// Resolves the configured reference policy.
    ///
    /// # Errors
    ///
    /// Returns [`MinuteError::Config`] if `fixed_count` is missing or zero for the `fixed`
    /// policy, or set for any other policy.
    pub fn policy(&self) -> Result<ReferencePolicy> {
        ReferencePolicy::from_kind(self.reference, self.fixed_count)
            .map_err(|reason| MinuteError::config("scaling", reason))
    }
}

fn default_umi_length() -> usize {
    6
}

/// The complete run configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Reference genomes by name.
    pub references: BTreeMap<String, Reference>,
    /// Average fragment size used in the scaling factor.
    pub fragment_size: u64,
    /// Number of trailing read-name characters holding the UMI.
    #[serde(default = "default_umi_length")]
    pub umi_length: usize,
    /// Duplicate-marking options.
    #[serde(default)]
    pub dedup: DedupConfig,
    /// Scaling options.
    #[serde(default)]
    pub scaling: ScalingConfig,
}

impl Config {
    /// Parses and validates a configuration from YAML text.
    ///
    /// `source_name` is used in error messages.
    pub fn from_yaml(text: &str, source_name: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(text)
            .map_err(|e| MinuteError::config(source_name, e.to_string()))?;
        config.validate().map_err(|e| match e {
            MinuteError::Config { source_name: field, reason } => {
                MinuteError::config(source_name, format!("{field}: {reason}"))
            }
            other => other,
        })?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source_name = path.display().to_string();
        let text = fs::read_to_string(path)
            .map_err(|e| MinuteError::config(&source_name, format!("cannot read file: {e}")))?;
        Self::from_yaml(&text, &source_name)
    }

    /// The reference named `name`, or the only reference when no name is given.
    ///
    /// # Errors
    ///
    /// Returns [`MinuteError::Config`] if the name is unknown, or if no name is given and
    /// more than one reference is configured.
    pub fn reference(&self, name: Option<&str>) -> Result<(&str, &Reference)> {
        let known = || self.references.keys().cloned().collect::<Vec<_>>().join(", ");
        match name {
            Some(name) => self
                .references
                .get_key_value(name)
                .map(|(k, v)| (k.as_str(), v))
                .ok_or_else(|| {
                    MinuteError::config(
                        "references",
                        format!("unknown reference '{name}' (known: {})", known()),
                    )
                }),
            None => match self.references.iter().next() {
                Some((k, v)) if self.references.len() == 1 => Ok((k.as_str(), v)),
                _ => Err(MinuteError::config(
                    "references",
                    format!("several references are configured, choose one of: {}", known()),
                )),
            },
        }
    }

    /// Checks constraints that span more than one field.
    ///
    /// # Errors
    ///
    /// Returns [`MinuteError::Config`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.references.is_empty() {
            return Err(MinuteError::config("references", "at least one reference is required"));
        }
        for (name, reference) in &self.references {
            if reference.fasta.as_os_str().is_empty() {
                return Err(MinuteError::config(
                    format!("references.{name}.fasta"),
                    "path must not be empty",
                ));
            }
        }
        if self.fragment_size == 0 {
            return Err(MinuteError::config("fragment_size", "must be greater than zero"));
        }
        self.scaling.policy()?;
        Ok(())
    }
}
