//! Scaling factors for treatment/control normalization pairs.
//!
//! For a pair with treatment mapped count `T` and control mapped count `C`:
//!
//! ```text
//! factor = (genome_size / (fragment_size * T)) * (C_reference / C)
//! ```
//!
//! `C_reference` is the normalization basis shared by all pairs of a scaling group and is
//! chosen by a [`ReferencePolicy`]. Multiplying a treatment's coverage by its factor puts
//! all treatments of the group on a common quantitative scale.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::ValueEnum;
use log::{debug, warn};
use minute_metrics::ScalingInfo;
use serde::Deserialize;

use crate::errors::{MinuteError, Result};
use crate::experiment::ScalingGroup;

/// Reference policy names as they appear in the configuration and on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceKind {
    /// Smallest positive control count in the scaling group.
    #[default]
    MinimumControl,
    /// Control count of the first pair of the scaling group.
    FirstPair,
    /// Control/treatment ratio of the first pair, applied to every pair.
    FirstPairRatio,
    /// An externally supplied count, e.g. from a spike-in.
    Fixed,
}

/// How the reference control count of a scaling group is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReferencePolicy {
    /// Smallest positive control count in the scaling group.
    #[default]
    MinimumControl,
    /// Control count of the first pair of the scaling group; each pair keeps its own `T`.
    FirstPair,
    /// Both counts of the first pair form the basis:
    /// `factor = genome_size / fragment_size * (C_first / T_first) / C`.
    ///
    /// Factors of a group then differ only by their control counts.
    FirstPairRatio,
    /// A fixed, positive count.
    Fixed(u64),
}

/// Normalization basis of a scaling group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupBasis {
    /// The reference control count, `C_reference`.
    pub control_reads: u64,
    /// Treatment count replacing each pair's own `T`, if the policy fixes one.
    pub treatment_reads: Option<u64>,
}

impl ReferencePolicy {
    /// Builds a policy from its name and the optional fixed count.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if `fixed_count` is missing or zero for
    /// [`ReferenceKind::Fixed`], or given for another kind.
    pub fn from_kind(
        kind: ReferenceKind,
        fixed_count: Option<u64>,
    ) -> std::result::Result<Self, String> {
        match (kind, fixed_count) {
            (ReferenceKind::Fixed, Some(0)) => Err("fixed_count must be greater than zero".into()),
            (ReferenceKind::Fixed, Some(n)) => Ok(Self::Fixed(n)),
            (ReferenceKind::Fixed, None) => {
                Err("fixed_count is required for the fixed reference policy".into())
            }
            (_, Some(_)) => {
                Err("fixed_count is only allowed with the fixed reference policy".into())
            }
            (ReferenceKind::MinimumControl, None) => Ok(Self::MinimumControl),
            (ReferenceKind::FirstPair, None) => Ok(Self::FirstPair),
            (ReferenceKind::FirstPairRatio, None) => Ok(Self::FirstPairRatio),
        }
    }

    /// The normalization basis for a group with the given counts, or `None` if no pair
    /// has both a positive treatment and a positive control count.
    ///
    /// Pairs with a zero count cannot be scaled and never contribute to the basis.
    #[must_use]
    pub fn basis(self, treatment_counts: &[u64], control_counts: &[u64]) -> Option<GroupBasis> {
        let mut usable = treatment_counts
            .iter()
            .copied()
            .zip(control_counts.iter().copied())
            .filter(|&(t, c)| t > 0 && c > 0);
        let control_only = |control_reads| GroupBasis { control_reads, treatment_reads: None };
        match self {
            Self::MinimumControl => usable.map(|(_, c)| c).min().map(control_only),
            Self::FirstPair => usable.next().map(|(_, c)| control_only(c)),
            Self::FirstPairRatio => usable
                .next()
                .map(|(t, c)| GroupBasis { control_reads: c, treatment_reads: Some(t) }),
            Self::Fixed(n) => Some(control_only(n)),
        }
    }
}

/// Computes a single scaling factor.
///
/// # Errors
///
/// Returns [`MinuteError::InvalidParameter`] if the genome size, fragment size or reference
/// count is zero. Zero treatment or control counts are reported by [`compute_scaling`].
pub fn scaling_factor(
    treatment_reads: u64,
    control_reads: u64,
    reference_control_reads: u64,
    genome_size: u64,
    fragment_size: u64,
) -> Result<f64> {
    for (parameter, value) in [
        ("genome_size", genome_size),
        ("fragment_size", fragment_size),
        ("reference_control_reads", reference_control_reads),
        ("treatment_reads", treatment_reads),
        ("control_reads", control_reads),
    ] {
        if value == 0 {
            return Err(MinuteError::InvalidParameter {
                parameter: parameter.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
    }
    let factor = (genome_size as f64 / (fragment_size as f64 * treatment_reads as f64))
        * (reference_control_reads as f64 / control_reads as f64);
    Ok(factor)
}

/// The scaling outcome of one normalization pair.
#[derive(Debug)]
pub struct ScalingRow {
    /// Name of the scaling group.
    pub scaling_group: String,
    /// Treatment library or pool.
    pub treatment: String,
    /// Mapped treatment reads.
    pub treatment_reads: u64,
    /// Control library or pool.
    pub control: String,
    /// Mapped control reads.
    pub control_reads: u64,
    /// Normalization basis of the group.
    pub reference_control_reads: Option<u64>,
    /// Effective genome size.
    pub genome_size: u64,
    /// Fragment size.
    pub fragment_size: u64,
    /// The factor, or why it could not be computed.
    pub factor: Result<f64>,
}

impl ScalingRow {
    /// Treatment reads multiplied by the factor.
    #[must_use]
    pub fn scaled_treatment_reads(&self) -> Option<f64> {
        self.factor.as_ref().ok().map(|f| f * self.treatment_reads as f64)
    }

    /// The row as a metrics record.
    #[must_use]
    pub fn to_info(&self) -> ScalingInfo {
        ScalingInfo {
            scaling_group: self.scaling_group.clone(),
            treatment: self.treatment.clone(),
            treatment_reads: self.treatment_reads,
            scaled_treatment_reads: self.scaled_treatment_reads(),
            control: self.control.clone(),
            control_reads: self.control_reads,
            reference_control_reads: self.reference_control_reads,
            genome_size: self.genome_size,
            fragment_size: self.fragment_size,
            scaling_factor: self.factor.as_ref().ok().copied(),
        }
    }
}

/// Scaling factors of all pairs of one scaling group.
#[derive(Debug)]
pub struct ScalingReport {
    /// One row per normalization pair, in group order.
    pub rows: Vec<ScalingRow>,
}

impl ScalingReport {
    /// Rows whose factor could not be computed.
    pub fn failures(&self) -> impl Iterator<Item = &ScalingRow> {
        self.rows.iter().filter(|r| r.factor.is_err())
    }

    /// The report as metrics records.
    #[must_use]
    pub fn to_infos(&self) -> Vec<ScalingInfo> {
        self.rows.iter().map(ScalingRow::to_info).collect()
    }

    /// Writes `<treatment>.scalefactor.txt` into `dir` for every successful row.
    ///
    /// Returns the paths written.
    pub fn write_factor_files<P: AsRef<Path>>(&self, dir: P) -> anyhow::Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        let mut written = Vec::new();
        for row in &self.rows {
            let Ok(factor) = &row.factor else { continue };
            let path = dir.join(format!("{}.scalefactor.txt", row.treatment));
            fs::write(&path, format!("{factor}\n"))
                .with_context(|| format!("Failed to write scaling factor: {}", path.display()))?;
            written.push(path);
        }
        Ok(written)
    }
}

/// Computes the scaling factors of a scaling group.
///
/// `treatment_counts` and `control_counts` hold the mapped read counts of the group's
/// normalization pairs in order. A pair with a zero treatment or control count gets an
/// [`MinuteError::InsufficientCoverage`] row without affecting the other pairs.
///
/// # Errors
///
/// Returns [`MinuteError::Config`] if the genome or fragment size is zero and
/// [`MinuteError::InvalidParameter`] if the count slices do not match the group.
pub fn compute_scaling(
    group: &ScalingGroup,
    treatment_counts: &[u64],
    control_counts: &[u64],
    genome_size: u64,
    fragment_size: u64,
    policy: ReferencePolicy,
) -> Result<ScalingReport> {
    if genome_size == 0 {
        return Err(MinuteError::config("genome_size", "must be greater than zero"));
    }
    if fragment_size == 0 {
        return Err(MinuteError::config("fragment_size", "must be greater than zero"));
    }
    let pairs = &group.normalization_pairs;
    for (parameter, counts) in [("treatment_counts", treatment_counts), ("control_counts", control_counts)]
    {
        if counts.len() != pairs.len() {
            return Err(MinuteError::InvalidParameter {
                parameter: parameter.to_string(),
                reason: format!(
                    "scaling group '{}' has {} pairs but {} counts were given",
                    group.name,
                    pairs.len(),
                    counts.len()
                ),
            });
        }
    }

    let basis = policy.basis(treatment_counts, control_counts);
    debug!("Scaling group '{}' uses normalization basis {basis:?}", group.name);

    let rows = pairs
        .iter()
        .zip(treatment_counts.iter().zip(control_counts))
        .map(|(pair, (&treatment_reads, &control_reads))| {
            let factor = if treatment_reads == 0 {
                Err(MinuteError::InsufficientCoverage {
                    library: pair.treatment.name().to_string(),
                    role: "treatment",
                })
            } else if control_reads == 0 {
                Err(MinuteError::InsufficientCoverage {
                    library: pair.control.name().to_string(),
                    role: "control",
                })
            } else {
                match basis {
                    Some(basis) => scaling_factor(
                        basis.treatment_reads.unwrap_or(treatment_reads),
                        control_reads,
                        basis.control_reads,
                        genome_size,
                        fragment_size,
                    ),
                    None => Err(MinuteError::InsufficientCoverage {
                        library: pairs[0].control.name().to_string(),
                        role: "reference control",
                    }),
                }
            };
            if let Err(e) = &factor {
                warn!("No scaling factor for {}: {e}", pair.treatment.name());
            }
            ScalingRow {
                scaling_group: group.name.clone(),
                treatment: pair.treatment.name().to_string(),
                treatment_reads,
                control: pair.control.name().to_string(),
                control_reads,
                reference_control_reads: basis.map(|b| b.control_reads),
                genome_size,
                fragment_size,
                factor,
            }
        })
        .collect();

    Ok(ScalingReport { rows })
}

/// Reads a mapped read count.
///
/// The file either holds a single integer or is `samtools flagstat` output, in which case the
/// first number of the `mapped (` line is used.
///
/// # Errors
///
/// Returns [`MinuteError::Format`] if no count can be found.
pub fn read_count<P: AsRef<Path>>(path: P) -> Result<u64> {
    let path = path.as_ref();
    let format_error = |record: u64, reason: String| MinuteError::Format {
        path: path.to_path_buf(),
        record,
        reason,
    };
    let text = fs::read_to_string(path).map_err(|e| format_error(0, e.to_string()))?;

    if let Ok(count) = text.trim().parse::<u64>() {
        return Ok(count);
    }
    for (i, line) in text.lines().enumerate() {
        if line.contains(" mapped (") {
            let first = line.split_whitespace().next().unwrap_or_default();
            return first
                .parse::<u64>()
                .map_err(|e| format_error(i as u64, format!("bad mapped count '{first}': {e}")));
        }
    }
    Err(format_error(0, "neither a single integer nor flagstat output with a mapped line".into()))
}
