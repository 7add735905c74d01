//! Diagnostic row written for each treatment/control pair by the scaling engine.

use serde::{Deserialize, Serialize};

use crate::Metric;

/// One audit row of the scaling report.
///
/// Optional fields are empty when the factor could not be computed for the pair.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingInfo {
    /// Name of the scaling group the pair belongs to.
    pub scaling_group: String,
    /// Treatment library or pool.
    pub treatment: String,
    /// Mapped reads of the treatment.
    pub treatment_reads: u64,
    /// Treatment reads multiplied by the scaling factor.
    pub scaled_treatment_reads: Option<f64>,
    /// Control library or pool.
    pub control: String,
    /// Mapped reads of the control.
    pub control_reads: u64,
    /// Control count used as the normalization basis.
    pub reference_control_reads: Option<u64>,
    /// Effective genome size.
    pub genome_size: u64,
    /// Fragment size.
    pub fragment_size: u64,
    /// The resulting scaling factor.
    pub scaling_factor: Option<f64>,
}

impl Metric for ScalingInfo {
    fn metric_name() -> &'static str {
        "scaling"
    }
}
