//! Metrics for proxy projection, single-end duplicate marking and propagation.

use serde::{Deserialize, Serialize};

use crate::{Metric, fraction};

/// Counts collected while projecting paired-end records to single-end proxies.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionMetrics {
    /// Records read from the paired-end input.
    pub records: u64,
    /// Fragments for which a proxy record was written.
    pub fragments: u64,
    /// Representative records dropped because the mate was unmapped.
    pub dropped_unmapped: u64,
    /// Primary records of fragments with no mapped segment.
    pub unmapped_records: u64,
    /// Secondary and supplementary records, which are never projected.
    pub secondary_or_supplementary: u64,
}

impl Metric for ProjectionMetrics {
    fn metric_name() -> &'static str {
        "proxy projection"
    }
}

/// Summary of single-end duplicate marking on a proxy BAM.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleEndDedupMetrics {
    /// Mapped primary records considered.
    pub total: u64,
    /// Records marked as duplicates.
    pub duplicates: u64,
    /// Records below the multimapping cutoff (never marked).
    pub multimappers: u64,
    /// Distinct (reference, 5' position, strand) keys.
    pub positions: u64,
    /// `duplicates / total`.
    pub fraction_duplication: f64,
}

impl SingleEndDedupMetrics {
    /// Recomputes the derived fraction from the counts.
    pub fn finalize(&mut self) {
        self.fraction_duplication = fraction(self.duplicates, self.total);
    }
}

impl Metric for SingleEndDedupMetrics {
    fn metric_name() -> &'static str {
        "single-end duplicate marking"
    }
}

/// Counts collected while propagating proxy verdicts onto the paired-end target.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationMetrics {
    /// Proxy identifiers loaded into the verdict index.
    pub proxy_fragments: u64,
    /// Proxy identifiers carrying a duplicate verdict.
    pub proxy_duplicates: u64,
    /// Target records read.
    pub records: u64,
    /// Target records flagged as duplicates.
    pub duplicate_records: u64,
    /// Target records with no proxy entry, passed through as non-duplicates.
    pub unmatched_records: u64,
    /// Duplicate records left out of the output.
    pub removed_records: u64,
}

impl Metric for PropagationMetrics {
    fn metric_name() -> &'static str {
        "duplicate propagation"
    }
}
