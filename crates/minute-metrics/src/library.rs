//! The per-library statistics row consumed by summary aggregation.
//!
//! The column order is fixed by the field order of [`LibraryStats`] and must not change.

use serde::{Deserialize, Serialize};

use crate::Metric;

/// One row of per-library statistics.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryStats {
    /// Library name.
    pub library: String,
    /// Mapped reads before duplicate removal.
    pub mapped_reads: u64,
    /// Mapped reads after duplicate removal.
    pub dedup_mapped_reads: u64,
    /// Deduplicated reads remaining after removing excluded regions.
    pub restricted_reads: u64,
    /// Picard's estimated library size, `NA` when Picard left it blank.
    pub estimated_library_size: String,
    /// Percentage of duplicated reads (0-100).
    pub percent_duplication: f64,
    /// Median insert size, `NA` when unavailable.
    pub median_insert_size: String,
}

impl Metric for LibraryStats {
    fn metric_name() -> &'static str {
        "library statistics"
    }
}
