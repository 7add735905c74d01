//! SAM/BAM record and header utilities.
//!
//! - [`record_utils`]: CIGAR-aware positions and record scores
//! - [`builder`]: fluent construction of records and headers for tests

pub mod builder;
pub mod record_utils;

use std::path::Path;

use log::warn;
use noodles::sam::Header;
use noodles::sam::header::record::value::map::header::sort_order::COORDINATE;

pub use record_utils::{quality_sum, unclipped_five_prime_position};

/// Checks if a BAM file has a specified sort order according to its header.
///
/// Examines the SAM header for the SO (sort order) tag and compares it to the
/// specified sort order.
#[must_use]
pub fn is_sorted(header: &Header, sort_order: &[u8]) -> bool {
    if let Some(hdr_map) = header.header() {
        hdr_map
            .other_fields()
            .get(b"SO")
            .is_some_and(|so| <_ as AsRef<[u8]>>::as_ref(so) == sort_order)
    } else {
        false
    }
}

/// Whether the header declares `SO:coordinate`.
#[must_use]
pub fn is_coordinate_sorted(header: &Header) -> bool {
    is_sorted(header, COORDINATE)
}

/// Logs a warning if the header does not declare coordinate sorting.
pub fn check_coordinate_sort(header: &Header, path: &Path, name: &str) {
    if !is_coordinate_sorted(header) {
        warn!(
            "{name} file {} does not appear to be coordinate sorted per the SAM header.",
            path.display()
        );
        warn!("Continuing, but no index will be written for its output.");
    }
}
