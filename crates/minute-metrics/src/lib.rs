#![deny(unsafe_code)]

//! Structured metric types and TSV writer for minute.
//!
//! This crate provides:
//! - the [`Metric`] trait implemented by every serializable metric row
//! - metric rows for proxy projection, duplicate marking and propagation ([`dedup`])
//! - the fixed-schema per-library statistics row ([`library`])
//! - the scaling diagnostic row ([`scaling`])
//! - [`writer`] for TSV file output

pub mod dedup;
pub mod library;
pub mod scaling;
pub mod writer;

use serde::{Deserialize, Serialize};

/// Number of decimal places used for float metrics.
pub const FLOAT_PRECISION: usize = 6;

/// Formats a float value with the standard precision for metrics.
///
/// # Example
/// ```
/// use minute_metrics::format_float;
/// assert_eq!(format_float(0.9), "0.900000");
/// assert_eq!(format_float(15.0), "15.000000");
/// ```
#[must_use]
pub fn format_float(value: f64) -> String {
    format!("{value:.FLOAT_PRECISION$}")
}

/// Formats a count with thousands separators.
///
/// # Example
/// ```
/// use minute_metrics::format_count;
/// assert_eq!(format_count(1234567), "1,234,567");
/// assert_eq!(format_count(123), "123");
/// ```
#[must_use]
pub fn format_count(n: u64) -> String {
    let s = n.to_string();
    let mut out = String::with_capacity(s.len() + s.len() / 3);
    for (i, ch) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// A metric type that can be serialized to TSV files.
pub trait Metric: Serialize + for<'de> Deserialize<'de> + Clone + Default {
    /// Human-readable name for this metric type, used in error messages.
    fn metric_name() -> &'static str;
}

/// Fraction `part / whole`, or 0 when `whole` is zero.
#[must_use]
#[expect(clippy::cast_precision_loss, reason = "read counts never exceed 2^53")]
pub fn fraction(part: u64, whole: u64) -> f64 {
    if whole == 0 { 0.0 } else { part as f64 / whole as f64 }
}

pub use dedup::{ProjectionMetrics, PropagationMetrics, SingleEndDedupMetrics};
pub use library::LibraryStats;
pub use scaling::ScalingInfo;
pub use writer::{write_metrics, write_metrics_auto};
