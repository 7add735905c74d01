//! Formatting helpers and summary logging for minute's operations.

use std::time::{Duration, Instant};

use minute_metrics::{ProjectionMetrics, PropagationMetrics, SingleEndDedupMetrics, format_count};

use crate::scaling::ScalingReport;

/// Formats a fraction as a percentage with the given number of decimals.
///
/// ```
/// use minute_lib::logging::format_percent;
///
/// assert_eq!(format_percent(0.9543, 2), "95.43%");
/// assert_eq!(format_percent(1.0, 0), "100%");
/// ```
#[must_use]
pub fn format_percent(value: f64, decimals: usize) -> String {
    format!("{:.decimals$}%", value * 100.0, decimals = decimals)
}

/// Formats a duration as `45s`, `2m 15s` or `1h 30m`.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        let mins = secs / 60;
        let remaining_secs = secs % 60;
        if remaining_secs == 0 { format!("{mins}m") } else { format!("{mins}m {remaining_secs}s") }
    } else {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        if mins == 0 { format!("{hours}h") } else { format!("{hours}h {mins}m") }
    }
}

/// Formats a throughput in records per second.
#[must_use]
pub fn format_rate(count: u64, duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 0.001 {
        return format!("{} records/s", format_count(count));
    }
    let rate = count as f64 / secs;
    if rate >= 1.0 {
        format!("{} records/s", format_count(rate as u64))
    } else {
        format!("{:.1} records/min", count as f64 / (secs / 60.0))
    }
}

fn percent_of(part: u64, whole: u64) -> String {
    format_percent(minute_metrics::fraction(part, whole), 2)
}

/// Logs the outcome of projecting paired-end records to proxies.
pub fn log_projection_summary(metrics: &ProjectionMetrics) {
    log::info!("Proxy Projection Summary:");
    log::info!("  Records read: {}", format_count(metrics.records));
    log::info!("  Proxies written: {}", format_count(metrics.fragments));
    log::info!("  Dropped (mate unmapped): {}", format_count(metrics.dropped_unmapped));
    if metrics.unmapped_records > 0 {
        log::info!("  Unmapped records: {}", format_count(metrics.unmapped_records));
    }
    log::info!(
        "  Secondary/supplementary skipped: {}",
        format_count(metrics.secondary_or_supplementary)
    );
}

/// Logs the outcome of single-end duplicate marking.
pub fn log_dedup_summary(metrics: &SingleEndDedupMetrics) {
    log::info!("Duplicate Marking Summary:");
    log::info!("  Mapped reads: {}", format_count(metrics.total));
    log::info!(
        "  Duplicates: {} ({})",
        format_count(metrics.duplicates),
        percent_of(metrics.duplicates, metrics.total)
    );
    log::info!("  Multimappers (never marked): {}", format_count(metrics.multimappers));
    log::info!("  Distinct 5' positions: {}", format_count(metrics.positions));
}

/// Logs the outcome of propagating proxy verdicts.
pub fn log_propagation_summary(metrics: &PropagationMetrics) {
    log::info!("Duplicate Propagation Summary:");
    log::info!(
        "  Proxies: {} ({} duplicates)",
        format_count(metrics.proxy_fragments),
        format_count(metrics.proxy_duplicates)
    );
    log::info!("  Records: {}", format_count(metrics.records));
    log::info!(
        "  Duplicate records: {} ({})",
        format_count(metrics.duplicate_records),
        percent_of(metrics.duplicate_records, metrics.records)
    );
    log::info!("  Records without proxy: {}", format_count(metrics.unmatched_records));
    if metrics.removed_records > 0 {
        log::info!("  Removed duplicates: {}", format_count(metrics.removed_records));
    }
}

/// Logs one line per normalization pair of a scaling report.
pub fn log_scaling_summary(report: &ScalingReport) {
    for row in &report.rows {
        match &row.factor {
            Ok(factor) => log::info!(
                "{} ({} reads) vs {} ({} reads): scaling factor {factor:.6}",
                row.treatment,
                format_count(row.treatment_reads),
                row.control,
                format_count(row.control_reads)
            ),
            Err(e) => log::warn!("{} vs {}: {e}", row.treatment, row.control),
        }
    }
}

/// Operation timing and summary helper.
///
/// ```no_run
/// use minute_lib::logging::OperationTimer;
///
/// let timer = OperationTimer::new("Projecting records");
/// // ... do work ...
/// timer.log_completion(10_000);
/// ```
pub struct OperationTimer {
    operation: String,
    start_time: Instant,
}

impl OperationTimer {
    /// Creates a new operation timer and logs the start.
    #[must_use]
    pub fn new(operation: &str) -> Self {
        log::info!("{operation} ...");
        Self { operation: operation.to_string(), start_time: Instant::now() }
    }

    /// Logs the completion with record count and rate.
    pub fn log_completion(&self, count: u64) {
        let duration = self.start_time.elapsed();
        log::info!(
            "{} completed: {} in {} ({})",
            self.operation,
            format_count(count),
            format_duration(duration),
            format_rate(count, duration)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0.5, 1), "50.0%");
        assert_eq!(format_percent(0.0, 2), "0.00%");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0s");
        assert_eq!(format_duration(Duration::from_secs(60)), "1m");
        assert_eq!(format_duration(Duration::from_secs(135)), "2m 15s");
        assert_eq!(format_duration(Duration::from_secs(3600)), "1h");
        assert_eq!(format_duration(Duration::from_secs(5400)), "1h 30m");
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(1000, Duration::from_secs(1)), "1,000 records/s");
        assert_eq!(format_rate(30, Duration::from_secs(60)), "30.0 records/min");
        assert!(format_rate(1000, Duration::from_nanos(1)).contains("records/s"));
    }

    #[test]
    fn test_summaries_with_empty_metrics() {
        log_projection_summary(&ProjectionMetrics::default());
        log_dedup_summary(&SingleEndDedupMetrics::default());
        log_propagation_summary(&PropagationMetrics::default());
        log_scaling_summary(&ScalingReport { rows: Vec::new() });
        OperationTimer::new("Test").log_completion(0);
    }
}
