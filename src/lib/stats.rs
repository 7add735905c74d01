//! Per-library statistics: Picard metrics, read counts, genome size and summaries.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::Context;
use flate2::read::MultiGzDecoder;
use log::debug;
use minute_metrics::LibraryStats;
use minute_metrics::writer::{read_metrics, write_metrics_auto};
use noodles::fasta;

use crate::errors::{MinuteError, Result};

/// Metrics class written by Picard `MarkDuplicates`.
pub const DUPLICATION_METRICS_CLASS: &str = "picard.sam.DuplicationMetrics";

/// Metrics class written by Picard `CollectInsertSizeMetrics`.
pub const INSERT_SIZE_METRICS_CLASS: &str = "picard.analysis.InsertSizeMetrics";

/// Value used for metrics Picard leaves blank.
pub const NOT_AVAILABLE: &str = "NA";

/// Lowercased column name to value.
pub type PicardMetrics = BTreeMap<String, String>;

fn format_error(path: &Path, line: u64, reason: impl Into<String>) -> MinuteError {
    MinuteError::Format { path: path.to_path_buf(), record: line, reason: reason.into() }
}

/// Parses the first row of the METRICS section of a Picard metrics file.
///
/// The class named on the `## METRICS CLASS` line must equal `metrics_class`. Blank values
/// (Picard omits the estimated library size for small libraries) become `NA`.
///
/// # Errors
///
/// Returns [`MinuteError::Format`] if the file cannot be read, has no METRICS section, the
/// class differs, or the header and value lines are missing.
pub fn parse_picard_metrics<P: AsRef<Path>>(path: P, metrics_class: &str) -> Result<PicardMetrics> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| format_error(path, 0, e.to_string()))?;
    let mut lines = text.lines().enumerate();

    let (class_line, class) = lines
        .by_ref()
        .find_map(|(i, line)| {
            line.strip_prefix("## METRICS CLASS")
                .map(|rest| (i, rest.trim().split('\t').next().unwrap_or_default().to_string()))
        })
        .ok_or_else(|| format_error(path, 0, "no '## METRICS CLASS' line"))?;
    if class != metrics_class {
        return Err(format_error(
            path,
            class_line as u64,
            format!("expected metrics class {metrics_class}, but found {class}"),
        ));
    }

    let missing = || format_error(path, class_line as u64 + 1, "METRICS section has no data row");
    let (_, header) = lines.next().ok_or_else(missing)?;
    let (_, values) = lines.next().ok_or_else(missing)?;
    let values: Vec<&str> = values.split('\t').collect();

    let metrics = header
        .split('\t')
        .enumerate()
        .map(|(i, key)| {
            let value = values.get(i).map(|v| v.trim()).filter(|v| !v.is_empty());
            (key.trim().to_lowercase(), value.unwrap_or(NOT_AVAILABLE).to_string())
        })
        .collect();
    Ok(metrics)
}

/// Parses a Picard `MarkDuplicates` metrics file.
///
/// # Errors
///
/// See [`parse_picard_metrics`].
pub fn parse_duplication_metrics<P: AsRef<Path>>(path: P) -> Result<PicardMetrics> {
    parse_picard_metrics(path, DUPLICATION_METRICS_CLASS)
}

/// Parses a Picard `CollectInsertSizeMetrics` metrics file.
///
/// # Errors
///
/// See [`parse_picard_metrics`].
pub fn parse_insert_size_metrics<P: AsRef<Path>>(path: P) -> Result<PicardMetrics> {
    parse_picard_metrics(path, INSERT_SIZE_METRICS_CLASS)
}

/// Reads a file holding a single integer.
///
/// # Errors
///
/// Returns [`MinuteError::Format`] if the file cannot be read or does not hold an integer.
pub fn read_int_from_file<P: AsRef<Path>>(path: P) -> Result<u64> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| format_error(path, 0, e.to_string()))?;
    let trimmed = text.trim();
    trimmed
        .parse()
        .map_err(|_| format_error(path, 0, format!("expected an integer, found '{trimmed}'")))
}

/// Read counts of one library at the stages of the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadCounts {
    /// Mapped reads before duplicate removal.
    pub mapped: u64,
    /// Mapped reads after duplicate removal.
    pub deduplicated: u64,
    /// Deduplicated reads outside excluded regions.
    pub restricted: u64,
}

/// Assembles the statistics row of a library.
///
/// `percent_duplication` is Picard's `PERCENT_DUPLICATION` fraction scaled to 0-100.
///
/// # Errors
///
/// Returns [`MinuteError::Format`] if `PERCENT_DUPLICATION` is missing or not a number.
pub fn library_stats(
    library: &str,
    counts: ReadCounts,
    duplication: &PicardMetrics,
    insert_size: Option<&PicardMetrics>,
) -> Result<LibraryStats> {
    let raw = duplication.get("percent_duplication").map_or(NOT_AVAILABLE, String::as_str);
    let fraction: f64 = raw.parse().map_err(|_| MinuteError::Format {
        path: PathBuf::from(library),
        record: 0,
        reason: format!("PERCENT_DUPLICATION is not a number: '{raw}'"),
    })?;

    let field = |metrics: Option<&PicardMetrics>, key: &str| {
        metrics.and_then(|m| m.get(key)).cloned().unwrap_or_else(|| NOT_AVAILABLE.to_string())
    };
    Ok(LibraryStats {
        library: library.to_string(),
        mapped_reads: counts.mapped,
        dedup_mapped_reads: counts.deduplicated,
        restricted_reads: counts.restricted,
        estimated_library_size: field(Some(duplication), "estimated_library_size"),
        percent_duplication: fraction * 100.0,
        median_insert_size: field(insert_size, "median_insert_size"),
    })
}

/// Combines per-library statistics files into one table, in the order given.
///
/// # Errors
///
/// Returns an error if a file cannot be read or the output cannot be written.
pub fn summarize<P: AsRef<Path>, Q: AsRef<Path>>(
    stats_files: &[P],
    output: Q,
) -> anyhow::Result<Vec<LibraryStats>> {
    let mut rows = Vec::with_capacity(stats_files.len());
    for path in stats_files {
        let mut file_rows: Vec<LibraryStats> = read_metrics(path)?;
        debug!("Read {} rows from {}", file_rows.len(), path.as_ref().display());
        rows.append(&mut file_rows);
    }
    write_metrics_auto(output, &rows)?;
    Ok(rows)
}

fn open_maybe_gzipped(path: &Path) -> std::io::Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Number of non-`N` bases in a FASTA file, which may be gzip or BGZF compressed.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or parsed.
pub fn compute_genome_size<P: AsRef<Path>>(fasta_path: P) -> anyhow::Result<u64> {
    let path = fasta_path.as_ref();
    let reader = open_maybe_gzipped(path)
        .with_context(|| format!("Failed to open reference: {}", path.display()))?;
    let mut fasta_reader = fasta::io::Reader::new(reader);

    let mut size = 0_u64;
    for result in fasta_reader.records() {
        let record =
            result.with_context(|| format!("Failed to read FASTA record from {}", path.display()))?;
        let bases = record.sequence().as_ref();
        size += bases.iter().filter(|b| !b.eq_ignore_ascii_case(&b'N')).count() as u64;
    }
    debug!("Genome size of {}: {size}", path.display());
    Ok(size)
}
