//! Propagation of proxy duplicate verdicts back onto paired-end records.
//!
//! The annotated proxy BAM is loaded once into a [`ProxyIndex`]; the target BAM is then
//! streamed, and every record gets the verdict of the proxy whose identifier it maps to.
//! Both mates and all secondary and supplementary records of a fragment map to the same
//! identifier, so they always share one verdict.

use std::path::Path;

use ahash::AHashMap;
use anyhow::{Context, Result};
use log::{debug, info};
use minute_metrics::PropagationMetrics;
use noodles::sam::alignment::RecordBuf;
use noodles::sam::alignment::record::Flags;

use super::identifier::ProxyId;
use crate::bam_io::{CoordinateOrderedWriter, alignment_records, create_bam_reader};
use crate::errors::MinuteError;
use crate::header::ProgramInfo;
use crate::logging::OperationTimer;
use crate::progress::ProgressTracker;
use crate::sam::check_coordinate_sort;

/// Duplicate verdict of a proxy identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The fragment is not a duplicate.
    Unique,
    /// The fragment is a duplicate.
    Duplicate,
    /// The identifier was seen this many times in the proxy BAM.
    Ambiguous(u32),
}

/// Verdicts of all proxy records, keyed by proxy identifier.
#[derive(Debug, Default)]
pub struct ProxyIndex {
    verdicts: AHashMap<Vec<u8>, Verdict>,
}

impl ProxyIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the verdict of one proxy record; a repeated identifier becomes ambiguous.
    pub fn insert(&mut self, identifier: &[u8], duplicate: bool) {
        let verdict = if duplicate { Verdict::Duplicate } else { Verdict::Unique };
        self.verdicts
            .entry(identifier.to_vec())
            .and_modify(|existing| {
                *existing = match *existing {
                    Verdict::Ambiguous(n) => Verdict::Ambiguous(n + 1),
                    _ => Verdict::Ambiguous(2),
                }
            })
            .or_insert(verdict);
    }

    /// Builds the index from the records of a proxy BAM.
    ///
    /// Secondary and supplementary records and records without a name are ignored.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `records`.
    pub fn from_records<I, E>(records: I) -> std::result::Result<Self, E>
    where
        I: IntoIterator<Item = std::result::Result<RecordBuf, E>>,
    {
        let mut index = Self::new();
        for record in records {
            let record = record?;
            let flags = record.flags();
            if flags.is_secondary() || flags.is_supplementary() {
                continue;
            }
            if let Some(name) = record.name() {
                index.insert(name, flags.is_duplicate());
            }
        }
        Ok(index)
    }

    /// The verdict for a proxy identifier.
    #[must_use]
    pub fn get(&self, identifier: &[u8]) -> Option<Verdict> {
        self.verdicts.get(identifier).copied()
    }

    /// Number of distinct identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.verdicts.len()
    }

    /// Whether the index holds no identifiers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.verdicts.is_empty()
    }

    /// Number of identifiers with a duplicate verdict.
    #[must_use]
    pub fn duplicates(&self) -> usize {
        self.verdicts.values().filter(|v| **v == Verdict::Duplicate).count()
    }
}

/// Iterator adapter applying proxy verdicts to a stream of target records.
pub struct MarkedRecords<'a, I> {
    records: I,
    index: &'a ProxyIndex,
    remove_duplicates: bool,
    metrics: PropagationMetrics,
    failed: bool,
}

impl<I> MarkedRecords<'_, I> {
    /// Counts collected so far.
    #[must_use]
    pub fn metrics(&self) -> &PropagationMetrics {
        &self.metrics
    }

    /// Consumes the adapter, returning its counts.
    #[must_use]
    pub fn into_metrics(self) -> PropagationMetrics {
        self.metrics
    }

    /// Applies the verdict to one record; `None` when it is removed.
    fn mark(&mut self, mut record: RecordBuf) -> crate::errors::Result<Option<RecordBuf>> {
        self.metrics.records += 1;
        let identifier = ProxyId::from_record(&record).map(|id| id.to_bstring());
        let verdict = identifier.as_ref().and_then(|id| self.index.get(id));

        let duplicate = match verdict {
            Some(Verdict::Duplicate) => true,
            Some(Verdict::Unique) => false,
            Some(Verdict::Ambiguous(count)) => {
                return Err(MinuteError::AmbiguousProxy {
                    identifier: identifier.map(|id| id.to_string()).unwrap_or_default(),
                    count,
                });
            }
            None => {
                self.metrics.unmatched_records += 1;
                false
            }
        };

        record.flags_mut().set(Flags::DUPLICATE, duplicate);
        if duplicate {
            self.metrics.duplicate_records += 1;
            if self.remove_duplicates {
                self.metrics.removed_records += 1;
                return Ok(None);
            }
        }
        Ok(Some(record))
    }
}

impl<I> Iterator for MarkedRecords<'_, I>
where
    I: Iterator<Item = crate::errors::Result<RecordBuf>>,
{
    type Item = crate::errors::Result<RecordBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let result = self.records.next()?.and_then(|record| self.mark(record));
            match result {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => {}
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Sets or clears the duplicate flag of every target record from its fragment's proxy.
///
/// Records whose identifier has no entry in the index are passed through as
/// non-duplicates. An ambiguous identifier ends the stream with
/// [`MinuteError::AmbiguousProxy`]. With `remove_duplicates`, duplicates are dropped instead
/// of flagged. Output order equals input order.
pub fn mark_duplicates_by_proxy<I>(
    records: I,
    index: &ProxyIndex,
    remove_duplicates: bool,
) -> MarkedRecords<'_, I::IntoIter>
where
    I: IntoIterator<Item = crate::errors::Result<RecordBuf>>,
{
    let metrics = PropagationMetrics {
        proxy_fragments: index.len() as u64,
        proxy_duplicates: index.duplicates() as u64,
        ..PropagationMetrics::default()
    };
    MarkedRecords { records: records.into_iter(), index, remove_duplicates, metrics, failed: false }
}

/// Options for [`propagate_bam`].
#[derive(Debug, Clone, Default)]
pub struct PropagationOptions {
    /// Drop duplicate records instead of flagging them.
    pub remove_duplicates: bool,
    /// Write a BAI index next to the output.
    pub write_index: bool,
    /// Program recorded in the output header.
    pub program: Option<ProgramInfo>,
}

/// Loads the verdicts of a proxy BAM.
///
/// # Errors
///
/// Returns an error if the proxy BAM cannot be read.
pub fn load_proxy_index(proxy: &Path) -> Result<ProxyIndex> {
    let (mut reader, header) = create_bam_reader(proxy)?;
    let index = ProxyIndex::from_records(alignment_records(&mut reader, &header, proxy))
        .with_context(|| format!("Failed to read proxy BAM {}", proxy.display()))?;
    debug!("Loaded {} proxy identifiers ({} duplicates)", index.len(), index.duplicates());
    Ok(index)
}

/// Marks duplicates in `target` from the verdicts in `proxy`, writing `output`.
///
/// # Errors
///
/// Returns an error if either input cannot be read, an identifier is ambiguous, or the output
/// cannot be written.
pub fn propagate_bam(
    target: &Path,
    proxy: &Path,
    output: &Path,
    options: &PropagationOptions,
) -> Result<PropagationMetrics> {
    let timer = OperationTimer::new("Propagating proxy duplicate verdicts");
    let index = load_proxy_index(proxy)?;
    info!("Loaded {} proxy identifiers from {}", index.len(), proxy.display());

    let (mut reader, header) = create_bam_reader(target)?;
    check_coordinate_sort(&header, target, "Target");
    let header = match &options.program {
        Some(program) => program.apply(header)?,
        None => header,
    };
    let mut writer = CoordinateOrderedWriter::create(output, &header, options.write_index)?;
    let progress = ProgressTracker::new("Processed records");

    let mut marked = mark_duplicates_by_proxy(
        alignment_records(&mut reader, &header, target),
        &index,
        options.remove_duplicates,
    );
    for record in marked.by_ref() {
        let record = record.with_context(|| format!("Failed to mark {}", target.display()))?;
        writer.write(&record)?;
        progress.log_if_needed(1);
    }
    progress.log_final();

    let metrics = marked.into_metrics();
    if let Some(index_path) = writer.finish()? {
        info!("Wrote index {}", index_path.display());
    }
    timer.log_completion(metrics.records);
    Ok(metrics)
}
