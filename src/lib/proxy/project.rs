//! Projection of paired-end alignments to single-end proxy records.
//!
//! Exactly one proxy is emitted per fragment, from its representative primary record: the
//! first segment when it is mapped, otherwise the mapped last segment (only with
//! `keep_unmapped`). Unpaired mapped reads represent themselves. The proxy keeps the
//! representative's position, strand, CIGAR, sequence and qualities, so its 5' end and strand
//! are those of the fragment, and drops everything that refers to the mate.

use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use minute_metrics::ProjectionMetrics;
use noodles::sam::alignment::RecordBuf;
use noodles::sam::alignment::record::Flags;
use noodles::sam::alignment::record::data::field::Tag;

use super::identifier::{Pairing, ProxyId, Segment, is_representative};
use crate::bam_io::{CoordinateOrderedWriter, alignment_records, create_bam_reader};
use crate::header::ProgramInfo;
use crate::logging::OperationTimer;
use crate::progress::ProgressTracker;
use crate::sam::check_coordinate_sort;

/// Flags that describe the mate or the pair and are cleared on a proxy.
const PAIRING_FLAGS: Flags = Flags::SEGMENTED
    .union(Flags::PROPERLY_SEGMENTED)
    .union(Flags::FIRST_SEGMENT)
    .union(Flags::LAST_SEGMENT)
    .union(Flags::MATE_UNMAPPED)
    .union(Flags::MATE_REVERSE_COMPLEMENTED)
    .union(Flags::DUPLICATE);

/// Builds the proxy record for a representative record.
#[must_use]
pub fn to_proxy(record: &RecordBuf, id: &ProxyId) -> RecordBuf {
    let mut proxy = record.clone();
    let mut flags = proxy.flags();
    flags.remove(PAIRING_FLAGS);
    *proxy.flags_mut() = flags;
    *proxy.mate_reference_sequence_id_mut() = None;
    *proxy.mate_alignment_start_mut() = None;
    *proxy.template_length_mut() = 0;
    proxy.data_mut().remove(&Tag::MATE_CIGAR);
    proxy.data_mut().remove(&Tag::MATE_MAPPING_QUALITY);
    *proxy.name_mut() = Some(id.to_bstring());
    proxy
}

/// Decides per record whether a proxy is emitted, keeping counts as it goes.
#[derive(Debug, Default)]
pub struct Projector {
    keep_unmapped: bool,
    metrics: ProjectionMetrics,
}

impl Projector {
    /// Creates a projector; `keep_unmapped` projects fragments whose mate is unmapped.
    #[must_use]
    pub fn new(keep_unmapped: bool) -> Self {
        Self { keep_unmapped, metrics: ProjectionMetrics::default() }
    }

    /// Returns the proxy for `record` if it is the representative of a projected fragment.
    pub fn project(&mut self, record: &RecordBuf) -> Option<RecordBuf> {
        self.metrics.records += 1;
        let flags = record.flags();
        if flags.is_secondary() || flags.is_supplementary() {
            self.metrics.secondary_or_supplementary += 1;
            return None;
        }

        let Some(id) = ProxyId::from_record(record) else {
            self.metrics.unmapped_records += 1;
            return None;
        };
        if !is_representative(record, &id) {
            return None;
        }
        if id.pairing == Pairing::Single && id.segment != Segment::Unpaired && !self.keep_unmapped {
            self.metrics.dropped_unmapped += 1;
            return None;
        }

        self.metrics.fragments += 1;
        Some(to_proxy(record, &id))
    }

    /// Counts collected so far.
    #[must_use]
    pub fn metrics(&self) -> &ProjectionMetrics {
        &self.metrics
    }
}

/// Iterator adapter yielding the proxy records of a record stream, in input order.
pub struct SingleEndProxies<I> {
    records: I,
    projector: Projector,
}

impl<I> SingleEndProxies<I> {
    /// Counts collected so far.
    #[must_use]
    pub fn metrics(&self) -> &ProjectionMetrics {
        self.projector.metrics()
    }

    /// Consumes the adapter, returning its counts.
    #[must_use]
    pub fn into_metrics(self) -> ProjectionMetrics {
        self.projector.metrics
    }
}

impl<I, E> Iterator for SingleEndProxies<I>
where
    I: Iterator<Item = std::result::Result<RecordBuf, E>>,
{
    type Item = std::result::Result<RecordBuf, E>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.records.next()? {
                Ok(record) => {
                    if let Some(proxy) = self.projector.project(&record) {
                        return Some(Ok(proxy));
                    }
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Converts a stream of paired-end records into single-end proxy records.
///
/// ```
/// use minute_lib::proxy::convert_paired_end_to_single_end;
/// use minute_lib::sam::builder::PairBuilder;
///
/// let (r1, r2) = PairBuilder::new().name("readX").build();
/// let records = vec![Ok::<_, std::io::Error>(r1), Ok(r2)];
/// let proxies: Vec<_> = convert_paired_end_to_single_end(records, false)
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(proxies.len(), 1);
/// assert_eq!(proxies[0].name().unwrap(), "readX_1p");
/// ```
pub fn convert_paired_end_to_single_end<I, E>(
    records: I,
    keep_unmapped: bool,
) -> SingleEndProxies<I::IntoIter>
where
    I: IntoIterator<Item = std::result::Result<RecordBuf, E>>,
{
    SingleEndProxies { records: records.into_iter(), projector: Projector::new(keep_unmapped) }
}

/// Options for [`project_bam`].
#[derive(Debug, Clone, Default)]
pub struct ProjectionOptions {
    /// Project fragments whose mate is unmapped.
    pub keep_unmapped: bool,
    /// Write a BAI index next to the output.
    pub write_index: bool,
    /// Program recorded in the output header.
    pub program: Option<ProgramInfo>,
}

/// Projects a paired-end BAM into a single-end proxy BAM.
///
/// # Errors
///
/// Returns an error if the input cannot be read, a record cannot be decoded, or the output
/// cannot be written.
pub fn project_bam(input: &Path, output: &Path, options: &ProjectionOptions) -> Result<ProjectionMetrics> {
    let timer = OperationTimer::new("Projecting paired-end records to single-end proxies");
    let (mut reader, header) = create_bam_reader(input)?;
    check_coordinate_sort(&header, input, "Input");

    let header = match &options.program {
        Some(program) => program.apply(header)?,
        None => header,
    };
    let mut writer = CoordinateOrderedWriter::create(output, &header, options.write_index)?;
    let progress = ProgressTracker::new("Projected records");

    let mut proxies =
        convert_paired_end_to_single_end(alignment_records(&mut reader, &header, input), options.keep_unmapped);
    for proxy in proxies.by_ref() {
        let proxy = proxy.with_context(|| format!("Failed to read {}", input.display()))?;
        writer.write(&proxy)?;
        progress.log_if_needed(1);
    }
    progress.log_final();

    let metrics = proxies.into_metrics();
    if let Some(index) = writer.finish()? {
        info!("Wrote index {}", index.display());
    }
    timer.log_completion(metrics.records);
    Ok(metrics)
}
