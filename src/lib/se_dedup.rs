//! UMI-aware duplicate marking for single-end (proxy) alignments.
//!
//! Reads are grouped by reference, unclipped 5' position and strand. Within a group the
//! UMIs (the trailing characters of the read name) are clustered with the directional
//! method, and each cluster keeps one read: the highest-scoring read that carries the
//! cluster's most abundant UMI. Everything else in the cluster is a duplicate. Reads whose
//! mapping quality is below the multimapping cutoff are counted but never marked.
//!
//! Marking takes two passes over the input: the first collects candidates and decides which
//! record offsets are duplicates, the second rewrites the file with the flags set.

use std::path::Path;

use ahash::{AHashMap, AHashSet};
use anyhow::{Context, Result};
use log::info;
use minute_metrics::SingleEndDedupMetrics;
use noodles::sam::alignment::RecordBuf;
use noodles::sam::alignment::record::Flags;

use crate::bam_io::{CoordinateOrderedWriter, alignment_records, create_bam_reader};
use crate::config::Config;
use crate::header::ProgramInfo;
use crate::logging::OperationTimer;
use crate::progress::ProgressTracker;
use crate::proxy::strip_proxy_suffix;
use crate::sam::{check_coordinate_sort, quality_sum, unclipped_five_prime_position};
use crate::umi::{directional_clusters, umi_from_name};

/// Parameters of the duplicate decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupParams {
    /// Number of trailing read-name characters holding the UMI.
    pub umi_length: usize,
    /// Maximum Hamming distance for two UMIs to be merged.
    pub umi_mismatches: u32,
    /// Reads with a mapping quality below this are multimappers.
    pub multimap_cutoff: u8,
}

impl Default for DedupParams {
    fn default() -> Self {
        Self { umi_length: 6, umi_mismatches: 1, multimap_cutoff: 5 }
    }
}

impl DedupParams {
    /// Parameters from the run configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            umi_length: config.umi_length,
            umi_mismatches: config.dedup.umi_mismatches,
            multimap_cutoff: config.dedup.multimap_cutoff,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PositionKey {
    reference: usize,
    five_prime: usize,
    reverse: bool,
}

#[derive(Debug)]
struct Candidate {
    offset: u64,
    umi: Vec<u8>,
    score: u64,
}

/// Collects duplicate candidates record by record and decides the duplicates at the end.
#[derive(Debug)]
pub struct DuplicateFinder {
    params: DedupParams,
    groups: AHashMap<PositionKey, Vec<Candidate>>,
    metrics: SingleEndDedupMetrics,
}

impl DuplicateFinder {
    /// Creates an empty finder.
    #[must_use]
    pub fn new(params: DedupParams) -> Self {
        Self { params, groups: AHashMap::new(), metrics: SingleEndDedupMetrics::default() }
    }

    /// Considers the record at `offset` (its 0-based position in the input).
    ///
    /// Unmapped, secondary and supplementary records are ignored.
    pub fn add(&mut self, offset: u64, record: &RecordBuf) {
        let flags = record.flags();
        if flags.is_unmapped() || flags.is_secondary() || flags.is_supplementary() {
            return;
        }
        let (Some(reference), Some(five_prime)) =
            (record.reference_sequence_id(), unclipped_five_prime_position(record))
        else {
            return;
        };

        self.metrics.total += 1;
        // 255 (unavailable) is decoded as `None`
        let mapq = record.mapping_quality().map_or(u8::MAX, u8::from);
        if mapq < self.params.multimap_cutoff {
            self.metrics.multimappers += 1;
            return;
        }

        let name = record.name().map_or(&[][..], |n| strip_proxy_suffix(n));
        let umi = umi_from_name(name, self.params.umi_length).to_vec();
        let key = PositionKey { reference, five_prime, reverse: flags.is_reverse_complemented() };
        self.groups.entry(key).or_default().push(Candidate { offset, umi, score: quality_sum(record) });
    }

    /// Offsets of all duplicate records, with the summary counts.
    #[must_use]
    pub fn finish(self) -> (AHashSet<u64>, SingleEndDedupMetrics) {
        let mut metrics = self.metrics;
        metrics.positions = self.groups.len() as u64;

        let mut duplicates = AHashSet::new();
        for group in self.groups.values().filter(|g| g.len() > 1) {
            mark_group(group, self.params.umi_mismatches, &mut duplicates);
        }
        metrics.duplicates = duplicates.len() as u64;
        metrics.finalize();
        (duplicates, metrics)
    }
}

/// Adds the duplicates among the candidates at one position to `duplicates`.
fn mark_group(group: &[Candidate], umi_mismatches: u32, duplicates: &mut AHashSet<u64>) {
    let mut counts: Vec<(&[u8], u64)> = Vec::new();
    let mut slots: AHashMap<&[u8], usize> = AHashMap::new();
    for candidate in group {
        let umi = candidate.umi.as_slice();
        if let Some(&slot) = slots.get(umi) {
            counts[slot].1 += 1;
        } else {
            slots.insert(umi, counts.len());
            counts.push((umi, 1));
        }
    }

    for cluster in directional_clusters(&counts, umi_mismatches) {
        let representative = counts[cluster.representative].0;
        let mut kept: Option<&Candidate> = None;
        for candidate in group.iter().filter(|c| c.umi == representative) {
            match kept {
                Some(best) if candidate.score <= best.score => {}
                _ => kept = Some(candidate),
            }
        }
        let kept_offset = kept.map(|c| c.offset);

        let members: AHashSet<&[u8]> = cluster.members.iter().map(|&i| counts[i].0).collect();
        for candidate in group.iter().filter(|c| members.contains(c.umi.as_slice())) {
            if Some(candidate.offset) != kept_offset {
                duplicates.insert(candidate.offset);
            }
        }
    }
}

/// Runs a [`DuplicateFinder`] over a record stream.
///
/// # Errors
///
/// Returns the first error produced by `records`.
pub fn find_duplicates<I, E>(
    records: I,
    params: DedupParams,
) -> std::result::Result<(AHashSet<u64>, SingleEndDedupMetrics), E>
where
    I: IntoIterator<Item = std::result::Result<RecordBuf, E>>,
{
    let mut finder = DuplicateFinder::new(params);
    for (offset, record) in (0_u64..).zip(records) {
        finder.add(offset, &record?);
    }
    Ok(finder.finish())
}

/// Options for [`mark_duplicates_se`].
#[derive(Debug, Clone, Default)]
pub struct SingleEndDedupOptions {
    /// Duplicate decision parameters.
    pub params: DedupParams,
    /// Drop duplicates from the output instead of flagging them.
    pub remove_duplicates: bool,
    /// Write a BAI index next to the output.
    pub write_index: bool,
    /// Program recorded in the output header.
    pub program: Option<ProgramInfo>,
}

/// Marks duplicates in a single-end BAM, writing `output`.
///
/// Duplicate flags already present in the input are replaced.
///
/// # Errors
///
/// Returns an error if the input cannot be read or the output cannot be written.
pub fn mark_duplicates_se(
    input: &Path,
    output: &Path,
    options: &SingleEndDedupOptions,
) -> Result<SingleEndDedupMetrics> {
    let timer = OperationTimer::new("Marking single-end duplicates");

    let (duplicates, metrics) = {
        let (mut reader, header) = create_bam_reader(input)?;
        check_coordinate_sort(&header, input, "Input");
        find_duplicates(alignment_records(&mut reader, &header, input), options.params)
            .with_context(|| format!("Failed to read {}", input.display()))?
    };
    info!(
        "Found {} duplicates among {} reads at {} positions",
        duplicates.len(),
        metrics.total,
        metrics.positions
    );

    let (mut reader, header) = create_bam_reader(input)?;
    let header = match &options.program {
        Some(program) => program.apply(header)?,
        None => header,
    };
    let mut writer = CoordinateOrderedWriter::create(output, &header, options.write_index)?;
    let progress = ProgressTracker::new("Wrote records");

    for (offset, record) in (0_u64..).zip(alignment_records(&mut reader, &header, input)) {
        let mut record = record.with_context(|| format!("Failed to read {}", input.display()))?;
        let duplicate = duplicates.contains(&offset);
        if duplicate && options.remove_duplicates {
            continue;
        }
        record.flags_mut().set(Flags::DUPLICATE, duplicate);
        writer.write(&record)?;
        progress.log_if_needed(1);
    }
    progress.log_final();

    if let Some(index) = writer.finish()? {
        info!("Wrote index {}", index.display());
    }
    timer.log_completion(metrics.total);
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sam::builder::{RecordBuilder, coordinate_sorted_header, read_bam, write_bam};
    use tempfile::TempDir;

    fn read(name: &str, start: usize, reverse: bool, quality: u8) -> RecordBuf {
        RecordBuilder::mapped_read()
            .name(name)
            .cigar("20M")
            .qualities(&[quality; 20])
            .reverse_complement(reverse)
            .alignment_start(start)
            .build()
    }

    fn duplicate_offsets(records: Vec<RecordBuf>, params: DedupParams) -> (Vec<u64>, SingleEndDedupMetrics) {
        let (set, metrics) =
            find_duplicates(records.into_iter().map(Ok::<_, std::io::Error>), params).unwrap();
        let mut offsets: Vec<u64> = set.into_iter().collect();
        offsets.sort_unstable();
        (offsets, metrics)
    }

    #[test]
    fn test_same_umi_keeps_best_score() {
        let records = vec![
            read("a_AAAAAA_1p", 100, false, 20),
            read("b_AAAAAA_1p", 100, false, 35),
            read("c_AAAAAA_1p", 100, false, 30),
        ];
        let (dups, metrics) = duplicate_offsets(records, DedupParams::default());
        assert_eq!(dups, vec![0, 2]);
        assert_eq!(metrics.total, 3);
        assert_eq!(metrics.duplicates, 2);
        assert_eq!(metrics.positions, 1);
    }

    #[test]
    fn test_ties_keep_first_read() {
        let records = vec![read("a_ACGTAC", 100, false, 30), read("b_ACGTAC", 100, false, 30)];
        let (dups, _) = duplicate_offsets(records, DedupParams::default());
        assert_eq!(dups, vec![1]);
    }

    #[test]
    fn test_distinct_umis_are_not_duplicates() {
        let records = vec![read("a_AAAAAA_1p", 100, false, 30), read("b_CCCCCC_1p", 100, false, 30)];
        let (dups, metrics) = duplicate_offsets(records, DedupParams::default());
        assert!(dups.is_empty());
        assert!(metrics.fraction_duplication.abs() < f64::EPSILON);
    }

    #[test]
    fn test_umi_within_mismatch_absorbed() {
        let records = vec![
            read("a_AAAAAA_1p", 100, false, 30),
            read("b_AAAAAA_1p", 100, false, 30),
            read("c_AAAAAA_1p", 100, false, 30),
            read("d_AAAAAT_1p", 100, false, 40),
        ];
        let (dups, _) = duplicate_offsets(records.clone(), DedupParams::default());
        assert_eq!(dups, vec![1, 2, 3]);

        let strict = DedupParams { umi_mismatches: 0, ..DedupParams::default() };
        let (dups, _) = duplicate_offsets(records, strict);
        assert_eq!(dups, vec![1, 2]);
    }

    #[test]
    fn test_strand_separates_groups() {
        let records = vec![read("a_AAAAAA", 100, false, 30), read("b_AAAAAA", 81, true, 30)];
        // the reverse read's 5' end is 100, but on the other strand
        let (dups, metrics) = duplicate_offsets(records, DedupParams::default());
        assert!(dups.is_empty());
        assert_eq!(metrics.positions, 2);
    }

    #[test]
    fn test_reverse_reads_grouped_by_five_prime_end() {
        let long = RecordBuilder::mapped_read()
            .name("a_GGGGGG")
            .cigar("30M")
            .reverse_complement(true)
            .alignment_start(100)
            .build();
        let clipped = RecordBuilder::mapped_read()
            .name("b_GGGGGG")
            .cigar("20M5S")
            .reverse_complement(true)
            .alignment_start(105)
            .build();
        // 5' ends: 100 + 30 - 1 = 129 and 105 + 20 - 1 + 5 = 129
        let (dups, _) = duplicate_offsets(vec![long, clipped], DedupParams::default());
        assert_eq!(dups.len(), 1);
    }

    #[test]
    fn test_multimappers_never_marked() {
        let multi = |name: &str| {
            RecordBuilder::mapped_read()
                .name(name)
                .cigar("20M")
                .mapping_quality(1)
                .alignment_start(100)
                .build()
        };
        let records = vec![multi("a_AAAAAA"), multi("b_AAAAAA"), read("c_AAAAAA", 100, false, 30)];
        let (dups, metrics) = duplicate_offsets(records, DedupParams::default());
        assert!(dups.is_empty());
        assert_eq!(metrics.multimappers, 2);
        assert_eq!(metrics.total, 3);
    }

    #[test]
    fn test_unmapped_and_secondary_ignored() {
        let unmapped = RecordBuilder::new().name("u_AAAAAA").sequence("ACGT").unmapped(true).build();
        let secondary = RecordBuilder::mapped_read()
            .name("s_AAAAAA")
            .cigar("20M")
            .secondary(true)
            .alignment_start(100)
            .build();
        let records = vec![unmapped, secondary, read("c_AAAAAA", 100, false, 30)];
        let (dups, metrics) = duplicate_offsets(records, DedupParams::default());
        assert!(dups.is_empty());
        assert_eq!(metrics.total, 1);
    }

    #[test]
    fn test_mark_duplicates_se_file() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("proxy.bam");
        let output = dir.path().join("dedup.bam");
        let header = coordinate_sorted_header(&[("chr1", 10_000)]);
        let stale = RecordBuilder::mapped_read()
            .name("z_TTTTTT_1p")
            .cigar("20M")
            .duplicate(true)
            .alignment_start(500)
            .build();
        let records = vec![
            read("a_AAAAAA_1p", 100, false, 30),
            read("b_AAAAAA_1p", 100, false, 20),
            read("c_CCCCCC_1p", 200, false, 30),
            stale,
        ];
        write_bam(&input, &header, &records).unwrap();

        let options = SingleEndDedupOptions { write_index: true, ..SingleEndDedupOptions::default() };
        let metrics = mark_duplicates_se(&input, &output, &options).unwrap();
        assert_eq!(metrics.total, 4);
        assert_eq!(metrics.duplicates, 1);

        let (_, out) = read_bam(&output).unwrap();
        let flags: Vec<bool> = out.iter().map(|r| r.flags().is_duplicate()).collect();
        assert_eq!(flags, vec![false, true, false, false]);

        let removed = dir.path().join("removed.bam");
        let options = SingleEndDedupOptions { remove_duplicates: true, ..SingleEndDedupOptions::default() };
        mark_duplicates_se(&input, &removed, &options).unwrap();
        assert_eq!(read_bam(&removed).unwrap().1.len(), 3);
    }
}
