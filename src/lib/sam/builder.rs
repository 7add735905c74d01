//! Builders for creating test SAM/BAM records, headers and files.
//!
//! ```rust
//! use minute_lib::sam::builder::{PairBuilder, RecordBuilder};
//!
//! let record = RecordBuilder::mapped_read()
//!     .name("read1")
//!     .sequence("ACGTACGT")
//!     .alignment_start(100)
//!     .build();
//! assert_eq!(record.reference_sequence_id(), Some(0));
//!
//! let (r1, r2) = PairBuilder::new().name("frag1").start1(100).start2(250).build();
//! assert!(r1.flags().is_first_segment());
//! assert!(r2.flags().is_last_segment());
//! ```

use std::num::NonZeroUsize;
use std::path::Path;

use anyhow::Result;
use bstr::BString;
use noodles::core::Position;
use noodles::sam::Header;
use noodles::sam::alignment::io::Write as AlignmentWrite;
use noodles::sam::alignment::record::cigar::Op;
use noodles::sam::alignment::record::cigar::op::Kind;
use noodles::sam::alignment::record::{Flags, MappingQuality};
use noodles::sam::alignment::record_buf::{QualityScores, RecordBuf, Sequence};
use noodles::sam::header::record::value::Map;
use noodles::sam::header::record::value::map::header::tag as header_tag;
use noodles::sam::header::record::value::map::{Header as HeaderRecord, ReferenceSequence};

pub const DEFAULT_READ_LENGTH: usize = 50;
pub const DEFAULT_BASE_QUALITY: u8 = 30;
pub const DEFAULT_MAPQ: u8 = 60;

/// Parses a CIGAR string into operations.
///
/// # Panics
///
/// Panics on a malformed CIGAR string.
#[must_use]
pub fn parse_cigar(cigar_str: &str) -> Vec<Op> {
    let mut ops = Vec::new();
    let mut num_str = String::new();

    for c in cigar_str.chars() {
        if c.is_ascii_digit() {
            num_str.push(c);
        } else {
            let len: usize = num_str.parse().expect("Invalid CIGAR: expected number");
            let kind = match c {
                'M' => Kind::Match,
                'I' => Kind::Insertion,
                'D' => Kind::Deletion,
                'N' => Kind::Skip,
                'S' => Kind::SoftClip,
                'H' => Kind::HardClip,
                '=' => Kind::SequenceMatch,
                'X' => Kind::SequenceMismatch,
                _ => panic!("Unknown CIGAR operation: {c}"),
            };
            ops.push(Op::new(kind, len));
            num_str.clear();
        }
    }

    ops
}

fn cigar_read_length(cigar: &str) -> usize {
    parse_cigar(cigar)
        .iter()
        .filter(|op| {
            matches!(
                op.kind(),
                Kind::Match
                    | Kind::Insertion
                    | Kind::SoftClip
                    | Kind::SequenceMatch
                    | Kind::SequenceMismatch
            )
        })
        .map(|op| op.len())
        .sum()
}

fn header_with_sort_order(sort_order: &str, references: &[(&str, usize)]) -> Header {
    let header_map = Map::<HeaderRecord>::builder()
        .insert(header_tag::SORT_ORDER, BString::from(sort_order))
        .build()
        .expect("valid header map");

    let mut builder = Header::builder().set_header(header_map);
    for (name, length) in references {
        let reference = Map::<ReferenceSequence>::new(
            NonZeroUsize::new(*length).expect("reference length must be non-zero"),
        );
        builder = builder.add_reference_sequence(BString::from(*name), reference);
    }
    builder.build()
}

/// A header declaring `SO:coordinate` with the given reference sequences.
#[must_use]
pub fn coordinate_sorted_header(references: &[(&str, usize)]) -> Header {
    header_with_sort_order("coordinate", references)
}

/// A header declaring `SO:unsorted` with the given reference sequences.
#[must_use]
pub fn unsorted_header(references: &[(&str, usize)]) -> Header {
    header_with_sort_order("unsorted", references)
}

/// Writes records to a BAM file.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_bam(path: &Path, header: &Header, records: &[RecordBuf]) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let mut writer = noodles::bam::io::Writer::new(file);
    writer.write_header(header)?;
    for record in records {
        writer.write_alignment_record(header, record)?;
    }
    writer.finish(header)?;
    Ok(())
}

/// Reads all records of a BAM file.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or decoded.
pub fn read_bam(path: &Path) -> Result<(Header, Vec<RecordBuf>)> {
    let mut reader = noodles::bam::io::Reader::new(std::fs::File::open(path)?);
    let header = reader.read_header()?;
    let records = reader.record_bufs(&header).collect::<std::io::Result<Vec<_>>>()?;
    Ok((header, records))
}

/// Builder for creating individual BAM/SAM records.
///
/// ```rust
/// use minute_lib::sam::builder::RecordBuilder;
///
/// let r1 = RecordBuilder::new()
///     .name("read1")
///     .sequence("ACGTACGT")
///     .first_segment(true)
///     .reference_sequence_id(0)
///     .alignment_start(100)
///     .build();
/// assert!(r1.flags().is_segmented());
/// ```
#[derive(Debug, Default)]
pub struct RecordBuilder {
    name: Option<Vec<u8>>,
    flags: Flags,
    reference_sequence_id: Option<usize>,
    alignment_start: Option<usize>,
    mapping_quality: Option<u8>,
    cigar: Option<String>,
    sequence: Vec<u8>,
    qualities: Vec<u8>,
    mate_reference_sequence_id: Option<usize>,
    mate_alignment_start: Option<usize>,
    template_length: Option<i32>,
}

impl RecordBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self { mapping_quality: Some(DEFAULT_MAPQ), ..Self::default() }
    }

    /// A builder for a read mapped to the first reference sequence.
    #[must_use]
    pub fn mapped_read() -> Self {
        Self { reference_sequence_id: Some(0), ..Self::new() }
    }

    /// Sets the read name.
    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.as_bytes().to_vec());
        self
    }

    /// Sets the sequence; qualities default to [`DEFAULT_BASE_QUALITY`].
    #[must_use]
    pub fn sequence(mut self, seq: &str) -> Self {
        self.sequence = seq.as_bytes().to_vec();
        if self.qualities.is_empty() {
            self.qualities = vec![DEFAULT_BASE_QUALITY; seq.len()];
        }
        self
    }

    /// Sets the quality scores (raw Phred values).
    #[must_use]
    pub fn qualities(mut self, quals: &[u8]) -> Self {
        self.qualities = quals.to_vec();
        self
    }

    /// Sets all flags at once.
    #[must_use]
    pub fn flags(mut self, flags: Flags) -> Self {
        self.flags = flags;
        self
    }

    /// Sets the paired flag.
    #[must_use]
    pub fn paired(mut self, paired: bool) -> Self {
        self.flags.set(Flags::SEGMENTED, paired);
        self
    }

    /// Sets the first segment (R1) flag, or the last segment flag when `false`. Implies paired.
    #[must_use]
    pub fn first_segment(mut self, is_first: bool) -> Self {
        self.flags.set(Flags::SEGMENTED, true);
        self.flags.set(Flags::FIRST_SEGMENT, is_first);
        self.flags.set(Flags::LAST_SEGMENT, !is_first);
        self
    }

    /// Sets the properly paired flag. Implies paired.
    #[must_use]
    pub fn properly_paired(mut self, properly_paired: bool) -> Self {
        if properly_paired {
            self.flags.set(Flags::SEGMENTED, true);
        }
        self.flags.set(Flags::PROPERLY_SEGMENTED, properly_paired);
        self
    }

    /// Sets the unmapped flag.
    #[must_use]
    pub fn unmapped(mut self, unmapped: bool) -> Self {
        self.flags.set(Flags::UNMAPPED, unmapped);
        self
    }

    /// Sets the mate unmapped flag.
    #[must_use]
    pub fn mate_unmapped(mut self, unmapped: bool) -> Self {
        self.flags.set(Flags::MATE_UNMAPPED, unmapped);
        self
    }

    /// Sets the reverse complement flag.
    #[must_use]
    pub fn reverse_complement(mut self, reverse: bool) -> Self {
        self.flags.set(Flags::REVERSE_COMPLEMENTED, reverse);
        self
    }

    /// Sets the mate reverse complement flag.
    #[must_use]
    pub fn mate_reverse_complement(mut self, reverse: bool) -> Self {
        self.flags.set(Flags::MATE_REVERSE_COMPLEMENTED, reverse);
        self
    }

    /// Sets the secondary alignment flag.
    #[must_use]
    pub fn secondary(mut self, secondary: bool) -> Self {
        self.flags.set(Flags::SECONDARY, secondary);
        self
    }

    /// Sets the supplementary alignment flag.
    #[must_use]
    pub fn supplementary(mut self, supplementary: bool) -> Self {
        self.flags.set(Flags::SUPPLEMENTARY, supplementary);
        self
    }

    /// Sets the duplicate flag.
    #[must_use]
    pub fn duplicate(mut self, duplicate: bool) -> Self {
        self.flags.set(Flags::DUPLICATE, duplicate);
        self
    }

    /// Sets the reference sequence ID (0-based).
    #[must_use]
    pub fn reference_sequence_id(mut self, id: usize) -> Self {
        self.reference_sequence_id = Some(id);
        self
    }

    /// Sets the alignment start position (1-based).
    #[must_use]
    pub fn alignment_start(mut self, pos: usize) -> Self {
        self.alignment_start = Some(pos);
        self
    }

    /// Sets the mapping quality.
    #[must_use]
    pub fn mapping_quality(mut self, mapq: u8) -> Self {
        self.mapping_quality = Some(mapq);
        self
    }

    /// Sets the CIGAR string.
    #[must_use]
    pub fn cigar(mut self, cigar: &str) -> Self {
        self.cigar = Some(cigar.to_string());
        self
    }

    /// Sets the mate reference sequence ID (0-based).
    #[must_use]
    pub fn mate_reference_sequence_id(mut self, id: usize) -> Self {
        self.mate_reference_sequence_id = Some(id);
        self
    }

    /// Sets the mate alignment start position (1-based).
    #[must_use]
    pub fn mate_alignment_start(mut self, pos: usize) -> Self {
        self.mate_alignment_start = Some(pos);
        self
    }

    /// Sets the template length (insert size).
    #[must_use]
    pub fn template_length(mut self, tlen: i32) -> Self {
        self.template_length = Some(tlen);
        self
    }

    /// Builds the `RecordBuf`.
    ///
    /// If only a sequence is given the CIGAR becomes `<len>M`; if only a CIGAR is given a
    /// sequence of matching length is generated.
    ///
    /// # Panics
    ///
    /// Panics on a zero position, an invalid mapping quality or a malformed CIGAR.
    #[must_use]
    pub fn build(self) -> RecordBuf {
        let mut record = RecordBuf::default();

        if let Some(name) = self.name {
            *record.name_mut() = Some(name.into());
        }
        *record.flags_mut() = self.flags;

        if let Some(ref_id) = self.reference_sequence_id {
            *record.reference_sequence_id_mut() = Some(ref_id);
        }
        if let Some(pos) = self.alignment_start {
            *record.alignment_start_mut() =
                Some(Position::try_from(pos).expect("alignment_start must be >= 1"));
        }
        if let Some(mate_ref_id) = self.mate_reference_sequence_id {
            *record.mate_reference_sequence_id_mut() = Some(mate_ref_id);
        }
        if let Some(mate_pos) = self.mate_alignment_start {
            *record.mate_alignment_start_mut() =
                Some(Position::try_from(mate_pos).expect("mate_alignment_start must be >= 1"));
        }
        if let Some(tlen) = self.template_length {
            *record.template_length_mut() = tlen;
        }
        if let Some(mapq) = self.mapping_quality {
            *record.mapping_quality_mut() =
                Some(MappingQuality::try_from(mapq).expect("mapping_quality must be valid"));
        }

        let (cigar_str, sequence) = match (self.cigar, self.sequence.is_empty()) {
            (Some(cigar), true) => {
                let seq_len = cigar_read_length(&cigar);
                let generated: Vec<u8> = b"ACGT".iter().copied().cycle().take(seq_len).collect();
                (cigar, generated)
            }
            (Some(cigar), false) => (cigar, self.sequence),
            (None, false) => (format!("{}M", self.sequence.len()), self.sequence),
            (None, true) => (String::new(), Vec::new()),
        };

        if !cigar_str.is_empty() && !record.flags().is_unmapped() {
            *record.cigar_mut() = parse_cigar(&cigar_str).into_iter().collect();
        }

        let qualities = if self.qualities.len() == sequence.len() {
            self.qualities
        } else {
            vec![DEFAULT_BASE_QUALITY; sequence.len()]
        };
        *record.sequence_mut() = Sequence::from(sequence);
        *record.quality_scores_mut() = QualityScores::from(qualities);

        record
    }
}

/// Builder for the two primary records of a paired-end fragment.
///
/// R1 is forward and R2 reverse by default. Mate fields, pairing flags and template lengths
/// are filled in consistently; an unmapped mate is placed at its partner's position.
#[derive(Debug)]
pub struct PairBuilder {
    name: String,
    contig: usize,
    start1: usize,
    start2: usize,
    read_length: usize,
    mapq: u8,
    quality: u8,
    reverse1: bool,
    reverse2: bool,
    unmapped1: bool,
    unmapped2: bool,
    duplicate: bool,
}

impl Default for PairBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PairBuilder {
    /// Creates a builder for a forward/reverse pair at positions 100 and 200.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "pair".to_string(),
            contig: 0,
            start1: 100,
            start2: 200,
            read_length: DEFAULT_READ_LENGTH,
            mapq: DEFAULT_MAPQ,
            quality: DEFAULT_BASE_QUALITY,
            reverse1: false,
            reverse2: true,
            unmapped1: false,
            unmapped2: false,
            duplicate: false,
        }
    }

    /// Sets the template name.
    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Sets the reference sequence of both reads.
    #[must_use]
    pub fn contig(mut self, contig: usize) -> Self {
        self.contig = contig;
        self
    }

    /// Sets the R1 alignment start.
    #[must_use]
    pub fn start1(mut self, start: usize) -> Self {
        self.start1 = start;
        self
    }

    /// Sets the R2 alignment start.
    #[must_use]
    pub fn start2(mut self, start: usize) -> Self {
        self.start2 = start;
        self
    }

    /// Sets the length of both reads.
    #[must_use]
    pub fn read_length(mut self, length: usize) -> Self {
        self.read_length = length;
        self
    }

    /// Sets the mapping quality of both reads.
    #[must_use]
    pub fn mapq(mut self, mapq: u8) -> Self {
        self.mapq = mapq;
        self
    }

    /// Sets the base quality of every base.
    #[must_use]
    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    /// Sets the strands of R1 and R2.
    #[must_use]
    pub fn strands(mut self, reverse1: bool, reverse2: bool) -> Self {
        self.reverse1 = reverse1;
        self.reverse2 = reverse2;
        self
    }

    /// Makes R1 unmapped.
    #[must_use]
    pub fn unmapped1(mut self) -> Self {
        self.unmapped1 = true;
        self
    }

    /// Makes R2 unmapped.
    #[must_use]
    pub fn unmapped2(mut self) -> Self {
        self.unmapped2 = true;
        self
    }

    /// Sets the duplicate flag on both reads.
    #[must_use]
    pub fn duplicate(mut self, duplicate: bool) -> Self {
        self.duplicate = duplicate;
        self
    }

    /// Builds `(r1, r2)`.
    ///
    /// # Panics
    ///
    /// Panics if the template length does not fit in an `i32`.
    #[must_use]
    pub fn build(self) -> (RecordBuf, RecordBuf) {
        let start1 = if self.unmapped1 { self.start2 } else { self.start1 };
        let start2 = if self.unmapped2 { start1 } else { self.start2 };
        let both_mapped = !self.unmapped1 && !self.unmapped2;
        let tlen = if both_mapped {
            let left = start1.min(start2);
            let right = start1.max(start2) + self.read_length - 1;
            i32::try_from(right - left + 1).expect("template length fits in i32")
        } else {
            0
        };
        let tlen1 = if start1 <= start2 { tlen } else { -tlen };

        let read = |first: bool, start: usize, mate_start: usize, unmapped: bool, mate_unmapped: bool| {
            let (reverse, mate_reverse) =
                if first { (self.reverse1, self.reverse2) } else { (self.reverse2, self.reverse1) };
            RecordBuilder::new()
                .name(&self.name)
                .cigar(&format!("{}M", self.read_length))
                .qualities(&vec![self.quality; self.read_length])
                .first_segment(first)
                .properly_paired(both_mapped)
                .unmapped(unmapped)
                .mate_unmapped(mate_unmapped)
                .reverse_complement(reverse && !unmapped)
                .mate_reverse_complement(mate_reverse && !mate_unmapped)
                .duplicate(self.duplicate)
                .reference_sequence_id(self.contig)
                .alignment_start(start)
                .mapping_quality(if unmapped { 0 } else { self.mapq })
                .mate_reference_sequence_id(self.contig)
                .mate_alignment_start(mate_start)
                .template_length(if first { tlen1 } else { -tlen1 })
                .build()
        };

        let r1 = read(true, start1, start2, self.unmapped1, self.unmapped2);
        let r2 = read(false, start2, start1, self.unmapped2, self.unmapped1);
        (r1, r2)
    }
}
