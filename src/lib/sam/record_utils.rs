//! Record-level utilities for SAM/BAM records.
//!
//! Positions follow HTSJDK conventions: they are 1-based and the unclipped positions include
//! both soft and hard clips.

use noodles::sam::alignment::RecordBuf;
use noodles::sam::alignment::record::Cigar as CigarTrait;
use noodles::sam::alignment::record::cigar::op::Kind;

/// Calculates leading clipping (soft + hard) from CIGAR operations.
#[must_use]
pub fn leading_clipping(ops: &[(Kind, usize)]) -> usize {
    ops.iter()
        .take_while(|(kind, _)| matches!(kind, Kind::SoftClip | Kind::HardClip))
        .map(|(_, len)| *len)
        .sum()
}

/// Calculates trailing clipping (soft + hard) from CIGAR operations.
#[must_use]
pub fn trailing_clipping(ops: &[(Kind, usize)]) -> usize {
    ops.iter()
        .rev()
        .take_while(|(kind, _)| matches!(kind, Kind::SoftClip | Kind::HardClip))
        .map(|(_, len)| *len)
        .sum()
}

fn cigar_to_ops(record: &RecordBuf) -> Vec<(Kind, usize)> {
    record.cigar().as_ref().iter().map(|op| (op.kind(), op.len())).collect()
}

/// Counts reference-consuming operations from a CIGAR.
#[must_use]
pub fn reference_length(cigar: &impl CigarTrait) -> usize {
    cigar
        .iter()
        .filter_map(Result::ok)
        .filter(|op| {
            matches!(
                op.kind(),
                Kind::Match
                    | Kind::SequenceMatch
                    | Kind::SequenceMismatch
                    | Kind::Deletion
                    | Kind::Skip
            )
        })
        .map(|op| op.len())
        .sum()
}

/// Alignment start minus leading clips; `None` for unmapped reads.
#[must_use]
pub fn unclipped_start(record: &RecordBuf) -> Option<usize> {
    if record.flags().is_unmapped() {
        return None;
    }
    let start = usize::from(record.alignment_start()?);
    let leading = leading_clipping(&cigar_to_ops(record));
    Some(start.saturating_sub(leading))
}

/// Alignment end plus trailing clips; `None` for unmapped reads.
#[must_use]
pub fn unclipped_end(record: &RecordBuf) -> Option<usize> {
    if record.flags().is_unmapped() {
        return None;
    }
    let start = usize::from(record.alignment_start()?);
    let ref_len = reference_length(&record.cigar());
    let trailing = trailing_clipping(&cigar_to_ops(record));
    Some(start + ref_len.saturating_sub(1) + trailing)
}

/// Gets the unclipped 5' position of a read.
///
/// For forward strand reads, returns the unclipped start position.
/// For reverse strand reads, returns the unclipped end position (the 5' end).
///
/// Returns `None` for unmapped reads.
#[must_use]
pub fn unclipped_five_prime_position(record: &RecordBuf) -> Option<usize> {
    if record.flags().is_unmapped() {
        return None;
    }
    if record.flags().is_reverse_complemented() {
        unclipped_end(record)
    } else {
        unclipped_start(record)
    }
}

/// Sum of the base qualities, used to pick the best read among duplicates.
#[must_use]
pub fn quality_sum(record: &RecordBuf) -> u64 {
    record.quality_scores().as_ref().iter().map(|&q| u64::from(q)).sum()
}
