//! Proxy identifiers.
//!
//! A proxy identifier is the original read name followed by `_` and two characters: the
//! segment of the representative record (`1`, `2`, or `u` for an unpaired read) and the
//! pairing (`p` when both segments are mapped, `s` when only one is). Both characters can be
//! derived from the flags of any record of a fragment, so the target side of the join
//! reconstructs the exact identifier the projector wrote.

use std::fmt;

use bstr::{BStr, BString, ByteSlice};
use noodles::sam::alignment::RecordBuf;

/// Segment of the record a proxy was made from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Segment {
    /// First segment of a pair (R1).
    First,
    /// Last segment of a pair (R2).
    Last,
    /// A read without a mate.
    Unpaired,
}

impl Segment {
    fn code(self) -> u8 {
        match self {
            Self::First => b'1',
            Self::Last => b'2',
            Self::Unpaired => b'u',
        }
    }
}

/// Whether both segments of the fragment are mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pairing {
    /// Both segments are mapped.
    Paired,
    /// Only one segment is mapped, or the read is unpaired.
    Single,
}

impl Pairing {
    fn code(self) -> u8 {
        match self {
            Self::Paired => b'p',
            Self::Single => b's',
        }
    }
}

/// The identifier linking a proxy record to its fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyId {
    /// Original read name.
    pub name: BString,
    /// Segment of the representative record.
    pub segment: Segment,
    /// Mapping state of the fragment.
    pub pairing: Pairing,
}

impl ProxyId {
    /// Derives the identifier of the fragment `record` belongs to.
    ///
    /// Returns `None` for records without a name and for fragments with no mapped segment,
    /// which are never projected.
    #[must_use]
    pub fn from_record(record: &RecordBuf) -> Option<Self> {
        let name = record.name()?;
        let flags = record.flags();

        if !flags.is_segmented() {
            if flags.is_unmapped() {
                return None;
            }
            return Some(Self::new(name, Segment::Unpaired, Pairing::Single));
        }

        let self_mapped = !flags.is_unmapped();
        let mate_mapped = !flags.is_mate_unmapped();
        let (first_mapped, last_mapped) =
            if flags.is_first_segment() { (self_mapped, mate_mapped) } else { (mate_mapped, self_mapped) };

        let (segment, pairing) = match (first_mapped, last_mapped) {
            (true, true) => (Segment::First, Pairing::Paired),
            (true, false) => (Segment::First, Pairing::Single),
            (false, true) => (Segment::Last, Pairing::Single),
            (false, false) => return None,
        };
        Some(Self::new(name, segment, pairing))
    }

    fn new(name: &BStr, segment: Segment, pairing: Pairing) -> Self {
        Self { name: name.to_owned(), segment, pairing }
    }

    /// The identifier as written into the proxy record's name.
    #[must_use]
    pub fn to_bstring(&self) -> BString {
        let mut out = Vec::with_capacity(self.name.len() + 3);
        out.extend_from_slice(&self.name);
        out.push(b'_');
        out.push(self.segment.code());
        out.push(self.pairing.code());
        out.into()
    }
}

impl fmt::Display for ProxyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_bstring())
    }
}

/// The segment a record belongs to.
fn segment_of(record: &RecordBuf) -> Segment {
    let flags = record.flags();
    if !flags.is_segmented() {
        Segment::Unpaired
    } else if flags.is_first_segment() {
        Segment::First
    } else {
        Segment::Last
    }
}

/// Whether `record` is the one a proxy is made from for the fragment identified by `id`.
#[must_use]
pub fn is_representative(record: &RecordBuf, id: &ProxyId) -> bool {
    let flags = record.flags();
    !flags.is_secondary()
        && !flags.is_supplementary()
        && !flags.is_unmapped()
        && segment_of(record) == id.segment
}

/// Removes a proxy suffix (`_1p`, `_2s`, `_us`, ...) from a read name, if present.
#[must_use]
pub fn strip_proxy_suffix(name: &[u8]) -> &[u8] {
    match name {
        [rest @ .., b'_', segment, pairing]
            if matches!(segment, b'1' | b'2' | b'u') && matches!(pairing, b'p' | b's') =>
        {
            rest
        }
        _ => name,
    }
}

/// Removes a proxy suffix from a name given as a `BStr`.
#[must_use]
pub fn original_name(name: &BStr) -> &BStr {
    strip_proxy_suffix(name.as_bytes()).as_bstr()
}
