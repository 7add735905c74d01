//! Utilities for generating test BAM data programmatically.

#![allow(dead_code)]

use std::path::Path;

use minute_lib::sam::builder::{PairBuilder, coordinate_sorted_header, write_bam};
use noodles::sam::alignment::record_buf::RecordBuf;

/// A paired-end fragment described by its template name and R1/R2 starts.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub name: String,
    pub start1: usize,
    pub start2: usize,
    pub quality: u8,
}

impl Fragment {
    /// A forward R1 at `start1` and a reverse R2 at `start2`, named `<id>_<umi>`.
    pub fn new(id: &str, umi: &str, start1: usize, start2: usize) -> Self {
        Self { name: format!("{id}_{umi}"), start1, start2, quality: 30 }
    }

    /// Sets the base quality of both reads.
    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    fn pair(&self) -> (RecordBuf, RecordBuf) {
        PairBuilder::new()
            .name(&self.name)
            .start1(self.start1)
            .start2(self.start2)
            .quality(self.quality)
            .build()
    }
}

/// Coordinate-sorts the records of the given fragments.
pub fn sorted_records(fragments: &[Fragment]) -> Vec<RecordBuf> {
    let mut records: Vec<RecordBuf> = fragments
        .iter()
        .flat_map(|f| {
            let (r1, r2) = f.pair();
            [r1, r2]
        })
        .collect();
    records.sort_by_key(|r| r.alignment_start().map(usize::from));
    records
}

/// Writes the fragments to a coordinate-sorted BAM over a single 100 kb reference.
pub fn write_fragments_bam(path: &Path, fragments: &[Fragment]) {
    let header = coordinate_sorted_header(&[("chr1", 100_000)]);
    write_bam(path, &header, &sorted_records(fragments)).expect("Failed to write BAM");
}
