//! BAM file I/O helpers.
//!
//! Readers always come paired with their header. Records are streamed as noodles
//! [`RecordBuf`]s through [`AlignmentRecords`], which reports decode failures as
//! [`MinuteError::Format`] carrying the offending record's offset. Coordinate-sorted output
//! goes through [`CoordinateOrderedWriter`], which refuses out-of-order records and can
//! write a BAI index once the file is complete. Its records go to a temporary file next to
//! the output, which only takes the output's name in [`CoordinateOrderedWriter::finish`].
//!
//! ```no_run
//! use minute_lib::bam_io::{alignment_records, create_bam_reader, CoordinateOrderedWriter};
//!
//! # fn main() -> anyhow::Result<()> {
//! let (mut reader, header) = create_bam_reader("input.bam")?;
//! let mut writer = CoordinateOrderedWriter::create("output.bam", &header, true)?;
//! for record in alignment_records(&mut reader, &header, "input.bam") {
//!     writer.write(&record?)?;
//! }
//! writer.finish()?;
//! # Ok(())
//! # }
//! ```

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, warn};
use tempfile::NamedTempFile;
use noodles::bam;
use noodles::bam::bai;
use noodles::sam::Header;
use noodles::sam::alignment::RecordBuf;
use noodles::sam::alignment::io::Write as AlignmentWrite;

use crate::errors::MinuteError;
use crate::sam::is_coordinate_sorted;

/// Single-threaded BAM reader over a file.
pub type BamReader = bam::io::Reader<noodles::bgzf::Reader<File>>;

/// Single-threaded BAM writer over a file.
pub type BamWriter = bam::io::Writer<noodles::bgzf::Writer<File>>;

/// Create a BAM reader and read its header.
///
/// # Errors
/// Returns an error if the file cannot be opened or the header cannot be read
pub fn create_bam_reader<P: AsRef<Path>>(path: P) -> Result<(BamReader, Header)> {
    let path_ref = path.as_ref();
    let file = File::open(path_ref)
        .with_context(|| format!("Failed to open input BAM: {}", path_ref.display()))?;
    let mut reader = bam::io::Reader::new(file);
    let header = reader
        .read_header()
        .with_context(|| format!("Failed to read header from: {}", path_ref.display()))?;
    Ok((reader, header))
}

/// Wraps `file` in a BAM writer and writes the header; `path` names the file in errors.
fn bam_writer_over(file: File, header: &Header, path: &Path) -> Result<BamWriter> {
    let mut writer = bam::io::Writer::new(file);
    writer
        .write_header(header)
        .with_context(|| format!("Failed to write header to: {}", path.display()))?;
    Ok(writer)
}

/// Iterator over the records of a BAM reader.
pub struct AlignmentRecords<'a> {
    reader: &'a mut BamReader,
    header: &'a Header,
    path: PathBuf,
    offset: u64,
    done: bool,
}

impl AlignmentRecords<'_> {
    /// Number of records yielded so far.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

impl Iterator for AlignmentRecords<'_> {
    type Item = crate::errors::Result<RecordBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut record = RecordBuf::default();
        match self.reader.read_record_buf(self.header, &mut record) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(_) => {
                self.offset += 1;
                Some(Ok(record))
            }
            Err(e) => {
                self.done = true;
                Some(Err(MinuteError::Format {
                    path: self.path.clone(),
                    record: self.offset,
                    reason: e.to_string(),
                }))
            }
        }
    }
}

/// Streams the records of `reader`; `path` is only used in error messages.
pub fn alignment_records<'a, P: AsRef<Path>>(
    reader: &'a mut BamReader,
    header: &'a Header,
    path: P,
) -> AlignmentRecords<'a> {
    AlignmentRecords { reader, header, path: path.as_ref().to_path_buf(), offset: 0, done: false }
}

/// Write a BAI index to a file.
///
/// # Errors
/// Returns an error if the file cannot be created or writing the index fails.
pub fn write_bai_index<P: AsRef<Path>>(path: P, index: &bai::Index) -> Result<()> {
    let path_ref = path.as_ref();
    let file = File::create(path_ref)
        .with_context(|| format!("Failed to create index file: {}", path_ref.display()))?;
    let mut writer = bai::io::Writer::new(file);
    writer
        .write_index(index)
        .with_context(|| format!("Failed to write index to: {}", path_ref.display()))?;
    Ok(())
}

/// Path of the BAI index for a BAM file (`<path>.bai`).
#[must_use]
pub fn bai_path(bam: &Path) -> PathBuf {
    let mut name = bam.as_os_str().to_owned();
    name.push(".bai");
    PathBuf::from(name)
}

/// Sort key of a record in a coordinate-sorted BAM; records without a reference sort last.
fn coordinate_key(record: &RecordBuf) -> (usize, usize) {
    match record.reference_sequence_id() {
        Some(id) => (id, record.alignment_start().map_or(0, usize::from)),
        None => (usize::MAX, 0),
    }
}

/// A BAM writer that checks coordinate order and optionally indexes the result.
///
/// Order is enforced only when the header declares `SO:coordinate`; for any other header
/// records are written as given and no index is built.
pub struct CoordinateOrderedWriter {
    writer: BamWriter,
    // Removed on drop unless persisted by `finish`.
    temp: NamedTempFile,
    header: Header,
    path: PathBuf,
    enforce_order: bool,
    build_index: bool,
    last_key: Option<(usize, usize)>,
    written: u64,
}

impl CoordinateOrderedWriter {
    /// Creates a temporary file beside `path` and writes the header.
    ///
    /// Nothing appears at `path` until [`finish`](Self::finish) succeeds.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or the header cannot be written
    pub fn create<P: AsRef<Path>>(path: P, header: &Header, build_index: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let temp = tempfile::Builder::new()
            .prefix(".minute-")
            .suffix(".bam")
            .tempfile_in(dir)
            .with_context(|| format!("Failed to create output BAM: {}", path.display()))?;
        let file = temp
            .reopen()
            .with_context(|| format!("Failed to create output BAM: {}", path.display()))?;
        let writer = bam_writer_over(file, header, &path)?;
        let enforce_order = is_coordinate_sorted(header);
        if build_index && !enforce_order {
            warn!("Header of {} is not coordinate sorted; no index will be written", path.display());
        }
        Ok(Self {
            writer,
            temp,
            header: header.clone(),
            path,
            enforce_order,
            build_index: build_index && enforce_order,
            last_key: None,
            written: 0,
        })
    }

    /// Writes one record.
    ///
    /// # Errors
    /// Returns [`MinuteError::Format`] if the record sorts before the previous one, or an I/O
    /// error from the underlying writer.
    pub fn write(&mut self, record: &RecordBuf) -> Result<()> {
        if self.enforce_order {
            let key = coordinate_key(record);
            if self.last_key.is_some_and(|last| key < last) {
                let name = record.name().map(ToString::to_string).unwrap_or_default();
                return Err(MinuteError::Format {
                    path: self.path.clone(),
                    record: self.written,
                    reason: format!("record '{name}' is out of coordinate order"),
                }
                .into());
            }
            self.last_key = Some(key);
        }
        self.writer
            .write_alignment_record(&self.header, record)
            .with_context(|| format!("Failed to write record to: {}", self.path.display()))?;
        self.written += 1;
        Ok(())
    }

    /// Number of records written so far.
    #[must_use]
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flushes the file, moves it to the output path and writes `<path>.bai` if requested.
    ///
    /// Returns the index path when one was written.
    ///
    /// # Errors
    /// Returns an error if flushing, indexing or renaming fails. The output path is left
    /// untouched in that case.
    pub fn finish(mut self) -> Result<Option<PathBuf>> {
        self.writer
            .finish(&self.header)
            .with_context(|| format!("Failed to finish: {}", self.path.display()))?;
        drop(self.writer);

        let index = if self.build_index {
            let index = bam::fs::index(self.temp.path())
                .with_context(|| format!("Failed to index: {}", self.path.display()))?;
            Some(index)
        } else {
            None
        };
        self.temp
            .persist(&self.path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to write output BAM: {}", self.path.display()))?;

        let Some(index) = index else {
            return Ok(None);
        };
        let index_path = bai_path(&self.path);
        write_bai_index(&index_path, &index)?;
        debug!("Wrote index {}", index_path.display());
        Ok(Some(index_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sam::builder::{
        PairBuilder, RecordBuilder, coordinate_sorted_header, read_bam, unsorted_header, write_bam,
    };
    use tempfile::TempDir;

    fn records() -> Vec<RecordBuf> {
        let (a1, a2) = PairBuilder::new().name("a").start1(100).start2(200).build();
        let (b1, b2) = PairBuilder::new().name("b").start1(150).start2(300).build();
        vec![a1, b1, a2, b2]
    }

    #[test]
    fn test_reader_yields_all_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("in.bam");
        let header = coordinate_sorted_header(&[("chr1", 10_000)]);
        write_bam(&path, &header, &records()).unwrap();

        let (mut reader, header) = create_bam_reader(&path).unwrap();
        let mut iter = alignment_records(&mut reader, &header, &path);
        let names: Vec<String> =
            iter.by_ref().map(|r| r.unwrap().name().unwrap().to_string()).collect();
        assert_eq!(names, vec!["a", "b", "a", "b"]);
        assert_eq!(iter.offset(), 4);
    }

    #[test]
    fn test_missing_input() {
        let result = create_bam_reader("/nonexistent/in.bam");
        assert!(result.err().unwrap().to_string().contains("Failed to open input BAM"));
    }

    #[test]
    fn test_ordered_writer_writes_index() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.bam");
        let header = coordinate_sorted_header(&[("chr1", 10_000)]);
        let mut writer = CoordinateOrderedWriter::create(&path, &header, true).unwrap();
        for record in records() {
            writer.write(&record).unwrap();
        }
        let unplaced = RecordBuilder::new().name("u").sequence("ACGT").unmapped(true).build();
        writer.write(&unplaced).unwrap();
        assert_eq!(writer.written(), 5);
        let index = writer.finish().unwrap();
        assert_eq!(index, Some(bai_path(&path)));
        assert!(bai_path(&path).exists());
        assert_eq!(read_bam(&path).unwrap().1.len(), 5);
    }

    #[test]
    fn test_unfinished_writer_leaves_no_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.bam");
        let header = coordinate_sorted_header(&[("chr1", 10_000)]);
        let mut writer = CoordinateOrderedWriter::create(&path, &header, true).unwrap();
        for record in records() {
            writer.write(&record).unwrap();
        }
        assert!(!path.exists());
        drop(writer);
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_finish_replaces_existing_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.bam");
        std::fs::write(&path, b"stale").unwrap();
        let header = coordinate_sorted_header(&[("chr1", 10_000)]);
        let mut writer = CoordinateOrderedWriter::create(&path, &header, false).unwrap();
        writer.write(&records()[0]).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"stale");
        writer.finish().unwrap();
        assert_eq!(read_bam(&path).unwrap().1.len(), 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_ordered_writer_rejects_out_of_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.bam");
        let header = coordinate_sorted_header(&[("chr1", 10_000)]);
        let mut writer = CoordinateOrderedWriter::create(&path, &header, false).unwrap();
        let late = RecordBuilder::mapped_read().name("late").sequence("ACGT").alignment_start(500).build();
        let early = RecordBuilder::mapped_read().name("early").sequence("ACGT").alignment_start(10).build();
        writer.write(&late).unwrap();
        let err = writer.write(&early).unwrap_err();
        let format = err.downcast_ref::<MinuteError>().unwrap();
        assert!(matches!(format, MinuteError::Format { record: 1, .. }));
        assert!(err.to_string().contains("early"));
    }

    #[test]
    fn test_unsorted_header_skips_order_and_index() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.bam");
        let header = unsorted_header(&[("chr1", 10_000)]);
        let mut writer = CoordinateOrderedWriter::create(&path, &header, true).unwrap();
        let late = RecordBuilder::mapped_read().name("late").sequence("ACGT").alignment_start(500).build();
        let early = RecordBuilder::mapped_read().name("early").sequence("ACGT").alignment_start(10).build();
        writer.write(&late).unwrap();
        writer.write(&early).unwrap();
        assert_eq!(writer.finish().unwrap(), None);
        assert!(!bai_path(&path).exists());
    }

    #[test]
    fn test_bai_path() {
        assert_eq!(bai_path(Path::new("/tmp/x.bam")), PathBuf::from("/tmp/x.bam.bai"));
    }
}
