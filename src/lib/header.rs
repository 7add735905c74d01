//! @PG (program) records for output BAM headers.
//!
//! Every BAM written by minute gets a @PG record chained to the last program already in the
//! header through its PP tag. The ID is `minute`, or `minute.1`, `minute.2`, ... when the
//! header already went through minute before (projection and propagation both add one).

use anyhow::Result;
use bstr::BString;
use noodles::sam::Header;
use noodles::sam::header::record::value::Map;
use noodles::sam::header::record::value::map::Program;
use noodles::sam::header::record::value::map::program::tag;
use std::collections::HashSet;

/// Program name and base ID of minute's @PG records.
pub const PROGRAM_NAME: &str = "minute";

/// Get the ID of the last program in the @PG chain (for PP chaining).
///
/// Finds the program that is not referenced by any other program's PP tag,
/// i.e., the "leaf" of the chain.
#[must_use]
pub fn get_last_program_id(header: &Header) -> Option<String> {
    let programs = header.programs();
    let program_map = programs.as_ref();

    if program_map.is_empty() {
        return None;
    }

    let mut referenced: HashSet<&[u8]> = HashSet::new();
    for (_id, pg) in program_map {
        if let Some(pp) = pg.other_fields().get(&tag::PREVIOUS_PROGRAM_ID) {
            referenced.insert(pp.as_ref());
        }
    }

    // The most recently added leaf wins when the chain is broken.
    program_map
        .keys()
        .rev()
        .find(|id| !referenced.contains(id.as_slice()))
        .or_else(|| program_map.keys().last())
        .map(|id| String::from_utf8_lossy(id).to_string())
}

/// Create a unique program ID by appending .1, .2, etc. if needed.
#[must_use]
pub fn make_unique_program_id(header: &Header, base_id: &str) -> String {
    let programs = header.programs();
    let program_map = programs.as_ref();

    if !program_map.contains_key(base_id.as_bytes()) {
        return base_id.to_string();
    }

    (1..)
        .map(|i| format!("{base_id}.{i}"))
        .find(|candidate| !program_map.contains_key(candidate.as_bytes()))
        .unwrap_or_else(|| base_id.to_string())
}

/// Build a @PG record for minute.
///
/// # Errors
///
/// Returns an error if the program record cannot be built.
pub fn build_program_record(
    version: &str,
    command_line: &str,
    previous_program: Option<&str>,
) -> Result<Map<Program>> {
    let mut builder = Map::<Program>::builder()
        .insert(tag::NAME, PROGRAM_NAME)
        .insert(tag::VERSION, version)
        .insert(tag::COMMAND_LINE, command_line);

    if let Some(pp) = previous_program {
        builder = builder.insert(tag::PREVIOUS_PROGRAM_ID, pp);
    }

    Ok(builder.build()?)
}

/// Add a @PG record to an existing header with automatic PP chaining.
///
/// # Errors
///
/// Returns an error if the program record cannot be added to the header.
pub fn add_pg_record(mut header: Header, version: &str, command_line: &str) -> Result<Header> {
    let previous_program = get_last_program_id(&header);
    let unique_id = make_unique_program_id(&header, PROGRAM_NAME);
    let pg_record = build_program_record(version, command_line, previous_program.as_deref())?;

    header.programs_mut().add(BString::from(unique_id), pg_record)?;

    Ok(header)
}

/// Version and command line recorded in the @PG record of each output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramInfo {
    /// minute version.
    pub version: String,
    /// The full command line of the invocation.
    pub command_line: String,
}

impl ProgramInfo {
    /// Creates program information for the running binary.
    #[must_use]
    pub fn new(version: &str, command_line: &str) -> Self {
        Self { version: version.to_string(), command_line: command_line.to_string() }
    }

    /// Adds a @PG record for this program to `header`.
    ///
    /// # Errors
    ///
    /// Returns an error if the program record cannot be added to the header.
    pub fn apply(&self, header: Header) -> Result<Header> {
        add_pg_record(header, &self.version, &self.command_line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_last_program_id_empty() {
        assert_eq!(get_last_program_id(&Header::default()), None);
    }

    #[test]
    fn test_get_last_program_id_chained() {
        let mut header = Header::default();
        header.programs_mut().add(BString::from("bowtie2"), Map::<Program>::default()).unwrap();
        let pg2 =
            Map::<Program>::builder().insert(tag::PREVIOUS_PROGRAM_ID, "bowtie2").build().unwrap();
        header.programs_mut().add(BString::from("samtools"), pg2).unwrap();

        assert_eq!(get_last_program_id(&header), Some("samtools".to_string()));
    }

    #[test]
    fn test_make_unique_program_id() {
        let mut header = Header::default();
        assert_eq!(make_unique_program_id(&header, "minute"), "minute");
        header.programs_mut().add(BString::from("minute"), Map::<Program>::default()).unwrap();
        assert_eq!(make_unique_program_id(&header, "minute"), "minute.1");
        header.programs_mut().add(BString::from("minute.1"), Map::<Program>::default()).unwrap();
        assert_eq!(make_unique_program_id(&header, "minute"), "minute.2");
    }

    #[test]
    fn test_add_pg_record_empty_header() {
        let result = add_pg_record(Header::default(), "0.1.0", "minute proxy -i in.bam").unwrap();
        let programs = result.programs();
        let pg = programs.as_ref().get(b"minute".as_slice()).unwrap();
        assert_eq!(
            pg.other_fields().get(&tag::NAME).map(std::convert::AsRef::as_ref),
            Some(b"minute".as_slice())
        );
        assert_eq!(
            pg.other_fields().get(&tag::VERSION).map(std::convert::AsRef::as_ref),
            Some(b"0.1.0".as_slice())
        );
        assert_eq!(
            pg.other_fields().get(&tag::COMMAND_LINE).map(std::convert::AsRef::as_ref),
            Some(b"minute proxy -i in.bam".as_slice())
        );
        assert!(pg.other_fields().get(&tag::PREVIOUS_PROGRAM_ID).is_none());
    }

    #[test]
    fn test_add_pg_record_twice_chains() {
        let header = add_pg_record(Header::default(), "0.1.0", "minute proxy").unwrap();
        let header = add_pg_record(header, "0.1.0", "minute propagate").unwrap();
        let programs = header.programs();
        assert_eq!(programs.as_ref().len(), 2);
        let pg = programs.as_ref().get(b"minute.1".as_slice()).unwrap();
        assert_eq!(
            pg.other_fields().get(&tag::PREVIOUS_PROGRAM_ID).map(std::convert::AsRef::as_ref),
            Some(b"minute".as_slice())
        );
    }

    #[test]
    fn test_add_pg_record_chains_to_aligner() {
        let mut header = Header::default();
        let aligner = Map::<Program>::builder()
            .insert(tag::NAME, "bowtie2")
            .insert(tag::VERSION, "2.5.1")
            .build()
            .unwrap();
        header.programs_mut().add(BString::from("bowtie2"), aligner).unwrap();

        let result = add_pg_record(header, "0.1.0", "minute proxy").unwrap();
        let programs = result.programs();
        let pg = programs.as_ref().get(b"minute".as_slice()).unwrap();
        assert_eq!(
            pg.other_fields().get(&tag::PREVIOUS_PROGRAM_ID).map(std::convert::AsRef::as_ref),
            Some(b"bowtie2".as_slice())
        );
    }
}
