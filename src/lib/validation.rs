//! Command-line parameter and input path validation.
//!
//! Failures are [`MinuteError::InvalidParameter`] naming the parameter, so commands can
//! report them before any output file is created.

use std::fmt::Display;
use std::path::Path;

use crate::errors::{MinuteError, Result};

/// Validate that an input file exists.
///
/// ```
/// use minute_lib::validation::validate_file_exists;
///
/// assert!(validate_file_exists("/nonexistent/file.bam", "input").is_err());
/// ```
pub fn validate_file_exists<P: AsRef<Path>>(path: P, parameter: &str) -> Result<()> {
    let path_ref = path.as_ref();
    if !path_ref.is_file() {
        return Err(MinuteError::InvalidParameter {
            parameter: parameter.to_string(),
            reason: format!("file does not exist: {}", path_ref.display()),
        });
    }
    Ok(())
}

/// Validate that every `(path, parameter)` pair names an existing file.
pub fn validate_files_exist<P: AsRef<Path>>(files: &[(P, &str)]) -> Result<()> {
    for (path, parameter) in files {
        validate_file_exists(path, parameter)?;
    }
    Ok(())
}

/// Validate that a directory exists.
pub fn validate_dir_exists<P: AsRef<Path>>(path: P, parameter: &str) -> Result<()> {
    let path_ref = path.as_ref();
    if !path_ref.is_dir() {
        return Err(MinuteError::InvalidParameter {
            parameter: parameter.to_string(),
            reason: format!("directory does not exist: {}", path_ref.display()),
        });
    }
    Ok(())
}

/// Validate that a value is positive (> 0).
///
/// ```
/// use minute_lib::validation::validate_positive;
///
/// validate_positive(150, "fragment-size").unwrap();
/// assert!(validate_positive(0, "fragment-size").is_err());
/// ```
#[allow(clippy::needless_pass_by_value)]
pub fn validate_positive<T: Ord + Display + Default>(value: T, parameter: &str) -> Result<()> {
    if value <= T::default() {
        return Err(MinuteError::InvalidParameter {
            parameter: parameter.to_string(),
            reason: format!("Must be positive (> 0), got: {value}"),
        });
    }
    Ok(())
}

/// Validate that two slices have the same length.
pub fn validate_same_length<A, B>(a: &[A], a_name: &str, b: &[B], b_name: &str) -> Result<()> {
    if a.len() != b.len() {
        return Err(MinuteError::InvalidParameter {
            parameter: b_name.to_string(),
            reason: format!("{} values given but {a_name} has {}", b.len(), a.len()),
        });
    }
    Ok(())
}
