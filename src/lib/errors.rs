//! Custom error types for minute operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for minute operations
pub type Result<T> = std::result::Result<T, MinuteError>;

/// Error type for minute operations
#[derive(Error, Debug)]
pub enum MinuteError {
    /// The experiment description or run configuration is inconsistent or incomplete
    #[error("Configuration error in {source_name}: {reason}")]
    Config {
        /// File or field the problem was found in
        source_name: String,
        /// Explanation of the problem
        reason: String,
    },

    /// A reconstructed proxy identifier matched more than one proxy record
    #[error("Proxy identifier '{identifier}' occurs {count} times in the proxy alignments")]
    AmbiguousProxy {
        /// The proxy identifier
        identifier: String,
        /// Number of proxy records carrying it
        count: u32,
    },

    /// A treatment or control has no mapped reads
    #[error("Insufficient coverage: {library} has zero mapped reads ({role})")]
    InsufficientCoverage {
        /// The library or pool without reads
        library: String,
        /// Whether it is the treatment or the control of the pair
        role: &'static str,
    },

    /// Malformed alignment or metrics input
    #[error("Malformed input '{}' at record {record}: {reason}", path.display())]
    Format {
        /// The offending file
        path: PathBuf,
        /// 0-based record (or line) offset
        record: u64,
        /// Explanation of the problem
        reason: String,
    },

    /// Invalid parameter value provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// The parameter name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },
}

impl MinuteError {
    /// Shorthand for a [`MinuteError::Config`].
    pub fn config(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config { source_name: source_name.into(), reason: reason.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let error = MinuteError::config("libraries.tsv", "library 'h3k4_rep1' is missing a replicate");
        let msg = format!("{error}");
        assert!(msg.contains("libraries.tsv"));
        assert!(msg.contains("h3k4_rep1"));
    }

    #[test]
    fn test_ambiguous_proxy() {
        let error = MinuteError::AmbiguousProxy { identifier: "readX_1p".to_string(), count: 2 };
        assert_eq!(error.to_string(), "Proxy identifier 'readX_1p' occurs 2 times in the proxy alignments");
    }

    #[test]
    fn test_insufficient_coverage() {
        let error =
            MinuteError::InsufficientCoverage { library: "input_rep1".to_string(), role: "control" };
        let msg = format!("{error}");
        assert!(msg.contains("input_rep1"));
        assert!(msg.contains("control"));
    }

    #[test]
    fn test_format_error() {
        let error = MinuteError::Format {
            path: PathBuf::from("/data/sample.bam"),
            record: 42,
            reason: "truncated record".to_string(),
        };
        let msg = format!("{error}");
        assert!(msg.contains("/data/sample.bam"));
        assert!(msg.contains("record 42"));
    }
}
