//! Error types reported by the pseudo-file parsers
//!
//! Callers usually want to tell two situations apart: the pseudo-file could
//! not be read in full (a transient condition, e.g. the process exited while
//! we were reading its status), or it was read but did not have the expected
//! shape (a kernel format change, which retrying will not fix).

use std::io;
use thiserror::Error;


/// Failure of a pseudo-file parse
#[derive(Debug, Error)]
pub enum Error {
    /// The underlying stream could not be read
    #[error("failed to read pseudo-file: {0}")]
    Io(#[from] io::Error),

    /// The stream ended while we were still looking for a labeled line
    #[error("end of input reached while looking for the \"{label}\" line")]
    UnexpectedEof { label: String },

    /// A tagged line was read, but its contents did not have the right shape
    #[error("malformed \"{tag}\" record on line {line_number}: {fault}")]
    MalformedLine {
        line_number: usize,
        tag: String,
        fault: LineFault,
    },
}
//
impl Error {
    /// Tell whether the input could not be (fully) read
    pub fn is_input_failure(&self) -> bool {
        match *self {
            Error::Io(_) | Error::UnexpectedEof { .. } => true,
            Error::MalformedLine { .. } => false,
        }
    }

    /// Tell whether the input was read, but did not match the expected shape
    pub fn is_malformed(&self) -> bool {
        !self.is_input_failure()
    }
}

/// Result type used throughout this crate
pub type Result<T> = std::result::Result<T, Error>;


/// What went wrong with a single line of a tagged pseudo-file
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum LineFault {
    /// The line ended before all expected counters were read
    #[error("missing counter \"{field}\" ({found} of {expected} present)")]
    MissingCounter {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    /// A column could not be parsed as an unsigned counter
    #[error("counter \"{field}\" has non-numeric value \"{token}\"")]
    InvalidCounter { field: &'static str, token: String },

    /// A variable-length record did not declare its counter count
    #[error("missing declared counter count")]
    MissingCount,
}


/// Rejection of a field scanner template
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum TemplateError {
    /// The template has no label token
    #[error("field scanner template is empty")]
    Empty,

    /// The label position holds a value slot
    #[error("field scanner template \"{0}\" starts with a value slot")]
    SlotAsLabel(String),

    /// A "%" marker that we do not know how to scan
    #[error("unknown slot marker \"{marker}\" in template \"{template}\"")]
    UnknownSlot { template: String, marker: String },

    /// The record targets do not line up with the template's value slots
    #[error("record targets do not match the value slots of template \"{0}\"")]
    TargetMismatch(String),
}


/// Unit tests
#[cfg(test)]
mod tests {
    use std::io;
    use super::{Error, LineFault};

    /// Check the split between input failures and malformed input
    #[test]
    fn error_classes() {
        let io_error = Error::from(io::Error::new(io::ErrorKind::Other, "gone"));
        assert!(io_error.is_input_failure());
        assert!(!io_error.is_malformed());

        let eof = Error::UnexpectedEof { label: "VmRSS:".to_owned() };
        assert!(eof.is_input_failure());

        let malformed = Error::MalformedLine {
            line_number: 1,
            tag: "rc".to_owned(),
            fault: LineFault::MissingCount,
        };
        assert!(malformed.is_malformed());
        assert!(!malformed.is_input_failure());
    }

    /// Check that messages carry enough context to locate the problem
    #[test]
    fn error_messages() {
        let malformed = Error::MalformedLine {
            line_number: 3,
            tag: "rc".to_owned(),
            fault: LineFault::MissingCounter {
                field: "no_cache",
                expected: 3,
                found: 2,
            },
        };
        assert_eq!(
            malformed.to_string(),
            "malformed \"rc\" record on line 3: \
             missing counter \"no_cache\" (2 of 3 present)"
        );
    }
}
