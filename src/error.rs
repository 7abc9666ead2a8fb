use std::io;

use thiserror::Error;

/// Everything that can go wrong while reading, transforming or writing a profile.
///
/// Every routine in this crate fails on the first structural problem it finds. None of them
/// produce partial output.
#[derive(Error, Debug)]
pub enum Error {
    /// Reading the input or writing the output failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A line does not match the grammar of the input format.
    #[error("bad line {line}: {text:?}: {reason}")]
    Format {
        /// 1-based line number.
        line: usize,
        /// The offending line.
        text: String,
        /// What was expected.
        reason: String,
    },

    /// The input does not start like a profile this parser understands.
    #[error("unrecognized profile format")]
    UnrecognizedFormat,

    /// A numeric token failed to parse, or a line carries the wrong number of values.
    #[error("bad value on line {line}: {text:?}: {reason}")]
    Value {
        /// 1-based line number.
        line: usize,
        /// The offending line.
        text: String,
        /// What went wrong.
        reason: String,
    },

    /// The graph violates one of its consistency invariants.
    #[error("invalid profile: {0}")]
    Validation(String),

    /// A transform needs a sample type the profile does not have.
    #[error("missing sample type: {kind}/{unit}")]
    MissingSampleType {
        /// The sample type's kind, e.g. `contentions`.
        kind: String,
        /// The sample type's unit, e.g. `count`.
        unit: String,
    },

    /// A sample has no value slot for a sample type a transform needs.
    #[error("sample {sample} has no {kind}/{unit} value")]
    MissingValue {
        /// Index of the sample.
        sample: usize,
        /// The sample type's kind.
        kind: String,
        /// The sample type's unit.
        unit: String,
    },

    /// Two profiles cannot be combined.
    #[error("incompatible profiles: {0}")]
    IncompatibleProfiles(String),

    /// A command received the wrong number of input documents.
    #[error("{command} expects {expected} input(s), got {got}")]
    UnsupportedCombination {
        /// Name of the command.
        command: &'static str,
        /// Number of inputs the command takes.
        expected: usize,
        /// Number of inputs it was given.
        got: usize,
    },

    /// A transform was configured with a value it cannot use.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The JSON form of a profile could not be read or written.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Shorthand for results carrying an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn format(line: usize, text: &str, reason: impl Into<String>) -> Self {
        Error::Format {
            line,
            text: text.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn value(line: usize, text: &str, reason: impl Into<String>) -> Self {
        Error::Value {
            line,
            text: text.to_string(),
            reason: reason.into(),
        }
    }
}
