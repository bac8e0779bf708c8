//! Error type and `Result` alias used throughout the crate.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use ndarray::ShapeError;
use thiserror::Error;

/// `Result` type alias for operations that can fail.
pub type Result<T> = ::std::result::Result<T, Error>;

/// Evaluation errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The vocabulary and the embedding matrix disagree in size.
    #[error("Vocabulary has {n_tokens} tokens, but the matrix has {n_rows} rows")]
    DimensionMismatch { n_tokens: usize, n_rows: usize },

    /// A token could not be found in the vocabulary.
    #[error("Unknown token: {0}")]
    UnknownToken(String),

    /// A bucket of the analogy evaluation has no evaluated items.
    #[error("No evaluated analogies in bucket: {0}")]
    EmptyCategory(String),

    /// Not enough data to compute a correlation.
    #[error("Insufficient data for correlation: {0}")]
    InsufficientData(String),

    /// A line in an input file could not be parsed.
    #[error("{location}: {desc}")]
    MalformedInput { location: Location, desc: String },

    /// Invalid file format.
    #[error("{0}")]
    Format(String),

    /// A directory does not contain embedding matrices.
    #[error("No files with extension '{extension}' in {}", .dir.display())]
    NoMatrixFiles { dir: PathBuf, extension: String },

    /// Configuration could not be deserialized.
    #[error("Cannot parse configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// Read error.
    #[error("{desc}: {error}")]
    Read {
        desc: String,
        #[source]
        error: io::Error,
    },

    /// Write error.
    #[error("{desc}: {error}")]
    Write {
        desc: String,
        #[source]
        error: io::Error,
    },

    /// `ndarray` shape error.
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

impl Error {
    pub fn read_error(desc: impl Into<String>, error: io::Error) -> Self {
        Error::Read {
            desc: desc.into(),
            error,
        }
    }

    pub fn write_error(desc: impl Into<String>, error: io::Error) -> Self {
        Error::Write {
            desc: desc.into(),
            error,
        }
    }

    pub(crate) fn malformed(line: usize, desc: impl Into<String>) -> Self {
        Error::MalformedInput {
            location: Location { file: None, line },
            desc: desc.into(),
        }
    }

    /// Attach a file name to the error.
    ///
    /// Only `MalformedInput` errors carry a file name, other errors
    /// are returned as-is.
    pub fn in_file(self, path: impl AsRef<Path>) -> Self {
        match self {
            Error::MalformedInput { location, desc } => Error::MalformedInput {
                location: Location {
                    file: Some(path.as_ref().to_owned()),
                    line: location.line,
                },
                desc,
            },
            err => err,
        }
    }
}

/// Location of a malformed line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Location {
    pub file: Option<PathBuf>,

    /// Line number, starting at 1.
    pub line: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.file {
            Some(ref file) => write!(f, "{}:{}", file.display(), self.line),
            None => write!(f, "line {}", self.line),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{Error, Location};

    #[test]
    fn in_file_sets_location_of_malformed_input() {
        let err = Error::malformed(3, "Cannot parse score").in_file("pairs.tab");
        match err {
            Error::MalformedInput { location, .. } => assert_eq!(
                location,
                Location {
                    file: Some(PathBuf::from("pairs.tab")),
                    line: 3
                }
            ),
            err => panic!("Unexpected error: {}", err),
        }
    }

    #[test]
    fn malformed_input_message_contains_location() {
        let err = Error::malformed(7, "Expected 3 fields").in_file("simlex.txt");
        assert_eq!(err.to_string(), "simlex.txt:7: Expected 3 fields");
        let err = Error::malformed(7, "Expected 3 fields");
        assert_eq!(err.to_string(), "line 7: Expected 3 fields");
    }

    #[test]
    fn in_file_leaves_other_errors_alone() {
        let err = Error::UnknownToken("queen".to_owned()).in_file("tokens.txt");
        assert!(matches!(err, Error::UnknownToken(ref token) if token == "queen"));
    }
}
