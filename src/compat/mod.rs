//! Embedding matrix formats.

use std::path::Path;

use ndarray::Array2;

use crate::error::{Error, Result};
use crate::util::open_file;

pub mod npy;
use self::npy::ReadNpy;

pub mod text;
use self::text::ReadDelimited;

/// Embedding matrix file formats.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MatrixFormat {
    /// Delimited text with the given component delimiter.
    Delimited(char),

    /// NumPy array file.
    Npy,
}

impl MatrixFormat {
    /// Parse a format name (`npy`, `csv`, `tsv` or `text`).
    ///
    /// `text` uses whitespace as the delimiter.
    pub fn try_from(format: impl AsRef<str>) -> Result<Self> {
        use self::MatrixFormat::*;

        match format.as_ref() {
            "npy" => Ok(Npy),
            "csv" => Ok(Delimited(',')),
            "tsv" => Ok(Delimited('\t')),
            "text" => Ok(Delimited(' ')),
            unknown => Err(Error::Format(format!("Unknown matrix format: {}", unknown))),
        }
    }

    /// Guess the format from a file extension.
    ///
    /// Files ending in `.npy` are NumPy arrays, anything else is read
    /// as delimited text using `delimiter`.
    pub fn from_path(path: impl AsRef<Path>, delimiter: char) -> Self {
        match path.as_ref().extension().and_then(|ext| ext.to_str()) {
            Some("npy") => MatrixFormat::Npy,
            _ => MatrixFormat::Delimited(delimiter),
        }
    }
}

/// Read an embedding matrix file.
pub fn read_matrix(path: impl AsRef<Path>, format: MatrixFormat) -> Result<Array2<f32>> {
    let path = path.as_ref();
    let mut reader = open_file(path)?;

    match format {
        MatrixFormat::Delimited(delimiter) => Array2::read_delimited(&mut reader, delimiter),
        MatrixFormat::Npy => Array2::read_npy(&mut reader),
    }
    .map_err(|e| e.in_file(path))
}
