//! Readers and writers for delimited text matrices.
//!
//! In this format, each line contains one embedding, with vector
//! components separated by a delimiter (a comma by default). The
//! file does not contain tokens: line *i* is the embedding of token
//! *i* of a separately stored vocabulary. For example:
//!
//! ```
//! use std::io::Cursor;
//!
//! use embeval::prelude::*;
//! use ndarray::Array2;
//!
//! let mut reader = Cursor::new("0.5,1.0\n-1.0,0.25\n");
//! let matrix = Array2::read_delimited(&mut reader, ',').unwrap();
//! assert_eq!(matrix.dim(), (2, 2));
//! ```

use std::io::{BufRead, Write};

use itertools::Itertools;
use ndarray::Array2;

use crate::error::{Error, Result};
use crate::util::NumberedLines;

/// Read an embedding matrix from delimited text.
pub trait ReadDelimited<R>
where
    Self: Sized,
    R: BufRead,
{
    /// Read the matrix from the given buffered reader.
    ///
    /// If `delimiter` is whitespace, components are separated by any
    /// amount of ASCII whitespace.
    fn read_delimited(reader: &mut R, delimiter: char) -> Result<Self>;
}

impl<R> ReadDelimited<R> for Array2<f32>
where
    R: BufRead,
{
    fn read_delimited(reader: &mut R, delimiter: char) -> Result<Self> {
        let mut data = Vec::new();
        let mut dims = None;
        let mut n_rows = 0;

        for line in NumberedLines::new(reader) {
            let (line_no, line) = line?;
            if line.trim().is_empty() {
                return Err(Error::malformed(line_no, "Spurious empty line"));
            }

            let row_start = data.len();
            if delimiter.is_ascii_whitespace() {
                parse_components(line.split_ascii_whitespace(), line_no, &mut data)?;
            } else {
                parse_components(line.split(delimiter), line_no, &mut data)?;
            }

            let row_dims = data.len() - row_start;
            match dims {
                None => dims = Some(row_dims),
                Some(dims) if dims != row_dims => {
                    return Err(Error::malformed(
                        line_no,
                        format!(
                            "Incorrect embedding dimensionality, expected: {}, got: {}",
                            dims, row_dims
                        ),
                    ))
                }
                Some(_) => (),
            }

            n_rows += 1;
        }

        Ok(Array2::from_shape_vec(
            (n_rows, dims.unwrap_or(0)),
            data,
        )?)
    }
}

fn parse_components<'a>(
    parts: impl Iterator<Item = &'a str>,
    line_no: usize,
    data: &mut Vec<f32>,
) -> Result<()> {
    for part in parts {
        let part = part.trim();
        let component: f32 = part.parse().map_err(|e| {
            Error::malformed(
                line_no,
                format!("Cannot parse vector component '{}': {}", part, e),
            )
        })?;
        if !component.is_finite() {
            return Err(Error::malformed(
                line_no,
                format!("Vector component is not finite: {}", part),
            ));
        }
        data.push(component);
    }

    Ok(())
}

/// Write an embedding matrix as delimited text.
pub trait WriteDelimited<W>
where
    W: Write,
{
    /// Write the matrix, one row per line.
    fn write_delimited(&self, writer: &mut W, delimiter: char) -> Result<()>;
}

impl<W> WriteDelimited<W> for Array2<f32>
where
    W: Write,
{
    fn write_delimited(&self, write: &mut W, delimiter: char) -> Result<()> {
        let delimiter = delimiter.to_string();
        for row in self.outer_iter() {
            let row_str = row.iter().map(ToString::to_string).join(&delimiter);
            writeln!(write, "{}", row_str)
                .map_err(|e| Error::write_error("Cannot write embedding", e))?;
        }

        Ok(())
    }
}
