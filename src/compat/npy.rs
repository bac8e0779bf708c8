//! Reader and writer for NumPy `.npy` arrays.
//!
//! Only two-dimensional arrays of 32-bit or 64-bit floats are
//! supported, in either byte order and in either C or Fortran order.
//! Whatever the on-disk layout, reading produces a standard-layout
//! `Array2<f32>`, so a matrix read from `.npy` is indistinguishable from
//! one read from delimited text.

use std::io::{Read, Write};
use std::mem;

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use ndarray::{Array2, ShapeBuilder};

use crate::error::{Error, Result};
use crate::util::padding;

const MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Total header lengths are aligned to this number of bytes.
const HEADER_ALIGNMENT: u64 = 64;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum DataType {
    F32,
    F64,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Endianness {
    Little,
    Big,
}

#[derive(Debug, Eq, PartialEq)]
struct Header {
    data_type: DataType,
    endianness: Endianness,
    fortran_order: bool,
    shape: (usize, usize),
}

impl Header {
    fn parse(header: &str) -> Result<Self> {
        let descr = dict_value(header, "descr")?;
        let descr = descr
            .trim_start_matches(|c: char| c == '\'' || c == '"')
            .split(|c: char| c == '\'' || c == '"')
            .next()
            .unwrap_or_default();
        let (endianness, data_type) = match descr {
            "<f4" => (Endianness::Little, DataType::F32),
            ">f4" => (Endianness::Big, DataType::F32),
            "<f8" => (Endianness::Little, DataType::F64),
            ">f8" => (Endianness::Big, DataType::F64),
            unknown => {
                return Err(Error::Format(format!(
                    "Unsupported array data type: {}",
                    unknown
                )))
            }
        };

        let fortran_order = dict_value(header, "fortran_order")?;
        let fortran_order = if fortran_order.starts_with("True") {
            true
        } else if fortran_order.starts_with("False") {
            false
        } else {
            return Err(Error::Format(format!(
                "Cannot parse array order: {}",
                fortran_order
            )));
        };

        let shape = dict_value(header, "shape")?;
        let shape_str = shape
            .strip_prefix('(')
            .and_then(|s| s.split(')').next())
            .ok_or_else(|| Error::Format(format!("Cannot parse array shape: {}", shape)))?;
        let shape = shape_str
            .split(',')
            .map(str::trim)
            .filter(|dim| !dim.is_empty())
            .map(|dim| {
                dim.parse::<usize>().map_err(|e| {
                    Error::Format(format!("Cannot parse array shape component '{}': {}", dim, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let shape = match shape.as_slice() {
            &[rows, cols] => (rows, cols),
            _ => {
                return Err(Error::Format(format!(
                    "Expected a two-dimensional array, got shape: ({})",
                    shape_str
                )))
            }
        };

        Ok(Header {
            data_type,
            endianness,
            fortran_order,
            shape,
        })
    }
}

/// Get the (unparsed) value following `'key':` in a header dictionary.
fn dict_value<'a>(header: &'a str, key: &str) -> Result<&'a str> {
    let quoted = format!("'{}'", key);
    let start = header
        .find(&quoted)
        .ok_or_else(|| Error::Format(format!("Array header does not contain '{}'", key)))?;
    let rest = header[start + quoted.len()..].trim_start();
    rest.strip_prefix(':')
        .map(str::trim_start)
        .ok_or_else(|| Error::Format(format!("Missing value for '{}' in array header", key)))
}

/// Read an embedding matrix from a NumPy array file.
pub trait ReadNpy
where
    Self: Sized,
{
    fn read_npy<R>(read: &mut R) -> Result<Self>
    where
        R: Read;
}

impl ReadNpy for Array2<f32> {
    fn read_npy<R>(read: &mut R) -> Result<Self>
    where
        R: Read,
    {
        let mut magic = [0u8; 6];
        read.read_exact(&mut magic)
            .map_err(|e| Error::read_error("Cannot read array magic", e))?;
        if &magic != MAGIC {
            return Err(Error::Format(String::from(
                "File does not have NumPy array magic",
            )));
        }

        let major = read
            .read_u8()
            .map_err(|e| Error::read_error("Cannot read array format version", e))?;
        // Minor version.
        read.read_u8()
            .map_err(|e| Error::read_error("Cannot read array format version", e))?;

        let header_len = match major {
            1 => read.read_u16::<LittleEndian>().map(usize::from),
            2 | 3 => read.read_u32::<LittleEndian>().map(|len| len as usize),
            _ => {
                return Err(Error::Format(format!(
                    "Unsupported array format version: {}",
                    major
                )))
            }
        }
        .map_err(|e| Error::read_error("Cannot read array header length", e))?;

        let mut header = vec![0; header_len];
        read.read_exact(&mut header)
            .map_err(|e| Error::read_error("Cannot read array header", e))?;
        let header = String::from_utf8(header)
            .map_err(|e| Error::Format(format!("Array header contains invalid UTF-8: {}", e)))?;
        let header = Header::parse(&header)?;

        let (rows, cols) = header.shape;
        let len = rows
            .checked_mul(cols)
            .ok_or_else(|| Error::Format(String::from("Array is too large")))?;
        let data = read_data(read, header.data_type, header.endianness, len)?;

        if header.fortran_order {
            let matrix = Array2::from_shape_vec((rows, cols).f(), data)?;
            Ok(matrix.as_standard_layout().into_owned())
        } else {
            Ok(Array2::from_shape_vec((rows, cols), data)?)
        }
    }
}

fn read_data<R>(
    read: &mut R,
    data_type: DataType,
    endianness: Endianness,
    len: usize,
) -> Result<Vec<f32>>
where
    R: Read,
{
    let component_size = match data_type {
        DataType::F32 => mem::size_of::<f32>(),
        DataType::F64 => mem::size_of::<f64>(),
    };
    let n_bytes = len
        .checked_mul(component_size)
        .ok_or_else(|| Error::Format(String::from("Array is too large")))?;

    // Only allocate for data that is actually present.
    let mut buf = Vec::new();
    read.by_ref()
        .take(n_bytes as u64)
        .read_to_end(&mut buf)
        .map_err(|e| Error::read_error("Cannot read array data", e))?;
    if buf.len() != n_bytes {
        return Err(Error::Format(format!(
            "Array data is truncated, expected {} bytes, got {}",
            n_bytes,
            buf.len()
        )));
    }

    let data = match data_type {
        DataType::F32 => {
            let mut data = vec![0f32; len];
            match endianness {
                Endianness::Little => LittleEndian::read_f32_into(&buf, &mut data),
                Endianness::Big => BigEndian::read_f32_into(&buf, &mut data),
            }
            data
        }
        DataType::F64 => {
            let mut data = vec![0f64; len];
            match endianness {
                Endianness::Little => LittleEndian::read_f64_into(&buf, &mut data),
                Endianness::Big => BigEndian::read_f64_into(&buf, &mut data),
            }
            data.into_iter().map(|v| v as f32).collect()
        }
    };

    if let Some(pos) = data.iter().position(|v| !v.is_finite()) {
        return Err(Error::Format(format!(
            "Array component {} is not finite: {}",
            pos, data[pos]
        )));
    }

    Ok(data)
}

/// Write an embedding matrix as a NumPy array file.
///
/// The array is written in format version 1.0 as little-endian
/// 32-bit floats in C order.
pub trait WriteNpy {
    fn write_npy<W>(&self, write: &mut W) -> Result<()>
    where
        W: Write;
}

impl WriteNpy for Array2<f32> {
    fn write_npy<W>(&self, write: &mut W) -> Result<()>
    where
        W: Write,
    {
        let (rows, cols) = self.dim();
        let mut header = format!(
            "{{'descr': '<f4', 'fortran_order': False, 'shape': ({}, {}), }}",
            rows, cols
        );

        // Magic (6 bytes), version (2 bytes), header length (2 bytes),
        // header, newline.
        let prefix_len = (MAGIC.len() + 4) as u64;
        let n_padding = padding(prefix_len + header.len() as u64 + 1, HEADER_ALIGNMENT);
        header.extend(std::iter::repeat(' ').take(n_padding as usize));
        header.push('\n');

        write
            .write_all(MAGIC)
            .map_err(|e| Error::write_error("Cannot write array magic", e))?;
        write
            .write_all(&[1, 0])
            .map_err(|e| Error::write_error("Cannot write array format version", e))?;
        write
            .write_u16::<LittleEndian>(header.len() as u16)
            .map_err(|e| Error::write_error("Cannot write array header length", e))?;
        write
            .write_all(header.as_bytes())
            .map_err(|e| Error::write_error("Cannot write array header", e))?;

        let mut buf = vec![0u8; self.len() * mem::size_of::<f32>()];
        for (chunk, &v) in buf.chunks_exact_mut(4).zip(self.iter()) {
            LittleEndian::write_f32(chunk, v);
        }
        write
            .write_all(&buf)
            .map_err(|e| Error::write_error("Cannot write array data", e))?;

        Ok(())
    }
}
