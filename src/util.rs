use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ndarray::{Array1, ArrayView1, ArrayView2};

use crate::error::{Error, Result};

pub fn l2_norm(v: ArrayView1<f32>) -> f32 {
    v.dot(&v).sqrt()
}

pub fn l2_norms(m: ArrayView2<f32>) -> Array1<f32> {
    m.outer_iter().map(l2_norm).collect()
}

/// Cosine similarity, defined as 0 when either vector has norm 0.
pub fn cosine(dot: f32, norm1: f32, norm2: f32) -> f32 {
    if norm1 == 0. || norm2 == 0. {
        0.
    } else {
        dot / (norm1 * norm2)
    }
}

/// Cosine similarity of two vectors, accumulated in double precision.
///
/// Components that are finite in `f32` cannot overflow the dot product
/// or the norms. Defined as 0 when either vector has norm 0.
pub fn cosine_f64(u: ArrayView1<f32>, v: ArrayView1<f32>) -> f64 {
    let (mut dot, mut sq_norm1, mut sq_norm2) = (0f64, 0f64, 0f64);
    for (&a, &b) in u.iter().zip(v) {
        let (a, b) = (f64::from(a), f64::from(b));
        dot += a * b;
        sq_norm1 += a * a;
        sq_norm2 += b * b;
    }

    if sq_norm1 == 0. || sq_norm2 == 0. {
        0.
    } else {
        (dot / (sq_norm1.sqrt() * sq_norm2.sqrt())).max(-1.).min(1.)
    }
}

/// Number of padding bytes to align `pos` at a multiple of `alignment`.
pub fn padding(pos: u64, alignment: u64) -> u64 {
    match pos % alignment {
        0 => 0,
        rem => alignment - rem,
    }
}

pub fn open_file(path: impl AsRef<Path>) -> Result<BufReader<File>> {
    let path = path.as_ref();
    let f = File::open(path)
        .map_err(|e| Error::read_error(format!("Cannot open {}", path.display()), e))?;
    Ok(BufReader::new(f))
}

/// Iterator over the lines of a reader, with 1-based line numbers.
///
/// Line endings (`\n` or `\r\n`) are stripped.
pub struct NumberedLines<R> {
    reader: R,
    line_no: usize,
}

impl<R> NumberedLines<R>
where
    R: BufRead,
{
    pub fn new(reader: R) -> Self {
        NumberedLines { reader, line_no: 0 }
    }
}

impl<R> Iterator for NumberedLines<R>
where
    R: BufRead,
{
    type Item = Result<(usize, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buf = Vec::new();
        match self.reader.read_until(b'\n', &mut buf) {
            Ok(0) => return None,
            Ok(_) => (),
            Err(e) => return Some(Err(Error::read_error("Cannot read line", e))),
        }
        self.line_no += 1;

        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }

        let line_no = self.line_no;
        Some(
            String::from_utf8(buf)
                .map(|line| (line_no, line))
                .map_err(|e| Error::malformed(line_no, format!("Invalid UTF-8: {}", e))),
        )
    }
}
