//! Vector store: a vocabulary joined with its embedding matrix.

use std::path::Path;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::compat::{read_matrix, MatrixFormat};
use crate::error::{Error, Result};
use crate::util::{cosine_f64, l2_norms};
use crate::vocab::{LookupOptions, SimpleVocab, Vocab, VocabLookup};

/// Word embeddings with their vocabulary.
///
/// Row *i* of the matrix is the embedding of token *i* of the
/// vocabulary. The raw embeddings are stored unmodified; their l2
/// norms are stored alongside for cosine similarity computations.
#[derive(Clone, Debug)]
pub struct VectorStore {
    vocab: SimpleVocab,
    matrix: Array2<f32>,
    norms: Array1<f32>,
}

impl VectorStore {
    /// Construct a store from a matrix and its tokens.
    pub fn build(matrix: Array2<f32>, tokens: impl Into<Vec<String>>) -> Result<Self> {
        let tokens = tokens.into();
        if tokens.len() != matrix.nrows() {
            return Err(Error::DimensionMismatch {
                n_tokens: tokens.len(),
                n_rows: matrix.nrows(),
            });
        }

        Self::new(SimpleVocab::new(tokens)?, matrix)
    }

    /// Construct a store from a vocabulary and a matrix.
    pub fn new(vocab: SimpleVocab, matrix: Array2<f32>) -> Result<Self> {
        if vocab.words_len() != matrix.nrows() {
            return Err(Error::DimensionMismatch {
                n_tokens: vocab.words_len(),
                n_rows: matrix.nrows(),
            });
        }

        let norms = l2_norms(matrix.view());

        Ok(VectorStore {
            vocab,
            matrix,
            norms,
        })
    }

    /// Read the matrix from a file and construct a store.
    pub fn read(
        path: impl AsRef<Path>,
        format: MatrixFormat,
        tokens: impl Into<Vec<String>>,
    ) -> Result<Self> {
        Self::build(read_matrix(path, format)?, tokens)
    }

    /// Get the vocabulary.
    pub fn vocab(&self) -> &SimpleVocab {
        &self.vocab
    }

    /// Get a view of the embedding matrix.
    pub fn matrix(&self) -> ArrayView2<f32> {
        self.matrix.view()
    }

    /// Return the length (in vector components) of the embeddings.
    pub fn dims(&self) -> usize {
        self.matrix.ncols()
    }

    /// Get the embedding of a token.
    pub fn vector_of(&self, token: &str) -> Result<ArrayView1<f32>> {
        self.vocab
            .idx(token)
            .map(|idx| self.matrix.row(idx))
            .ok_or_else(|| Error::UnknownToken(token.to_owned()))
    }

    /// Get the embeddings of a batch of tokens.
    ///
    /// Row *i* of the result is the embedding of `tokens[i]`.
    pub fn vectors_of(&self, tokens: &[&str]) -> Result<Array2<f32>> {
        let indices = tokens
            .iter()
            .map(|&token| {
                self.vocab
                    .idx(token)
                    .ok_or_else(|| Error::UnknownToken(token.to_owned()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(self.matrix.select(Axis(0), &indices))
    }

    /// Cosine similarity of the embeddings of two tokens.
    pub fn cosine_similarity(&self, token1: &str, token2: &str) -> Result<f32> {
        let idx1 = self
            .vocab
            .idx(token1)
            .ok_or_else(|| Error::UnknownToken(token1.to_owned()))?;
        let idx2 = self
            .vocab
            .idx(token2)
            .ok_or_else(|| Error::UnknownToken(token2.to_owned()))?;
        Ok(self.cosine_idx(idx1, idx2) as f32)
    }

    /// Restricted and/or case-folded view of the vocabulary.
    pub fn lookup(&self, options: LookupOptions) -> VocabLookup {
        VocabLookup::new(&self.vocab, options)
    }

    pub(crate) fn embedding(&self, idx: usize) -> ArrayView1<f32> {
        self.matrix.row(idx)
    }

    pub(crate) fn norms(&self) -> ArrayView1<f32> {
        self.norms.view()
    }

    pub(crate) fn cosine_idx(&self, idx1: usize, idx2: usize) -> f64 {
        cosine_f64(self.matrix.row(idx1), self.matrix.row(idx2))
    }
}
