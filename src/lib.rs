//! A library for evaluating word embeddings.
//!
//! embeval evaluates embedding matrices against word analogy and word
//! similarity benchmarks. An embedding matrix is a plain matrix (in
//! delimited text or NumPy format) whose rows are the embeddings of a
//! separately stored token list. A [`VectorStore`](store::VectorStore)
//! joins the tokens with their embeddings, the benchmarks in
//! [`eval`] compute accuracies and correlations, and a
//! [`BatchRunner`](batch::BatchRunner) evaluates all matrices in a
//! directory into a single report.

pub mod batch;

pub mod compat;

pub mod config;

pub mod error;

pub mod eval;

pub mod prelude;

pub mod similarity;

pub mod store;

pub(crate) mod util;

pub mod vocab;
