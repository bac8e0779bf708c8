//! Prelude exports the most commonly-used types and traits.

pub use crate::batch::{BatchRunner, Report, WriteReport};

pub use crate::compat::npy::{ReadNpy, WriteNpy};

pub use crate::compat::text::{ReadDelimited, WriteDelimited};

pub use crate::compat::MatrixFormat;

pub use crate::config::EvalConfig;

pub use crate::eval::{
    AnalogyBenchmark, AnalogyConfig, AnalogyDataset, EvaluationResult, SimilarityBenchmark,
    SimilarityDataset, SimilarityDatasetFormat,
};

pub use crate::similarity::{Analogy, EmbeddingSimilarity, WordSimilarity};

pub use crate::store::VectorStore;

pub use crate::vocab::{SimpleVocab, Vocab};
