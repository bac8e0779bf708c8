//! Embedding benchmarks.

mod analogy;
pub use self::analogy::{
    AnalogyAccuracy, AnalogyBenchmark, AnalogyCategory, AnalogyConfig, AnalogyDataset,
    AnalogyEvaluation, AnalogyItem, CategoryCounts, ANALOGY_METRICS, TOTAL_CATEGORY,
};

mod result;
pub use self::result::{EvaluationResult, Metric};

pub mod stats;

mod wordsim;
pub use self::wordsim::{
    SimilarityBenchmark, SimilarityDataset, SimilarityDatasetFormat, SimilarityPair,
    SimilarityScores, SIMILARITY_METRICS,
};
