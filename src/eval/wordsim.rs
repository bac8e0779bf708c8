//! Word similarity benchmark.
//!
//! Word similarity datasets (WordSim-353, SimLex-999, ...) contain word
//! pairs with human similarity judgments. The benchmark correlates the
//! cosine similarities of the embeddings with these judgments.

use std::collections::BTreeSet;
use std::iter;
use std::io::BufRead;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::eval::result::EvaluationResult;
use crate::eval::stats::{pearson, spearman, Correlation};
use crate::store::VectorStore;
use crate::util::{open_file, NumberedLines};
use crate::vocab::{LookupOptions, Vocab};

/// Names of the similarity evaluation metrics, in output order.
pub const SIMILARITY_METRICS: &[&str] = &[
    "pearson_corr",
    "pearson_pvalue",
    "spearman_corr",
    "spearman_pvalue",
    "oov_ratio",
];

/// A word pair with its human similarity score.
#[derive(Clone, Debug, PartialEq)]
pub struct SimilarityPair {
    pub word1: String,
    pub word2: String,
    pub score: f64,
}

/// Layout of a similarity dataset file.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct SimilarityDatasetFormat {
    /// Field delimiter. A space splits on any whitespace.
    pub delimiter: char,

    /// Number of leading lines to skip unconditionally.
    pub skip_lines: usize,

    /// Lines starting with this marker are skipped.
    pub comment_marker: Option<String>,

    /// Compare words after upper-casing.
    pub case_insensitive: bool,
}

impl Default for SimilarityDatasetFormat {
    fn default() -> Self {
        SimilarityDatasetFormat {
            delimiter: '\t',
            skip_lines: 0,
            comment_marker: Some("#".to_owned()),
            case_insensitive: false,
        }
    }
}

impl SimilarityDatasetFormat {
    /// Comma-separated format with a single header line.
    pub fn csv_with_header() -> Self {
        SimilarityDatasetFormat {
            delimiter: ',',
            skip_lines: 1,
            comment_marker: None,
            case_insensitive: false,
        }
    }

    fn split<'a>(&self, line: &'a str) -> Vec<&'a str> {
        if self.delimiter.is_whitespace() && self.delimiter != '\t' {
            line.split_whitespace().collect()
        } else {
            line.split(self.delimiter).map(str::trim).collect()
        }
    }
}

/// Word similarity benchmark data.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SimilarityDataset {
    pairs: Vec<SimilarityPair>,
    case_insensitive: bool,
}

impl SimilarityDataset {
    pub fn new(pairs: Vec<SimilarityPair>, case_insensitive: bool) -> Self {
        SimilarityDataset {
            pairs,
            case_insensitive,
        }
    }

    /// Read word pairs from a buffered reader.
    pub fn read<R>(reader: R, format: &SimilarityDatasetFormat) -> Result<Self>
    where
        R: BufRead,
    {
        let mut pairs = Vec::new();

        for line in NumberedLines::new(reader).skip(format.skip_lines) {
            let (line_no, line) = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if let Some(ref marker) = format.comment_marker {
                if trimmed.starts_with(marker.as_str()) {
                    continue;
                }
            }

            let fields = format.split(trimmed);
            if fields.len() != 3 {
                return Err(Error::malformed(
                    line_no,
                    format!("Expected 3 fields, got {}", fields.len()),
                ));
            }

            let score = fields[2].parse::<f64>().map_err(|e| {
                Error::malformed(line_no, format!("Invalid score '{}': {}", fields[2], e))
            })?;

            pairs.push(SimilarityPair {
                word1: fields[0].to_owned(),
                word2: fields[1].to_owned(),
                score,
            });
        }

        Ok(SimilarityDataset {
            pairs,
            case_insensitive: format.case_insensitive,
        })
    }

    /// Read word pairs from a file.
    pub fn from_path(path: impl AsRef<Path>, format: &SimilarityDatasetFormat) -> Result<Self> {
        let path = path.as_ref();
        Self::read(open_file(path)?, format).map_err(|e| e.in_file(path))
    }

    pub fn pairs(&self) -> &[SimilarityPair] {
        &self.pairs
    }

    /// Distinct words of all pairs, in sorted order.
    pub fn tokens(&self) -> BTreeSet<&str> {
        self.pairs
            .iter()
            .flat_map(|pair| {
                iter::once(pair.word1.as_str()).chain(iter::once(pair.word2.as_str()))
            })
            .collect()
    }
}

/// Correlations between embedding and human similarities.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimilarityScores {
    pub pearson: Correlation,
    pub spearman: Correlation,

    /// Percentage of pairs with a word that is not in the vocabulary.
    pub oov_ratio: f64,

    /// Number of pairs that were evaluated.
    pub n_pairs: usize,

    /// Number of pairs with a word that is not in the vocabulary.
    pub n_oov: usize,
}

impl From<SimilarityScores> for EvaluationResult {
    fn from(scores: SimilarityScores) -> Self {
        EvaluationResult::new()
            .with(SIMILARITY_METRICS[0], scores.pearson.coefficient)
            .with(SIMILARITY_METRICS[1], scores.pearson.p_value)
            .with(SIMILARITY_METRICS[2], scores.spearman.coefficient)
            .with(SIMILARITY_METRICS[3], scores.spearman.p_value)
            .with(SIMILARITY_METRICS[4], scores.oov_ratio)
    }
}

/// Word similarity benchmark.
pub struct SimilarityBenchmark<'a> {
    dataset: &'a SimilarityDataset,
    restrict_vocab: Option<usize>,
}

impl<'a> SimilarityBenchmark<'a> {
    pub fn new(dataset: &'a SimilarityDataset) -> Self {
        SimilarityBenchmark {
            dataset,
            restrict_vocab: None,
        }
    }

    /// Only consider the first `n` words of the vocabulary.
    pub fn restrict_vocab(mut self, n: Option<usize>) -> Self {
        self.restrict_vocab = n;
        self
    }

    /// Correlate embedding similarities with the human judgments.
    ///
    /// Pairs with a word that is not in the vocabulary are counted, but
    /// not used in the correlations.
    pub fn evaluate(&self, store: &VectorStore) -> Result<SimilarityScores> {
        let lookup = store.lookup(LookupOptions {
            case_insensitive: self.dataset.case_insensitive,
            restrict_vocab: self.restrict_vocab,
        });

        let mut model = Vec::with_capacity(self.dataset.pairs.len());
        let mut gold = Vec::with_capacity(self.dataset.pairs.len());
        let mut n_oov = 0;

        for pair in &self.dataset.pairs {
            match (lookup.idx(&pair.word1), lookup.idx(&pair.word2)) {
                (Some(idx1), Some(idx2)) => {
                    model.push(store.cosine_idx(idx1, idx2));
                    gold.push(pair.score);
                }
                _ => {
                    trace!("Skipping pair {} {}", pair.word1, pair.word2);
                    n_oov += 1;
                }
            }
        }

        let n_total = model.len() + n_oov;
        let oov_ratio = if n_total == 0 {
            0.
        } else {
            100. * n_oov as f64 / n_total as f64
        };

        debug!(
            "Evaluating {} pairs, out-of-vocabulary: {} ({:.2}%)",
            model.len(),
            n_oov,
            oov_ratio
        );

        Ok(SimilarityScores {
            pearson: pearson(&model, &gold)?,
            spearman: spearman(&model, &gold)?,
            oov_ratio,
            n_pairs: model.len(),
            n_oov,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use approx::assert_abs_diff_eq;
    use maplit::btreeset;
    use ndarray::array;

    use super::{
        SimilarityBenchmark, SimilarityDataset, SimilarityDatasetFormat, SimilarityPair,
        SIMILARITY_METRICS,
    };
    use crate::error::Error;
    use crate::eval::result::EvaluationResult;
    use crate::store::tests::royalty_store;
    use crate::store::VectorStore;

    static ROYALTY_PAIRS: &str = "\
# Word 1\tWord 2\tHuman (mean)
man\twoman\t8.0
king\tqueen\t8.5

boy\tgirl\t7.0
apple\tapples\t9.0
man\tapple\t1.0
king\tprince\t6.0
";

    fn pair(word1: &str, word2: &str, score: f64) -> SimilarityPair {
        SimilarityPair {
            word1: word1.to_owned(),
            word2: word2.to_owned(),
            score,
        }
    }

    fn royalty_pairs() -> SimilarityDataset {
        SimilarityDataset::read(Cursor::new(ROYALTY_PAIRS), &Default::default()).unwrap()
    }

    #[test]
    fn read_tab_separated_with_comments() {
        let dataset = royalty_pairs();
        assert_eq!(dataset.pairs().len(), 6);
        assert_eq!(dataset.pairs()[0], pair("man", "woman", 8.0));
        assert_eq!(dataset.pairs()[5], pair("king", "prince", 6.0));
    }

    #[test]
    fn read_comma_separated_with_header() {
        let data = "Word 1,Word 2,Human (mean)\nold, new, 1.58\nsmart,intelligent,9.2\n";
        let dataset =
            SimilarityDataset::read(Cursor::new(data), &SimilarityDatasetFormat::csv_with_header())
                .unwrap();
        assert_eq!(
            dataset.pairs(),
            &[pair("old", "new", 1.58), pair("smart", "intelligent", 9.2)]
        );
    }

    #[test]
    fn read_whitespace_separated() {
        let format = SimilarityDatasetFormat {
            delimiter: ' ',
            comment_marker: None,
            ..Default::default()
        };
        let dataset = SimilarityDataset::read(Cursor::new("tiger  cat 7.35\n"), &format).unwrap();
        assert_eq!(dataset.pairs(), &[pair("tiger", "cat", 7.35)]);
    }

    #[test]
    fn read_rejects_malformed_lines() {
        let err = SimilarityDataset::read(
            Cursor::new("man\twoman\t8.0\nking\tqueen\n"),
            &Default::default(),
        )
        .unwrap_err();
        match err {
            Error::MalformedInput { location, .. } => assert_eq!(location.line, 2),
            err => panic!("Unexpected error: {}", err),
        }

        let err =
            SimilarityDataset::read(Cursor::new("man\twoman\thigh\n"), &Default::default())
                .unwrap_err();
        assert!(matches!(err, Error::MalformedInput { .. }));
    }

    #[test]
    fn dataset_tokens() {
        assert_eq!(
            royalty_pairs().tokens(),
            btreeset! {"apple", "apples", "boy", "girl", "king", "man", "prince", "queen", "woman"}
        );
    }

    #[test]
    fn evaluate_royalty_pairs() {
        let store = royalty_store();
        let dataset = royalty_pairs();
        let scores = SimilarityBenchmark::new(&dataset).evaluate(&store).unwrap();

        assert_eq!(scores.n_pairs, 5);
        assert_eq!(scores.n_oov, 1);
        assert_abs_diff_eq!(scores.oov_ratio, 100. / 6., epsilon = 1e-9);
        assert_abs_diff_eq!(
            scores.spearman.coefficient,
            3. / 90f64.sqrt(),
            epsilon = 1e-9
        );
        assert!(scores.pearson.coefficient > 0.);
        assert!(scores.pearson.p_value > 0. && scores.pearson.p_value < 1.);
    }

    #[test]
    fn oov_ratio_counts_pairs_with_missing_words() {
        let store = royalty_store();
        let mut pairs = vec![
            pair("man", "woman", 8.0),
            pair("king", "queen", 8.5),
            pair("boy", "girl", 7.0),
            pair("apple", "apples", 9.0),
            pair("man", "apple", 1.0),
            pair("woman", "apples", 0.5),
            pair("king", "boy", 5.0),
        ];
        pairs.push(pair("king", "prince", 6.0));
        pairs.push(pair("duke", "queen", 6.0));
        pairs.push(pair("pear", "peach", 6.0));
        let dataset = SimilarityDataset::new(pairs, false);

        let scores = SimilarityBenchmark::new(&dataset).evaluate(&store).unwrap();
        assert_abs_diff_eq!(scores.oov_ratio, 30.);
        assert_eq!(scores.n_pairs, 7);
    }

    #[test]
    fn two_monotonic_pairs() {
        let store = royalty_store();
        let dataset = SimilarityDataset::new(
            vec![pair("man", "apple", 0.5), pair("man", "woman", 9.0)],
            false,
        );
        let scores = SimilarityBenchmark::new(&dataset).evaluate(&store).unwrap();
        assert_abs_diff_eq!(scores.spearman.coefficient, 1., epsilon = 1e-12);
        assert_abs_diff_eq!(scores.spearman.p_value, 1., epsilon = 1e-12);
    }

    #[test]
    fn too_few_pairs_in_vocabulary() {
        let store = royalty_store();
        let dataset = SimilarityDataset::new(
            vec![pair("man", "woman", 8.0), pair("king", "prince", 6.0)],
            false,
        );
        assert!(matches!(
            SimilarityBenchmark::new(&dataset).evaluate(&store),
            Err(Error::InsufficientData(_))
        ));
    }

    #[test]
    fn large_components_give_finite_correlations() {
        let matrix = array![[1e20f32, 1e20], [1e20, 0.], [0., 1e20], [1e20, 5e19]];
        let tokens = ["a", "b", "c", "d"]
            .iter()
            .map(|&t| t.to_owned())
            .collect::<Vec<_>>();
        let store = VectorStore::build(matrix, tokens).unwrap();
        let dataset = SimilarityDataset::new(
            vec![pair("a", "b", 7.0), pair("b", "c", 0.5), pair("b", "d", 9.0)],
            false,
        );

        let scores = SimilarityBenchmark::new(&dataset).evaluate(&store).unwrap();
        assert!(scores.pearson.coefficient > 0.9);
        assert_abs_diff_eq!(scores.spearman.coefficient, 1., epsilon = 1e-12);
    }

    #[test]
    fn case_insensitive_and_restricted_lookup() {
        let store = royalty_store();
        let dataset = SimilarityDataset::new(
            vec![
                pair("MAN", "Woman", 8.0),
                pair("King", "QUEEN", 8.5),
                pair("man", "apple", 1.0),
            ],
            true,
        );
        let scores = SimilarityBenchmark::new(&dataset).evaluate(&store).unwrap();
        assert_eq!(scores.n_oov, 0);

        // apple is not among the first four words.
        let scores = SimilarityBenchmark::new(&dataset)
            .restrict_vocab(Some(4))
            .evaluate(&store)
            .unwrap();
        assert_eq!((scores.n_pairs, scores.n_oov), (2, 1));
    }

    #[test]
    fn scores_to_evaluation_result() {
        let store = royalty_store();
        let result: EvaluationResult = SimilarityBenchmark::new(&royalty_pairs())
            .evaluate(&store)
            .unwrap()
            .into();
        let names = result.iter().map(|(name, _)| name).collect::<Vec<_>>();
        assert_eq!(names, SIMILARITY_METRICS);
    }
}
