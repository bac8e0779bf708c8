//! Analogy benchmark.
//!
//! The analogy benchmark file consists of sections, each introduced by
//! a line of the form `: section-name`. Each other line contains an
//! analogy `a b c d`: *a is to b as c is to d*. An analogy is solved
//! correctly when *d* is the word closest to *b - a + c*, excluding
//! *a*, *b*, and *c* themselves.
//!
//! By convention, the first sections are semantic analogies and the
//! remaining sections syntactic analogies.

use std::collections::BTreeSet;
use std::io::BufRead;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::eval::result::EvaluationResult;
use crate::store::VectorStore;
use crate::util::{open_file, NumberedLines};
use crate::vocab::{LookupOptions, Vocab};

/// Name of the synthetic category with the counts of all categories.
pub const TOTAL_CATEGORY: &str = "total";

/// Names of the analogy evaluation metrics, in output order.
pub const ANALOGY_METRICS: &[&str] = &[
    "sem_acc",
    "sem_total",
    "syn_acc",
    "syn_total",
    "total_acc",
    "total",
];

/// An analogy: `query[0]` is to `query[1]` as `query[2]` is to `answer`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AnalogyItem {
    pub query: [String; 3],
    pub answer: String,
}

/// A named section of analogies.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AnalogyCategory {
    pub name: String,
    pub items: Vec<AnalogyItem>,
}

/// Analogy benchmark data.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AnalogyDataset {
    categories: Vec<AnalogyCategory>,
}

impl AnalogyDataset {
    pub fn new(categories: Vec<AnalogyCategory>) -> Self {
        AnalogyDataset { categories }
    }

    /// Read analogies from a buffered reader.
    pub fn read<R>(reader: R) -> Result<Self>
    where
        R: BufRead,
    {
        let mut categories: Vec<AnalogyCategory> = Vec::new();

        for line in NumberedLines::new(reader) {
            let (line_no, line) = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(name) = line.strip_prefix(':') {
                categories.push(AnalogyCategory {
                    name: name.trim().to_owned(),
                    items: Vec::new(),
                });
                continue;
            }

            let category = categories
                .last_mut()
                .ok_or_else(|| Error::malformed(line_no, "Analogy before first section header"))?;

            let quadruple = line.split_whitespace().collect::<Vec<_>>();
            if quadruple.len() != 4 {
                return Err(Error::malformed(
                    line_no,
                    format!("Expected 4 words, got {}", quadruple.len()),
                ));
            }

            category.items.push(AnalogyItem {
                query: [
                    quadruple[0].to_owned(),
                    quadruple[1].to_owned(),
                    quadruple[2].to_owned(),
                ],
                answer: quadruple[3].to_owned(),
            });
        }

        Ok(AnalogyDataset { categories })
    }

    /// Read analogies from a file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        Self::read(open_file(path)?).map_err(|e| e.in_file(path))
    }

    pub fn categories(&self) -> &[AnalogyCategory] {
        &self.categories
    }

    /// Distinct words used by the analogies, in sorted order.
    ///
    /// If `include_answers` is `false`, words that only occur as the
    /// answer of an analogy are not returned.
    pub fn tokens(&self, include_answers: bool) -> BTreeSet<&str> {
        let mut tokens = BTreeSet::new();
        for item in self.categories.iter().flat_map(|c| &c.items) {
            tokens.extend(item.query.iter().map(String::as_str));
            if include_answers {
                tokens.insert(item.answer.as_str());
            }
        }

        tokens
    }
}

/// Analogy evaluation settings.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct AnalogyConfig {
    /// Number of leading categories that are semantic.
    pub n_semantic: usize,

    /// Compare words after upper-casing.
    pub case_insensitive: bool,

    /// Only consider the first `n` words of the vocabulary.
    pub restrict_vocab: Option<usize>,
}

impl Default for AnalogyConfig {
    fn default() -> Self {
        AnalogyConfig {
            n_semantic: 5,
            case_insensitive: false,
            restrict_vocab: None,
        }
    }
}

/// Analogy counts of a category.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CategoryCounts {
    pub name: String,
    pub n_correct: usize,
    pub n_incorrect: usize,

    /// Analogies with a word that is not in the vocabulary.
    pub n_skipped: usize,
}

impl CategoryCounts {
    pub fn new(name: impl Into<String>) -> Self {
        CategoryCounts {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Number of evaluated (not skipped) analogies.
    pub fn n_evaluated(&self) -> usize {
        self.n_correct + self.n_incorrect
    }

    fn add(&mut self, other: &CategoryCounts) {
        self.n_correct += other.n_correct;
        self.n_incorrect += other.n_incorrect;
        self.n_skipped += other.n_skipped;
    }
}

/// Per-category outcome of an analogy evaluation.
///
/// The last category is the total over all other categories.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AnalogyEvaluation {
    categories: Vec<CategoryCounts>,
}

impl AnalogyEvaluation {
    /// Construct from category counts, the last of which is the total.
    pub fn from_categories(categories: Vec<CategoryCounts>) -> Self {
        AnalogyEvaluation { categories }
    }

    /// Category counts, with the total category last.
    pub fn categories(&self) -> &[CategoryCounts] {
        &self.categories
    }

    /// Compute the semantic, syntactic, and total accuracies.
    ///
    /// Categories `[0, n_semantic)` are semantic, the remaining
    /// categories except the last are syntactic. The total accuracy is
    /// read from the last category.
    pub fn accuracy(&self, n_semantic: usize) -> Result<AnalogyAccuracy> {
        let (total, categories) = self
            .categories
            .split_last()
            .ok_or_else(|| Error::EmptyCategory(TOTAL_CATEGORY.to_owned()))?;

        let split = n_semantic.min(categories.len());
        let (semantic, syntactic) = categories.split_at(split);

        let (sem_acc, sem_total) = bucket_accuracy("semantic", semantic)?;
        let (syn_acc, syn_total) = bucket_accuracy("syntactic", syntactic)?;
        let (total_acc, total) = bucket_accuracy(&total.name, std::slice::from_ref(total))?;

        Ok(AnalogyAccuracy {
            sem_acc,
            sem_total,
            syn_acc,
            syn_total,
            total_acc,
            total,
        })
    }
}

fn bucket_accuracy(bucket: &str, categories: &[CategoryCounts]) -> Result<(f64, usize)> {
    let n_correct = categories.iter().map(|c| c.n_correct).sum::<usize>();
    let n_evaluated = categories
        .iter()
        .map(CategoryCounts::n_evaluated)
        .sum::<usize>();

    if n_evaluated == 0 {
        return Err(Error::EmptyCategory(bucket.to_owned()));
    }

    Ok((100. * n_correct as f64 / n_evaluated as f64, n_evaluated))
}

/// Semantic, syntactic, and total analogy accuracies (in percent).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnalogyAccuracy {
    pub sem_acc: f64,
    pub sem_total: usize,
    pub syn_acc: f64,
    pub syn_total: usize,
    pub total_acc: f64,
    pub total: usize,
}

impl From<AnalogyAccuracy> for EvaluationResult {
    fn from(acc: AnalogyAccuracy) -> Self {
        EvaluationResult::new()
            .with(ANALOGY_METRICS[0], acc.sem_acc)
            .with(ANALOGY_METRICS[1], acc.sem_total)
            .with(ANALOGY_METRICS[2], acc.syn_acc)
            .with(ANALOGY_METRICS[3], acc.syn_total)
            .with(ANALOGY_METRICS[4], acc.total_acc)
            .with(ANALOGY_METRICS[5], acc.total)
    }
}

/// Analogy benchmark.
pub struct AnalogyBenchmark<'a> {
    dataset: &'a AnalogyDataset,
    config: AnalogyConfig,
}

impl<'a> AnalogyBenchmark<'a> {
    pub fn new(dataset: &'a AnalogyDataset, config: AnalogyConfig) -> Self {
        AnalogyBenchmark { dataset, config }
    }

    /// Count correct, incorrect and skipped analogies per category.
    ///
    /// A total category is appended to the category counts.
    pub fn evaluate(&self, store: &VectorStore) -> AnalogyEvaluation {
        let lookup = store.lookup(LookupOptions {
            case_insensitive: self.config.case_insensitive,
            restrict_vocab: self.config.restrict_vocab,
        });

        let mut categories = Vec::with_capacity(self.dataset.categories.len() + 1);
        let mut total = CategoryCounts::new(TOTAL_CATEGORY);

        for category in &self.dataset.categories {
            let mut counts = CategoryCounts::new(category.name.clone());

            for item in &category.items {
                let indices = [
                    lookup.idx(&item.query[0]),
                    lookup.idx(&item.query[1]),
                    lookup.idx(&item.query[2]),
                    lookup.idx(&item.answer),
                ];

                // Skip analogies with unknown words. This is a shortcoming
                // of the vocabulary and not of the embeddings.
                let (query, answer) = match indices {
                    [Some(a), Some(b), Some(c), Some(d)] => ([a, b, c], d),
                    _ => {
                        trace!(
                            "Skipping analogy {} {} {} {}",
                            item.query[0],
                            item.query[1],
                            item.query[2],
                            item.answer
                        );
                        counts.n_skipped += 1;
                        continue;
                    }
                };

                // If there is no candidate left, the analogy is incorrect.
                let is_correct = store
                    .analogy_by_idx(&lookup, query, 1)
                    .first()
                    .map(|r| lookup.canonical(r.idx()) == answer)
                    .unwrap_or(false);

                if is_correct {
                    counts.n_correct += 1;
                } else {
                    counts.n_incorrect += 1;
                }
            }

            debug!(
                "{}: {}/{} correct, skipped: {}",
                counts.name,
                counts.n_correct,
                counts.n_evaluated(),
                counts.n_skipped
            );

            total.add(&counts);
            categories.push(counts);
        }

        categories.push(total);

        AnalogyEvaluation { categories }
    }

    /// Evaluate and compute the accuracies.
    pub fn accuracy(&self, store: &VectorStore) -> Result<AnalogyAccuracy> {
        self.evaluate(store).accuracy(self.config.n_semantic)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use approx::assert_abs_diff_eq;
    use maplit::btreeset;

    use super::{
        AnalogyBenchmark, AnalogyConfig, AnalogyDataset, AnalogyEvaluation, CategoryCounts,
    };
    use crate::error::Error;
    use crate::eval::result::{EvaluationResult, Metric};
    use crate::store::tests::royalty_store;

    static ROYALTY_ANALOGIES: &str = "\
: family
man woman king queen
man woman boy girl
king queen man woman
man woman prince princess
: gram-plural
apple apples car cars
man king woman girl
";

    fn counts(name: &str, n_correct: usize, n_incorrect: usize) -> CategoryCounts {
        CategoryCounts {
            name: name.to_owned(),
            n_correct,
            n_incorrect,
            n_skipped: 0,
        }
    }

    fn royalty_analogies() -> AnalogyDataset {
        AnalogyDataset::read(Cursor::new(ROYALTY_ANALOGIES)).unwrap()
    }

    #[test]
    fn read_sections() {
        let dataset = royalty_analogies();
        let categories = dataset.categories();
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].name, "family");
        assert_eq!(categories[0].items.len(), 4);
        assert_eq!(categories[1].name, "gram-plural");
        assert_eq!(categories[1].items[1].query, ["man", "king", "woman"]);
        assert_eq!(categories[1].items[1].answer, "girl");
    }

    #[test]
    fn read_rejects_malformed_lines() {
        let err = AnalogyDataset::read(Cursor::new(": capitals\nAthens Greece Baghdad\n"))
            .unwrap_err();
        match err {
            Error::MalformedInput { location, .. } => assert_eq!(location.line, 2),
            err => panic!("Unexpected error: {}", err),
        }

        assert!(AnalogyDataset::read(Cursor::new("Athens Greece Baghdad Iraq\n")).is_err());
    }

    #[test]
    fn tokens_with_and_without_answers() {
        let dataset = royalty_analogies();
        assert_eq!(
            dataset.tokens(true),
            btreeset! {"apple", "apples", "boy", "car", "cars", "girl", "king", "man",
            "prince", "princess", "queen", "woman"}
        );
        assert_eq!(
            dataset.tokens(false),
            btreeset! {"apple", "apples", "boy", "car", "king", "man", "prince", "queen", "woman"}
        );
    }

    #[test]
    fn evaluate_counts_per_category() {
        let store = royalty_store();
        let dataset = royalty_analogies();
        let evaluation = AnalogyBenchmark::new(&dataset, AnalogyConfig::default()).evaluate(&store);

        assert_eq!(
            evaluation.categories(),
            &[
                CategoryCounts {
                    name: "family".to_owned(),
                    n_correct: 3,
                    n_incorrect: 0,
                    n_skipped: 1,
                },
                CategoryCounts {
                    name: "gram-plural".to_owned(),
                    n_correct: 0,
                    n_incorrect: 1,
                    n_skipped: 1,
                },
                CategoryCounts {
                    name: "total".to_owned(),
                    n_correct: 3,
                    n_incorrect: 1,
                    n_skipped: 2,
                },
            ]
        );

        let accuracy = evaluation.accuracy(1).unwrap();
        assert_abs_diff_eq!(accuracy.sem_acc, 100.);
        assert_eq!(accuracy.sem_total, 3);
        assert_abs_diff_eq!(accuracy.syn_acc, 0.);
        assert_eq!(accuracy.syn_total, 1);
        assert_abs_diff_eq!(accuracy.total_acc, 75.);
        assert_eq!(accuracy.total, 4);
    }

    #[test]
    fn case_insensitive_evaluation() {
        let store = royalty_store();
        let dataset =
            AnalogyDataset::read(Cursor::new(": family\nMAN Woman KING queen\n")).unwrap();

        let config = AnalogyConfig {
            n_semantic: 1,
            ..AnalogyConfig::default()
        };
        let evaluation = AnalogyBenchmark::new(&dataset, config).evaluate(&store);
        assert_eq!(evaluation.categories()[0].n_skipped, 1);

        let config = AnalogyConfig {
            case_insensitive: true,
            ..config
        };
        let evaluation = AnalogyBenchmark::new(&dataset, config).evaluate(&store);
        assert_eq!(evaluation.categories()[0].n_correct, 1);
    }

    #[test]
    fn restricted_vocabulary_skips_rare_words() {
        let store = royalty_store();
        let dataset = royalty_analogies();
        let config = AnalogyConfig {
            n_semantic: 1,
            case_insensitive: false,
            restrict_vocab: Some(4),
        };
        let evaluation = AnalogyBenchmark::new(&dataset, config).evaluate(&store);
        let total = evaluation.categories().last().unwrap();
        // Only analogies over man, woman, king, queen remain.
        assert_eq!((total.n_correct, total.n_incorrect), (2, 0));
    }

    #[test]
    fn total_is_read_from_last_category() {
        let evaluation = AnalogyEvaluation::from_categories(vec![
            counts("cat0", 2, 1),
            counts("cat1", 1, 1),
            counts("total", 3, 2),
        ]);
        let accuracy = evaluation.accuracy(1).unwrap();
        assert_abs_diff_eq!(accuracy.sem_acc, 100. * 2. / 3., epsilon = 1e-12);
        assert_eq!(accuracy.sem_total, 3);
        assert_abs_diff_eq!(accuracy.syn_acc, 50.);
        assert_abs_diff_eq!(accuracy.total_acc, 60.);
        assert_eq!(accuracy.total, 5);

        // The total is not reconciled with the buckets.
        let evaluation = AnalogyEvaluation::from_categories(vec![
            counts("cat0", 2, 1),
            counts("cat1", 1, 1),
            counts("total", 1, 9),
        ]);
        let accuracy = evaluation.accuracy(1).unwrap();
        assert_abs_diff_eq!(accuracy.total_acc, 10.);
        assert_eq!(accuracy.sem_total + accuracy.syn_total, 5);
    }

    #[test]
    fn empty_buckets_are_errors() {
        let evaluation = AnalogyEvaluation::from_categories(vec![
            counts("cat0", 2, 1),
            counts("cat1", 0, 0),
            counts("total", 2, 1),
        ]);
        assert!(matches!(
            evaluation.accuracy(1),
            Err(Error::EmptyCategory(ref bucket)) if bucket == "syntactic"
        ));

        assert!(matches!(
            AnalogyEvaluation::from_categories(vec![]).accuracy(5),
            Err(Error::EmptyCategory(_))
        ));
    }

    #[test]
    fn accuracy_to_evaluation_result() {
        let evaluation = AnalogyEvaluation::from_categories(vec![
            counts("cat0", 1, 1),
            counts("cat1", 1, 3),
            counts("total", 2, 4),
        ]);
        let result: EvaluationResult = evaluation.accuracy(1).unwrap().into();
        let names = result.iter().map(|(name, _)| name).collect::<Vec<_>>();
        assert_eq!(names, super::ANALOGY_METRICS);
        assert_eq!(result.get("syn_total"), Some(Metric::Count(4)));
        assert_eq!(result.get("sem_acc"), Some(Metric::Float(50.)));
    }
}
