//! Traits and trait implementations for similarity queries.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use ndarray::{s, Array1, ArrayView1};
use ordered_float::NotNan;

use crate::store::VectorStore;
use crate::util::{cosine, l2_norm};
use crate::vocab::{LookupOptions, Vocab, VocabLookup};

/// A word with its similarity.
///
/// This data structure is used to store a pair consisting of a word and
/// its similarity to a query.
#[derive(Debug, Eq, PartialEq)]
pub struct WordSimilarityResult<'a> {
    similarity: NotNan<f32>,
    idx: usize,
    word: &'a str,
}

impl<'a> WordSimilarityResult<'a> {
    /// Get the word's similarity in cosine similarity.
    pub fn cosine_similarity(&self) -> f32 {
        *self.similarity
    }

    /// Get the vocabulary index of the word.
    pub fn idx(&self) -> usize {
        self.idx
    }

    pub fn word(&self) -> &'a str {
        self.word
    }
}

// Most similar first, ties broken by vocabulary order.
impl<'a> Ord for WordSimilarityResult<'a> {
    fn cmp(&self, other: &Self) -> Ordering {
        match other.similarity.cmp(&self.similarity) {
            Ordering::Equal => self.idx.cmp(&other.idx),
            ordering => ordering,
        }
    }
}

impl<'a> PartialOrd for WordSimilarityResult<'a> {
    fn partial_cmp(&self, other: &WordSimilarityResult) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Trait for embedding similarity queries.
pub trait EmbeddingSimilarity {
    /// Find words that are similar to the query embedding.
    ///
    /// Similarity is the cosine similarity between the query and the
    /// embeddings. At most `top_k` results are returned, most similar
    /// first. Words with equal similarity are ordered by their position
    /// in the vocabulary. Words in `exclude` are never returned.
    ///
    /// No words are returned when the length of `query` differs from
    /// the embedding dimensionality.
    fn nearest(
        &self,
        query: ArrayView1<f32>,
        exclude: &HashSet<&str>,
        top_k: usize,
    ) -> Vec<WordSimilarityResult>;
}

impl EmbeddingSimilarity for VectorStore {
    fn nearest(
        &self,
        query: ArrayView1<f32>,
        exclude: &HashSet<&str>,
        top_k: usize,
    ) -> Vec<WordSimilarityResult> {
        if query.len() != self.dims() {
            return Vec::new();
        }

        let skip = exclude
            .iter()
            .filter_map(|word| self.vocab().idx(word))
            .collect::<HashSet<_>>();
        self.similarity_(
            query,
            |idx| skip.contains(&idx),
            top_k,
            self.vocab().words_len(),
        )
    }
}

/// Trait for word similarity queries.
pub trait WordSimilarity {
    /// Find words that are similar to the query word.
    ///
    /// The query word itself is not returned. Returns `None` when the
    /// word is not in the vocabulary.
    fn word_similarity(&self, word: &str, top_k: usize) -> Option<Vec<WordSimilarityResult>>;
}

impl WordSimilarity for VectorStore {
    fn word_similarity(&self, word: &str, top_k: usize) -> Option<Vec<WordSimilarityResult>> {
        let query_idx = self.vocab().idx(word)?;
        Some(self.similarity_(
            self.embedding(query_idx),
            |idx| idx == query_idx,
            top_k,
            self.vocab().words_len(),
        ))
    }
}

/// Trait for analogy queries.
pub trait Analogy {
    /// Perform an analogy query.
    ///
    /// This method returns words that are close in vector space to the
    /// analogy query `word1` is to `word2` as `word3` is to `?`. More
    /// concretely, it searches embeddings that are similar to:
    ///
    /// *embedding(word2) - embedding(word1) + embedding(word3)*
    ///
    /// The query words are excluded from the results. At most, `top_k`
    /// results are returned. `Result::Err` is returned when one or more
    /// of the query words are not in the vocabulary, indicating which of
    /// the words were present.
    fn analogy(
        &self,
        query: [&str; 3],
        top_k: usize,
    ) -> Result<Vec<WordSimilarityResult>, [bool; 3]>;
}

impl Analogy for VectorStore {
    fn analogy(
        &self,
        query: [&str; 3],
        top_k: usize,
    ) -> Result<Vec<WordSimilarityResult>, [bool; 3]> {
        let lookup = self.lookup(LookupOptions::default());
        let indices = [
            lookup.idx(query[0]),
            lookup.idx(query[1]),
            lookup.idx(query[2]),
        ];

        match indices {
            [Some(idx1), Some(idx2), Some(idx3)] => {
                Ok(self.analogy_by_idx(&lookup, [idx1, idx2, idx3], top_k))
            }
            _ => Err([
                indices[0].is_some(),
                indices[1].is_some(),
                indices[2].is_some(),
            ]),
        }
    }
}

impl VectorStore {
    /// Analogy query using (canonical) indices of a lookup.
    ///
    /// Candidates are restricted to the words of the lookup. A candidate
    /// is excluded when its canonical index is one of the query indices.
    pub(crate) fn analogy_by_idx(
        &self,
        lookup: &VocabLookup,
        query: [usize; 3],
        top_k: usize,
    ) -> Vec<WordSimilarityResult> {
        let offset: Array1<f32> =
            &self.embedding(query[1]) - &self.embedding(query[0]) + self.embedding(query[2]);

        self.similarity_(
            offset.view(),
            |idx| query.contains(&lookup.canonical(idx)),
            top_k,
            lookup.words_len(),
        )
    }

    fn similarity_<F>(
        &self,
        query: ArrayView1<f32>,
        skip: F,
        limit: usize,
        n_candidates: usize,
    ) -> Vec<WordSimilarityResult>
    where
        F: Fn(usize) -> bool,
    {
        if limit == 0 {
            return Vec::new();
        }

        let query_norm = l2_norm(query);
        let dots = self
            .matrix()
            .slice(s![0..n_candidates, ..])
            .dot(&query);

        let mut results = BinaryHeap::with_capacity(limit);
        for (idx, (&dot, &norm)) in dots.iter().zip(self.norms()).enumerate() {
            // Don't add words that we are explicitly asked to skip.
            if skip(idx) {
                continue;
            }

            let similarity = match NotNan::new(cosine(dot, norm, query_norm)) {
                Ok(similarity) => similarity,
                Err(_) => continue,
            };

            let word_similarity = WordSimilarityResult {
                word: &self.vocab().words()[idx],
                idx,
                similarity,
            };

            if results.len() < limit {
                results.push(word_similarity);
            } else if let Some(mut peek) = results.peek_mut() {
                if word_similarity < *peek {
                    *peek = word_similarity
                }
            }
        }

        results.into_sorted_vec()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use approx::AbsDiffEq;
    use maplit::hashset;
    use ndarray::{array, Array2};

    use super::{Analogy, EmbeddingSimilarity, WordSimilarity, WordSimilarityResult};
    use crate::store::tests::royalty_store;
    use crate::store::VectorStore;
    use crate::vocab::LookupOptions;

    fn words<'a>(results: &[WordSimilarityResult<'a>]) -> Vec<&'a str> {
        results.iter().map(WordSimilarityResult::word).collect()
    }

    #[test]
    fn analogy_offset_finds_queen() {
        let store = royalty_store();
        let result = store.analogy(["man", "king", "woman"], 1).unwrap();
        assert_eq!(words(&result), vec!["queen"]);
        assert!(result[0].cosine_similarity().abs_diff_eq(&1., 1e-6));
    }

    #[test]
    fn analogy_uses_raw_vectors() {
        // Normalizing the inputs before the offset would make "far"
        // the answer.
        let matrix = array![[1f32, 0.], [2., 0.], [0., 1.], [1., 1.], [0.5, 1.]];
        let tokens = ["a", "b", "c", "near", "far"]
            .iter()
            .map(|&t| t.to_owned())
            .collect::<Vec<_>>();
        let store = VectorStore::build(matrix, tokens).unwrap();
        let result = store.analogy(["a", "b", "c"], 1).unwrap();
        assert_eq!(words(&result), vec!["near"]);
    }

    #[test]
    fn analogy_reports_absent_words() {
        let store = royalty_store();
        assert_eq!(
            store.analogy(["man", "prince", "woman"], 1),
            Err([true, false, true])
        );
        assert_eq!(
            store.analogy(["emperor", "king", "empress"], 1),
            Err([false, true, false])
        );
    }

    #[test]
    fn nearest_orders_by_similarity_then_vocab_order() {
        let store = royalty_store();
        let results = store.nearest(array![1f32, 0., 0., 0.].view(), &HashSet::new(), 8);
        // man: 1; woman, king, boy: 1/sqrt(2); queen, girl: 1/sqrt(3);
        // apple, apples: 0.
        assert_eq!(
            words(&results),
            vec!["man", "woman", "king", "boy", "queen", "girl", "apple", "apples"]
        );
        for pair in results.windows(2) {
            assert!(pair[0].cosine_similarity() >= pair[1].cosine_similarity());
        }
    }

    #[test]
    fn nearest_respects_exclusions_and_limit() {
        let store = royalty_store();
        let results = store.nearest(
            array![1f32, 0., 0., 0.].view(),
            &hashset! {"man", "king", "unknown"},
            2,
        );
        assert_eq!(words(&results), vec!["woman", "boy"]);
        assert_eq!(results[0].idx(), 1);

        assert!(store
            .nearest(array![1f32, 0., 0., 0.].view(), &HashSet::new(), 0)
            .is_empty());
    }

    #[test]
    fn nearest_with_wrong_dimensionality_is_empty() {
        let store = royalty_store();
        assert!(store
            .nearest(array![1f32, 0., 0.].view(), &HashSet::new(), 8)
            .is_empty());
        assert!(store
            .nearest(array![1f32, 0., 0., 0., 0.].view(), &HashSet::new(), 8)
            .is_empty());
    }

    #[test]
    fn nearest_ties_are_stable() {
        let tokens = ["d", "c", "b", "a"]
            .iter()
            .map(|&t| t.to_owned())
            .collect::<Vec<_>>();
        let store = VectorStore::build(Array2::from_elem((4, 3), 1f32), tokens).unwrap();
        let results = store.nearest(array![1f32, 1., 1.].view(), &HashSet::new(), 3);
        assert_eq!(words(&results), vec!["d", "c", "b"]);
    }

    #[test]
    fn word_similarity_skips_query() {
        let store = royalty_store();
        let results = store.word_similarity("apple", 1).unwrap();
        assert_eq!(words(&results), vec!["apples"]);
        assert!(store.word_similarity("pear", 1).is_none());
    }

    #[test]
    fn analogy_candidates_are_restricted() {
        let store = royalty_store();
        let lookup = store.lookup(LookupOptions {
            case_insensitive: false,
            restrict_vocab: Some(3),
        });
        // Only man, woman, king are candidates and all are excluded.
        assert!(store.analogy_by_idx(&lookup, [0, 2, 1], 1).is_empty());
    }
}
