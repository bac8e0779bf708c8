//! Token vocabularies.
//!
//! A vocabulary is the ordered list of tokens of an embedding matrix:
//! the token at index *i* labels row *i* of the matrix. This module
//! also provides the readers for the different vocabulary sources:
//!
//! * a token list with one token per line (`read_tokens`);
//! * a list of word identifiers (`read_word_ids`) that is mapped to
//!   tokens through a dictionary file (`IdToWord`).

use std::collections::hash_map::Entry;
use std::io::BufRead;

use fnv::FnvHashMap;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::util::NumberedLines;

/// Embedding vocabularies.
pub trait Vocab {
    /// Get the index of a token.
    fn idx(&self, word: &str) -> Option<usize>;

    /// Get the number of words in the vocabulary.
    fn words_len(&self) -> usize;

    /// Get the words in the vocabulary.
    fn words(&self) -> &[String];
}

/// Vocabulary of whole tokens.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SimpleVocab {
    indices: FnvHashMap<String, usize>,
    words: Vec<String>,
}

impl SimpleVocab {
    /// Construct a new simple vocabulary.
    ///
    /// Words are assigned indices in the given order. Returns an error
    /// when there are duplicate words.
    pub fn new(words: impl Into<Vec<String>>) -> Result<Self> {
        let words = words.into();

        let mut indices = FnvHashMap::with_capacity_and_hasher(words.len(), Default::default());
        for (idx, word) in words.iter().enumerate() {
            match indices.entry(word.clone()) {
                Entry::Occupied(entry) => {
                    return Err(Error::Format(format!(
                        "Duplicate token '{}' at indices {} and {}",
                        word,
                        entry.get(),
                        idx
                    )))
                }
                Entry::Vacant(entry) => {
                    entry.insert(idx);
                }
            }
        }

        Ok(SimpleVocab { indices, words })
    }
}

impl Vocab for SimpleVocab {
    fn idx(&self, word: &str) -> Option<usize> {
        self.indices.get(word).cloned()
    }

    fn words_len(&self) -> usize {
        self.words.len()
    }

    fn words(&self) -> &[String] {
        &self.words
    }
}

/// Options for looking up benchmark tokens.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct LookupOptions {
    /// Compare tokens after upper-casing.
    pub case_insensitive: bool,

    /// Only consider the first `n` vocabulary entries.
    pub restrict_vocab: Option<usize>,
}

/// Restricted and possibly case-folded view of a vocabulary.
///
/// With case folding, all tokens that fold to the same form share one
/// *canonical* index: the lowest index among them. Lookups return
/// canonical indices.
pub struct VocabLookup<'a> {
    vocab: &'a SimpleVocab,
    limit: usize,
    folded: Option<Folded>,
}

struct Folded {
    indices: FnvHashMap<String, usize>,
    canonical: Vec<usize>,
}

impl<'a> VocabLookup<'a> {
    pub fn new(vocab: &'a SimpleVocab, options: LookupOptions) -> Self {
        let limit = options
            .restrict_vocab
            .map(|n| n.min(vocab.words_len()))
            .unwrap_or_else(|| vocab.words_len());

        let folded = if options.case_insensitive {
            let words = &vocab.words()[..limit];
            let mut indices =
                FnvHashMap::with_capacity_and_hasher(words.len(), Default::default());
            let mut canonical = Vec::with_capacity(words.len());
            for (idx, word) in words.iter().enumerate() {
                canonical.push(*indices.entry(word.to_uppercase()).or_insert(idx));
            }
            Some(Folded { indices, canonical })
        } else {
            None
        };

        VocabLookup {
            vocab,
            limit,
            folded,
        }
    }

    /// Canonical index of a vocabulary index.
    ///
    /// `idx` must be smaller than `words_len()`.
    pub fn canonical(&self, idx: usize) -> usize {
        match self.folded {
            Some(ref folded) => folded.canonical[idx],
            None => idx,
        }
    }
}

impl<'a> Vocab for VocabLookup<'a> {
    fn idx(&self, word: &str) -> Option<usize> {
        match self.folded {
            Some(ref folded) => folded.indices.get(&word.to_uppercase()).cloned(),
            None => self.vocab.idx(word).filter(|&idx| idx < self.limit),
        }
    }

    fn words_len(&self) -> usize {
        self.limit
    }

    fn words(&self) -> &[String] {
        &self.vocab.words()[..self.limit]
    }
}

/// Read a token list with one token per line.
pub fn read_tokens<R>(reader: R) -> Result<Vec<String>>
where
    R: BufRead,
{
    let mut tokens = Vec::new();
    for line in NumberedLines::new(reader) {
        let (line_no, line) = line?;
        if line.is_empty() {
            return Err(Error::malformed(line_no, "Empty token"));
        }
        tokens.push(line);
    }

    Ok(tokens)
}

/// Read a list of word identifiers with one identifier per line.
pub fn read_word_ids<R>(reader: R) -> Result<Vec<usize>>
where
    R: BufRead,
{
    let mut ids = Vec::new();
    for line in NumberedLines::new(reader) {
        let (line_no, line) = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        ids.push(line.parse().map_err(|e| {
            Error::malformed(line_no, format!("Cannot parse word identifier '{}': {}", line, e))
        })?);
    }

    Ok(ids)
}

/// Column layout of a tab-separated dictionary file.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum DictLayout {
    /// Lines of the form `word<TAB>id`.
    WordId,

    /// Lines of the form `id<TAB>word`.
    IdWord,
}

impl DictLayout {
    pub fn try_from(layout: impl AsRef<str>) -> Result<Self> {
        match layout.as_ref() {
            "word-id" => Ok(DictLayout::WordId),
            "id-word" => Ok(DictLayout::IdWord),
            unknown => Err(Error::Format(format!(
                "Unknown dictionary layout: {}",
                unknown
            ))),
        }
    }
}

/// Immutable mapping from word identifiers to words.
///
/// Regardless of the layout of the dictionary file, the mapping is
/// always from identifier to word.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct IdToWord {
    words: FnvHashMap<usize, String>,
}

impl IdToWord {
    /// Read a tab-separated dictionary file.
    pub fn read<R>(reader: R, layout: DictLayout) -> Result<Self>
    where
        R: BufRead,
    {
        let mut words = FnvHashMap::default();

        for line in NumberedLines::new(reader) {
            let (line_no, line) = line?;
            if line.is_empty() {
                continue;
            }

            let mut fields = line.split('\t');
            let (first, second) = match (fields.next(), fields.next(), fields.next()) {
                (Some(first), Some(second), None) => (first, second),
                _ => {
                    return Err(Error::malformed(
                        line_no,
                        "Expected two tab-separated fields",
                    ))
                }
            };

            let (word, id) = match layout {
                DictLayout::WordId => (first, second),
                DictLayout::IdWord => (second, first),
            };

            let id = id.trim().parse().map_err(|e| {
                Error::malformed(line_no, format!("Cannot parse word identifier '{}': {}", id, e))
            })?;

            if words.insert(id, word.to_owned()).is_some() {
                return Err(Error::malformed(
                    line_no,
                    format!("Duplicate word identifier: {}", id),
                ));
            }
        }

        Ok(IdToWord { words })
    }

    pub fn get(&self, id: usize) -> Option<&str> {
        self.words.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Map word identifiers to tokens.
    pub fn tokens(&self, ids: &[usize]) -> Result<Vec<String>> {
        ids.iter()
            .map(|&id| {
                self.get(id)
                    .map(ToOwned::to_owned)
                    .ok_or_else(|| Error::UnknownToken(format!("word identifier {}", id)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::{
        read_tokens, read_word_ids, DictLayout, IdToWord, LookupOptions, SimpleVocab, Vocab,
        VocabLookup,
    };
    use crate::error::Error;

    fn test_vocab() -> SimpleVocab {
        SimpleVocab::new(vec![
            "Berlin".to_owned(),
            "berlin".to_owned(),
            "is".to_owned(),
            "a".to_owned(),
            "BERLIN".to_owned(),
            "test".to_owned(),
        ])
        .unwrap()
    }

    #[test]
    fn simple_vocab_indices_follow_order() {
        let vocab = test_vocab();
        assert_eq!(vocab.idx("Berlin"), Some(0));
        assert_eq!(vocab.idx("test"), Some(5));
        assert_eq!(vocab.idx("Test"), None);
        assert_eq!(vocab.words_len(), 6);
    }

    #[test]
    fn simple_vocab_rejects_duplicates() {
        let words = vec!["a".to_owned(), "b".to_owned(), "a".to_owned()];
        assert!(matches!(SimpleVocab::new(words), Err(Error::Format(_))));
    }

    #[test]
    fn lookup_without_options_is_exact() {
        let vocab = test_vocab();
        let lookup = VocabLookup::new(&vocab, LookupOptions::default());
        assert_eq!(lookup.idx("berlin"), Some(1));
        assert_eq!(lookup.canonical(4), 4);
        assert_eq!(lookup.words_len(), 6);
    }

    #[test]
    fn case_folded_lookup_uses_first_index() {
        let vocab = test_vocab();
        let lookup = VocabLookup::new(
            &vocab,
            LookupOptions {
                case_insensitive: true,
                restrict_vocab: None,
            },
        );
        assert_eq!(lookup.idx("berlin"), Some(0));
        assert_eq!(lookup.idx("BeRlIn"), Some(0));
        assert_eq!(lookup.canonical(1), 0);
        assert_eq!(lookup.canonical(4), 0);
        assert_eq!(lookup.canonical(5), 5);
    }

    #[test]
    fn restricted_lookup_hides_tail() {
        let vocab = test_vocab();
        let lookup = VocabLookup::new(
            &vocab,
            LookupOptions {
                case_insensitive: false,
                restrict_vocab: Some(3),
            },
        );
        assert_eq!(lookup.idx("is"), Some(2));
        assert_eq!(lookup.idx("a"), None);
        assert_eq!(lookup.words(), &["Berlin", "berlin", "is"]);

        let lookup = VocabLookup::new(
            &vocab,
            LookupOptions {
                case_insensitive: false,
                restrict_vocab: Some(100),
            },
        );
        assert_eq!(lookup.words_len(), 6);
    }

    #[test]
    fn reads_token_list() {
        let tokens = read_tokens(Cursor::new("man\nwoman\r\nking\n")).unwrap();
        assert_eq!(tokens, vec!["man", "woman", "king"]);
        assert!(read_tokens(Cursor::new("man\n\nking\n")).is_err());
    }

    #[test]
    fn dictionary_layouts_yield_id_to_word() {
        let word_id = IdToWord::read(Cursor::new("man\t3\nwoman\t1\n"), DictLayout::WordId).unwrap();
        let id_word = IdToWord::read(Cursor::new("3\tman\n1\twoman\n"), DictLayout::IdWord).unwrap();
        assert_eq!(word_id, id_word);
        assert_eq!(word_id.get(3), Some("man"));
        assert_eq!(word_id.len(), 2);

        let ids = read_word_ids(Cursor::new("1\n3\n")).unwrap();
        assert_eq!(word_id.tokens(&ids).unwrap(), vec!["woman", "man"]);
        assert!(matches!(
            word_id.tokens(&[2]),
            Err(Error::UnknownToken(_))
        ));
    }

    #[test]
    fn dictionary_rejects_malformed_lines() {
        assert!(matches!(
            IdToWord::read(Cursor::new("man\t3\nwoman\n"), DictLayout::WordId),
            Err(Error::MalformedInput { .. })
        ));
        assert!(matches!(
            IdToWord::read(Cursor::new("man\tx\n"), DictLayout::WordId),
            Err(Error::MalformedInput { .. })
        ));
        assert!(matches!(
            IdToWord::read(Cursor::new("man\t3\nwoman\t3\n"), DictLayout::WordId),
            Err(Error::MalformedInput { .. })
        ));
    }

    #[test]
    fn dict_layout_from_str() {
        assert_eq!(DictLayout::try_from("word-id").unwrap(), DictLayout::WordId);
        assert_eq!(DictLayout::try_from("id-word").unwrap(), DictLayout::IdWord);
        assert!(DictLayout::try_from("wordid").is_err());
    }
}
