//! Batch evaluation configuration.
//!
//! A batch evaluation is configured with a TOML file:
//!
//! ```toml
//! extension = "csv"
//! delimiter = ","
//!
//! [vocab]
//! tokens = "tokens.txt"
//!
//! [analogy]
//! path = "questions-words.txt"
//! n_semantic = 5
//!
//! [[similarity]]
//! name = "wordsim353"
//! path = "wordsim353/combined.tab"
//! ```
//!
//! Relative paths are resolved against the directory of the
//! configuration file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::batch::BatchRunner;
use crate::compat::MatrixFormat;
use crate::error::{Error, Result};
use crate::eval::{AnalogyConfig, AnalogyDataset, SimilarityDataset, SimilarityDatasetFormat};
use crate::util::open_file;
use crate::vocab::{read_tokens, read_word_ids, DictLayout, IdToWord};

/// Configuration of a batch evaluation.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EvalConfig {
    /// Extension of the matrix files.
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Delimiter of text matrices.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Matrix format (`npy`, `csv`, `tsv` or `text`). Guessed from the
    /// file extension when absent.
    pub format: Option<String>,

    pub vocab: VocabConfig,

    pub analogy: Option<AnalogySection>,

    #[serde(default)]
    pub similarity: Vec<SimilaritySection>,
}

fn default_extension() -> String {
    "csv".to_owned()
}

fn default_delimiter() -> char {
    ','
}

fn default_comment_marker() -> String {
    "#".to_owned()
}

fn default_similarity_delimiter() -> char {
    '\t'
}

fn default_n_semantic() -> usize {
    5
}

fn default_layout() -> DictLayout {
    DictLayout::WordId
}

/// Vocabulary of the embedding matrices.
///
/// Either a token list (`tokens`) or a list of word identifiers (`ids`)
/// with a dictionary (`dict`) must be given.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct VocabConfig {
    pub tokens: Option<PathBuf>,
    pub ids: Option<PathBuf>,
    pub dict: Option<PathBuf>,

    #[serde(default = "default_layout")]
    pub layout: DictLayout,
}

impl VocabConfig {
    /// Read the tokens of the matrix rows.
    pub fn read_tokens(&self) -> Result<Vec<String>> {
        match (&self.tokens, &self.ids, &self.dict) {
            (Some(tokens), None, None) => {
                read_tokens(open_file(tokens)?).map_err(|e| e.in_file(tokens))
            }
            (None, Some(ids), Some(dict)) => {
                let ids = read_word_ids(open_file(ids)?).map_err(|e| e.in_file(ids))?;
                let id_to_word =
                    IdToWord::read(open_file(dict)?, self.layout).map_err(|e| e.in_file(dict))?;
                id_to_word.tokens(&ids)
            }
            _ => Err(Error::Format(
                "The vocabulary needs either 'tokens' or both 'ids' and 'dict'".to_owned(),
            )),
        }
    }

    fn resolve(&mut self, base: &Path) {
        for path in [&mut self.tokens, &mut self.ids, &mut self.dict].iter_mut() {
            if let Some(path) = path {
                resolve_path(base, path);
            }
        }
    }
}

/// Analogy benchmark settings.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AnalogySection {
    pub path: PathBuf,

    #[serde(default = "default_n_semantic")]
    pub n_semantic: usize,

    #[serde(default)]
    pub case_insensitive: bool,

    pub restrict_vocab: Option<usize>,
}

impl AnalogySection {
    pub fn config(&self) -> AnalogyConfig {
        AnalogyConfig {
            n_semantic: self.n_semantic,
            case_insensitive: self.case_insensitive,
            restrict_vocab: self.restrict_vocab,
        }
    }
}

/// Similarity benchmark settings.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SimilaritySection {
    /// Prefix of the metric names in the report.
    pub name: String,

    pub path: PathBuf,

    #[serde(default = "default_similarity_delimiter")]
    pub delimiter: char,

    #[serde(default)]
    pub skip_lines: usize,

    /// An empty marker disables comments.
    #[serde(default = "default_comment_marker")]
    pub comment_marker: String,

    #[serde(default)]
    pub case_insensitive: bool,

    pub restrict_vocab: Option<usize>,
}

impl SimilaritySection {
    pub fn format(&self) -> SimilarityDatasetFormat {
        SimilarityDatasetFormat {
            delimiter: self.delimiter,
            skip_lines: self.skip_lines,
            comment_marker: Some(self.comment_marker.clone()).filter(|marker| !marker.is_empty()),
            case_insensitive: self.case_insensitive,
        }
    }
}

impl EvalConfig {
    /// Parse a configuration.
    ///
    /// Relative paths are kept as they are.
    pub fn parse(config: &str) -> Result<Self> {
        Ok(toml::from_str(config)?)
    }

    /// Read a configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|e| {
            Error::read_error(format!("Cannot read configuration {}", path.display()), e)
        })?;

        let mut config = Self::parse(&data)?;
        if let Some(base) = path.parent() {
            config.resolve(base);
        }

        Ok(config)
    }

    /// Resolve relative paths against `base`.
    pub fn resolve(&mut self, base: &Path) {
        self.vocab.resolve(base);
        if let Some(ref mut analogy) = self.analogy {
            resolve_path(base, &mut analogy.path);
        }
        for similarity in &mut self.similarity {
            resolve_path(base, &mut similarity.path);
        }
    }

    /// Read the vocabulary and benchmark datasets.
    pub fn runner(&self) -> Result<BatchRunner> {
        let mut runner = BatchRunner::new(self.vocab.read_tokens()?)?
            .extension(self.extension.clone())
            .delimiter(self.delimiter);

        if let Some(ref format) = self.format {
            runner = runner.format(MatrixFormat::try_from(format)?);
        }

        for similarity in &self.similarity {
            let dataset = SimilarityDataset::from_path(&similarity.path, &similarity.format())?;
            runner = runner.similarity(similarity.name.clone(), dataset, similarity.restrict_vocab);
        }

        if let Some(ref analogy) = self.analogy {
            runner = runner.analogy(AnalogyDataset::from_path(&analogy.path)?, analogy.config());
        }

        Ok(runner)
    }
}

fn resolve_path(base: &Path, path: &mut PathBuf) {
    *path = base.join(&*path);
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::EvalConfig;
    use crate::error::Error;
    use crate::eval::SimilarityDatasetFormat;
    use crate::vocab::DictLayout;

    static CONFIG: &str = r#"
extension = "npy"

[vocab]
ids = "word_ids.txt"
dict = "dict.tab"
layout = "id-word"

[analogy]
path = "questions.txt"
case_insensitive = true
restrict_vocab = 30000

[[similarity]]
name = "wordsim353"
path = "wordsim353/combined.tab"

[[similarity]]
name = "simlex999"
path = "/data/simlex999.txt"
delimiter = ","
comment_marker = ""
skip_lines = 1
"#;

    #[test]
    fn parse_with_defaults() {
        let config = EvalConfig::parse(CONFIG).unwrap();
        assert_eq!(config.extension, "npy");
        assert_eq!(config.delimiter, ',');
        assert_eq!(config.format, None);
        assert_eq!(config.vocab.layout, DictLayout::IdWord);

        let analogy = config.analogy.unwrap().config();
        assert_eq!(analogy.n_semantic, 5);
        assert!(analogy.case_insensitive);
        assert_eq!(analogy.restrict_vocab, Some(30000));

        assert_eq!(config.similarity.len(), 2);
        assert_eq!(config.similarity[0].format(), SimilarityDatasetFormat::default());
        assert_eq!(
            config.similarity[1].format(),
            SimilarityDatasetFormat::csv_with_header()
        );
    }

    #[test]
    fn resolve_relative_paths() {
        let mut config = EvalConfig::parse(CONFIG).unwrap();
        config.resolve(Path::new("/eval"));
        assert_eq!(config.vocab.ids, Some(PathBuf::from("/eval/word_ids.txt")));
        assert_eq!(config.vocab.tokens, None);
        assert_eq!(
            config.similarity[0].path,
            PathBuf::from("/eval/wordsim353/combined.tab")
        );
        assert_eq!(
            config.similarity[1].path,
            PathBuf::from("/data/simlex999.txt")
        );
    }

    #[test]
    fn reject_unknown_fields() {
        assert!(matches!(
            EvalConfig::parse("[vocab]\ntokens = \"t.txt\"\nunknown = 1\n"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            EvalConfig::parse("extension = \"csv\"\n"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn vocabulary_needs_tokens_or_ids() {
        let config = EvalConfig::parse("[vocab]\nids = \"ids.txt\"\n").unwrap();
        assert!(matches!(
            config.vocab.read_tokens(),
            Err(Error::Format(_))
        ));
    }
}
