use std::fs::File;
use std::io::BufReader;

use anyhow::{Context, Result};
use clap::{AppSettings, ArgMatches};
use embeval::vocab::{read_tokens, read_word_ids, DictLayout, IdToWord};
use tracing_subscriber::{fmt, EnvFilter};

pub static DEFAULT_CLAP_SETTINGS: &[AppSettings] = &[
    AppSettings::DontCollapseArgsInUsage,
    AppSettings::UnifiedHelpMessage,
];

/// Log to stderr, filtered by `RUST_LOG` (default: `info`).
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Where the tokens of the matrix rows come from.
pub enum VocabSource {
    /// A token list, one token per line.
    Tokens(String),

    /// A list of word identifiers with a dictionary.
    Ids {
        ids: String,
        dict: String,
        layout: DictLayout,
    },
}

impl VocabSource {
    /// Get the vocabulary source from the `tokens`, `ids`, `dict`, and
    /// `layout` arguments.
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        if let Some(tokens) = matches.value_of("tokens") {
            return Ok(VocabSource::Tokens(tokens.to_owned()));
        }

        let ids = matches
            .value_of("ids")
            .context("Either a token list or word identifiers are required")?;
        let dict = matches
            .value_of("dict")
            .context("Word identifiers require a dictionary")?;
        let layout = matches
            .value_of("layout")
            .map(DictLayout::try_from)
            .transpose()?
            .unwrap_or(DictLayout::WordId);

        Ok(VocabSource::Ids {
            ids: ids.to_owned(),
            dict: dict.to_owned(),
            layout,
        })
    }

    pub fn read_tokens(&self) -> Result<Vec<String>> {
        match self {
            VocabSource::Tokens(path) => {
                let reader = open(path)?;
                Ok(read_tokens(reader).with_context(|| format!("Cannot read tokens from {}", path))?)
            }
            VocabSource::Ids { ids, dict, layout } => {
                let ids = read_word_ids(open(ids)?)
                    .with_context(|| format!("Cannot read word identifiers from {}", ids))?;
                let id_to_word = IdToWord::read(open(dict)?, *layout)
                    .with_context(|| format!("Cannot read dictionary {}", dict))?;
                Ok(id_to_word.tokens(&ids)?)
            }
        }
    }
}

fn open(path: &str) -> Result<BufReader<File>> {
    let f = File::open(path).with_context(|| format!("Cannot open {}", path))?;
    Ok(BufReader::new(f))
}
