use std::io::BufRead;

use clap::{App, Arg, ArgMatches};
use embeval::prelude::*;
use embeval::similarity::WordSimilarityResult;
use embeval_utils::{init_logging, VocabSource, DEFAULT_CLAP_SETTINGS};
use stdinout::{Input, OrExit};

// Option constants
static DELIMITER: &str = "delimiter";
static DICT: &str = "dict";
static FORMAT: &str = "format";
static IDS: &str = "ids";
static INPUT: &str = "INPUT";
static LAYOUT: &str = "layout";
static MATRIX: &str = "MATRIX";
static NEIGHBORS: &str = "neighbors";
static TOKENS: &str = "tokens";

fn parse_args() -> ArgMatches<'static> {
    App::new("embeval-similar")
        .settings(DEFAULT_CLAP_SETTINGS)
        .about("Query nearest neighbors (one word per line) or analogies (three words per line)")
        .arg(
            Arg::with_name(FORMAT)
                .short("f")
                .long("format")
                .value_name("FORMAT")
                .help("Matrix format: npy, csv, tsv, or text (default: from extension)")
                .takes_value(true),
        )
        .arg(
            Arg::with_name(DELIMITER)
                .short("d")
                .long("delimiter")
                .value_name("CHAR")
                .help("Delimiter of text matrices (default: ,)")
                .takes_value(true),
        )
        .arg(
            Arg::with_name(NEIGHBORS)
                .short("k")
                .value_name("K")
                .help("Return K nearest neighbors (default: 10)")
                .takes_value(true),
        )
        .arg(
            Arg::with_name(TOKENS)
                .long("tokens")
                .value_name("FILE")
                .help("Token list, one token per matrix row")
                .takes_value(true)
                .required_unless(IDS),
        )
        .arg(
            Arg::with_name(IDS)
                .long("ids")
                .value_name("FILE")
                .help("Word identifiers, one identifier per matrix row")
                .takes_value(true)
                .conflicts_with(TOKENS)
                .requires(DICT),
        )
        .arg(
            Arg::with_name(DICT)
                .long("dict")
                .value_name("FILE")
                .help("Dictionary mapping words to identifiers")
                .takes_value(true),
        )
        .arg(
            Arg::with_name(LAYOUT)
                .long("layout")
                .value_name("LAYOUT")
                .help("Dictionary layout: word-id or id-word (default: word-id)")
                .possible_values(&["word-id", "id-word"])
                .takes_value(true),
        )
        .arg(
            Arg::with_name(MATRIX)
                .help("Embedding matrix")
                .index(1)
                .required(true),
        )
        .arg(Arg::with_name(INPUT).help("Input words").index(2))
        .get_matches()
}

struct Config {
    matrix_filename: String,
    format: MatrixFormat,
    vocab: VocabSource,
    k: usize,
}

fn config_from_matches(matches: &ArgMatches) -> Config {
    let matrix_filename = matches.value_of(MATRIX).unwrap().to_owned();

    let delimiter = matches
        .value_of(DELIMITER)
        .map(|d| {
            let mut chars = d.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => {
                    eprintln!("Delimiter must be a single character: {}", d);
                    std::process::exit(1)
                }
            }
        })
        .unwrap_or(',');

    let format = matches
        .value_of(FORMAT)
        .map(|f| MatrixFormat::try_from(f).or_exit("Cannot parse matrix format", 1))
        .unwrap_or_else(|| MatrixFormat::from_path(&matrix_filename, delimiter));

    let vocab = VocabSource::from_matches(matches).or_exit("Cannot determine vocabulary", 1);

    let k = matches
        .value_of(NEIGHBORS)
        .map(|v| v.parse().or_exit("Cannot parse k", 1))
        .unwrap_or(10);

    Config {
        matrix_filename,
        format,
        vocab,
        k,
    }
}

fn print_results(results: &[WordSimilarityResult]) {
    for similar in results {
        println!("{}\t{}", similar.word(), similar.cosine_similarity());
    }
}

fn main() {
    init_logging();

    let matches = parse_args();
    let config = config_from_matches(&matches);

    let tokens = config
        .vocab
        .read_tokens()
        .or_exit("Cannot read vocabulary", 1);
    let store = VectorStore::read(&config.matrix_filename, config.format, tokens)
        .or_exit("Cannot read embeddings", 1);

    let input = Input::from(matches.value_of(INPUT));
    let reader = input.buf_read().or_exit("Cannot open input for reading", 1);

    for line in reader.lines() {
        let line = line.or_exit("Cannot read line", 1);
        let words = line.split_whitespace().collect::<Vec<_>>();

        match words.as_slice() {
            [] => continue,
            &[word] => match store.word_similarity(word, config.k) {
                Some(results) => print_results(&results),
                None => eprintln!("Unknown word: {}", word),
            },
            &[word1, word2, word3] => match store.analogy([word1, word2, word3], config.k) {
                Ok(results) => print_results(&results),
                Err(present) => {
                    let unknown = [word1, word2, word3]
                        .iter()
                        .zip(&present)
                        .filter(|(_, present)| !**present)
                        .map(|(&word, _)| word)
                        .collect::<Vec<_>>();
                    eprintln!("Unknown words: {:?}", unknown);
                }
            },
            _ => eprintln!("Expected one or three words, got: {}", line),
        }
    }
}
