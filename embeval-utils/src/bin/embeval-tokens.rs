use std::io::{BufWriter, Write};

use clap::{App, Arg, ArgMatches};
use embeval::eval::{AnalogyDataset, SimilarityDataset, SimilarityDatasetFormat};
use embeval_utils::{init_logging, DEFAULT_CLAP_SETTINGS};
use stdinout::{Input, OrExit, Output};

// Option constants
static BENCHMARK: &str = "benchmark";
static COMMENT: &str = "comment";
static DELIMITER: &str = "delimiter";
static INPUT: &str = "INPUT";
static NO_ANSWERS: &str = "no-answers";
static OUTPUT: &str = "OUTPUT";
static SKIP_LINES: &str = "skip-lines";

fn parse_args() -> ArgMatches<'static> {
    App::new("embeval-tokens")
        .settings(DEFAULT_CLAP_SETTINGS)
        .about("List the distinct tokens of a benchmark dataset")
        .arg(
            Arg::with_name(BENCHMARK)
                .short("b")
                .long("benchmark")
                .value_name("TYPE")
                .help("Benchmark type: analogy or similarity (default: analogy)")
                .possible_values(&["analogy", "similarity"])
                .takes_value(true),
        )
        .arg(
            Arg::with_name(NO_ANSWERS)
                .long("no-answers")
                .help("Do not list analogy answers"),
        )
        .arg(
            Arg::with_name(DELIMITER)
                .short("d")
                .long("delimiter")
                .value_name("CHAR")
                .help("Similarity field delimiter (default: tab)")
                .takes_value(true),
        )
        .arg(
            Arg::with_name(SKIP_LINES)
                .long("skip-lines")
                .value_name("N")
                .help("Skip the first N lines of a similarity dataset (default: 0)")
                .takes_value(true),
        )
        .arg(
            Arg::with_name(COMMENT)
                .long("comment")
                .value_name("MARKER")
                .help("Similarity comment marker, empty to disable (default: #)")
                .takes_value(true),
        )
        .arg(Arg::with_name(INPUT).help("Benchmark dataset").index(1))
        .arg(Arg::with_name(OUTPUT).help("Token output").index(2))
        .get_matches()
}

fn similarity_format(matches: &ArgMatches) -> SimilarityDatasetFormat {
    let mut format = SimilarityDatasetFormat::default();

    if let Some(delimiter) = matches.value_of(DELIMITER) {
        let mut chars = delimiter.chars();
        format.delimiter = match (chars.next(), chars.next()) {
            (Some(c), None) => c,
            _ => {
                eprintln!("Delimiter must be a single character: {}", delimiter);
                std::process::exit(1)
            }
        };
    }

    if let Some(skip_lines) = matches.value_of(SKIP_LINES) {
        format.skip_lines = skip_lines
            .parse()
            .or_exit("Cannot parse number of lines to skip", 1);
    }

    if let Some(marker) = matches.value_of(COMMENT) {
        format.comment_marker = Some(marker.to_owned()).filter(|marker| !marker.is_empty());
    }

    format
}

fn main() {
    init_logging();

    let matches = parse_args();

    let input = Input::from(matches.value_of(INPUT));
    let reader = input.buf_read().or_exit("Cannot open input for reading", 1);

    let output = Output::from(matches.value_of(OUTPUT));
    let mut writer = BufWriter::new(output.write().or_exit("Cannot open output for writing", 1));

    let tokens = match matches.value_of(BENCHMARK).unwrap_or("analogy") {
        "similarity" => SimilarityDataset::read(reader, &similarity_format(&matches))
            .or_exit("Cannot read similarity dataset", 1)
            .tokens()
            .into_iter()
            .map(ToOwned::to_owned)
            .collect::<Vec<_>>(),
        _ => AnalogyDataset::read(reader)
            .or_exit("Cannot read analogies", 1)
            .tokens(!matches.is_present(NO_ANSWERS))
            .into_iter()
            .map(ToOwned::to_owned)
            .collect::<Vec<_>>(),
    };

    for token in tokens {
        writeln!(writer, "{}", token).or_exit("Cannot write token", 1);
    }
}
