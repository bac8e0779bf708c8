use std::io::BufWriter;

use clap::{App, Arg, ArgMatches};
use embeval::prelude::*;
use embeval_utils::{init_logging, DEFAULT_CLAP_SETTINGS};
use rayon::ThreadPoolBuilder;
use stdinout::{OrExit, Output};
use tracing::info;

// Option constants
static CONFIG: &str = "CONFIG";
static DIR: &str = "DIR";
static EXTENSION: &str = "extension";
static OUTPUT: &str = "OUTPUT";
static THREADS: &str = "threads";

fn parse_args() -> ArgMatches<'static> {
    App::new("embeval-batch")
        .settings(DEFAULT_CLAP_SETTINGS)
        .about("Evaluate all embedding matrices in a directory")
        .arg(
            Arg::with_name(EXTENSION)
                .long("extension")
                .value_name("EXT")
                .help("Extension of matrix files (default: from configuration)")
                .takes_value(true),
        )
        .arg(
            Arg::with_name(THREADS)
                .long("threads")
                .value_name("N")
                .help("Number of threads (default: logical_cpus / 2)")
                .takes_value(true),
        )
        .arg(
            Arg::with_name(CONFIG)
                .help("Evaluation configuration (TOML)")
                .index(1)
                .required(true),
        )
        .arg(
            Arg::with_name(DIR)
                .help("Directory with embedding matrices")
                .index(2)
                .required(true),
        )
        .arg(Arg::with_name(OUTPUT).help("Report output (TSV)").index(3))
        .get_matches()
}

struct Config {
    config_filename: String,
    dir: String,
    extension: Option<String>,
    output_filename: Option<String>,
    n_threads: usize,
}

fn config_from_matches(matches: &ArgMatches) -> Config {
    let config_filename = matches.value_of(CONFIG).unwrap().to_owned();
    let dir = matches.value_of(DIR).unwrap().to_owned();
    let extension = matches.value_of(EXTENSION).map(ToOwned::to_owned);
    let output_filename = matches.value_of(OUTPUT).map(ToOwned::to_owned);
    let n_threads = matches
        .value_of(THREADS)
        .map(|v| v.parse().or_exit("Cannot parse number of threads", 1))
        .unwrap_or_else(|| (num_cpus::get() / 2).max(1));

    Config {
        config_filename,
        dir,
        extension,
        output_filename,
        n_threads,
    }
}

fn main() {
    init_logging();

    let matches = parse_args();
    let config = config_from_matches(&matches);

    ThreadPoolBuilder::new()
        .num_threads(config.n_threads)
        .build_global()
        .or_exit("Cannot build thread pool", 1);

    let eval_config =
        EvalConfig::from_path(&config.config_filename).or_exit("Cannot read configuration", 1);
    let mut runner = eval_config
        .runner()
        .or_exit("Cannot load vocabulary or benchmarks", 1);
    if let Some(extension) = config.extension {
        runner = runner.extension(extension);
    }

    let report = runner.run(&config.dir).or_exit("Cannot evaluate embeddings", 1);
    let n_errors = report.rows.iter().filter(|row| row.outcome.is_err()).count();
    info!(
        "Evaluated {} matrices, {} failed",
        report.rows.len(),
        n_errors
    );

    let output = Output::from(config.output_filename);
    let mut writer = BufWriter::new(output.write().or_exit("Cannot open output for writing", 1));
    report
        .write_report(&mut writer)
        .or_exit("Cannot write report", 1);
}
