//! Evaluation of all embedding matrices in a directory.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::compat::{read_matrix, MatrixFormat};
use crate::error::{Error, Result};
use crate::eval::{
    AnalogyBenchmark, AnalogyConfig, AnalogyDataset, EvaluationResult, SimilarityBenchmark,
    SimilarityDataset, ANALOGY_METRICS, SIMILARITY_METRICS,
};
use crate::store::VectorStore;
use crate::vocab::SimpleVocab;

/// Similarity dataset with the name used to prefix its metrics.
#[derive(Clone, Debug)]
pub struct NamedSimilarityDataset {
    pub name: String,
    pub dataset: SimilarityDataset,
    pub restrict_vocab: Option<usize>,
}

/// Batch evaluation of embedding matrices.
///
/// All matrices share the same vocabulary. Benchmark datasets are
/// loaded once and shared across matrices.
#[derive(Clone, Debug)]
pub struct BatchRunner {
    vocab: SimpleVocab,
    extension: String,
    delimiter: char,
    format: Option<MatrixFormat>,
    similarity: Vec<NamedSimilarityDataset>,
    analogy: Option<(AnalogyDataset, AnalogyConfig)>,
}

impl BatchRunner {
    /// Construct a runner for matrices with the given tokens.
    ///
    /// By default, files with the extension `csv` are read as
    /// comma-separated matrices.
    pub fn new(tokens: impl Into<Vec<String>>) -> Result<Self> {
        Ok(BatchRunner {
            vocab: SimpleVocab::new(tokens)?,
            extension: "csv".to_owned(),
            delimiter: ',',
            format: None,
            similarity: Vec::new(),
            analogy: None,
        })
    }

    /// Only evaluate files with this extension.
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Delimiter of text matrices.
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Read all matrices in this format, rather than guessing the
    /// format from the file extension.
    pub fn format(mut self, format: MatrixFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Add a similarity benchmark.
    ///
    /// Similarity benchmarks are run in the order in which they are
    /// added, before the analogy benchmark.
    pub fn similarity(
        mut self,
        name: impl Into<String>,
        dataset: SimilarityDataset,
        restrict_vocab: Option<usize>,
    ) -> Self {
        self.similarity.push(NamedSimilarityDataset {
            name: name.into(),
            dataset,
            restrict_vocab,
        });
        self
    }

    /// Set the analogy benchmark.
    pub fn analogy(mut self, dataset: AnalogyDataset, config: AnalogyConfig) -> Self {
        self.analogy = Some((dataset, config));
        self
    }

    /// Names of the metric columns of a report.
    pub fn columns(&self) -> Vec<String> {
        let mut columns = Vec::new();
        for similarity in &self.similarity {
            columns.extend(
                SIMILARITY_METRICS
                    .iter()
                    .map(|metric| format!("{}_{}", similarity.name, metric)),
            );
        }

        if self.analogy.is_some() {
            columns.extend(ANALOGY_METRICS.iter().map(|&metric| metric.to_owned()));
        }

        columns
    }

    /// Matrix files in `dir`, sorted by file name.
    pub fn matrix_files(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir).map_err(|e| {
            Error::read_error(format!("Cannot read directory {}", dir.display()), e)
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| {
                    Error::read_error(format!("Cannot read directory {}", dir.display()), e)
                })?
                .path();
            if path.is_file()
                && path.extension().and_then(|ext| ext.to_str()) == Some(self.extension.as_str())
            {
                files.push(path);
            }
        }

        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        Ok(files)
    }

    /// Evaluate all matrix files in a directory.
    ///
    /// Files are evaluated in parallel. A file that cannot be evaluated
    /// results in an error row, the run itself only fails when the
    /// directory cannot be read or contains no matrix files.
    pub fn run(&self, dir: impl AsRef<Path>) -> Result<Report> {
        let dir = dir.as_ref();
        let files = self.matrix_files(dir)?;
        if files.is_empty() {
            return Err(Error::NoMatrixFiles {
                dir: dir.to_owned(),
                extension: self.extension.clone(),
            });
        }

        info!("Evaluating {} matrices in {}", files.len(), dir.display());

        let rows = files
            .par_iter()
            .map(|path| {
                let file = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                let outcome = self.evaluate_file(path).map_err(|err| {
                    warn!("Cannot evaluate {}: {}", path.display(), err);
                    err.to_string()
                });
                ReportRow { file, outcome }
            })
            .collect();

        Ok(Report {
            columns: self.columns(),
            rows,
        })
    }

    /// Run all benchmarks on one matrix file.
    pub fn evaluate_file(&self, path: impl AsRef<Path>) -> Result<EvaluationResult> {
        let path = path.as_ref();
        let format = self
            .format
            .unwrap_or_else(|| MatrixFormat::from_path(path, self.delimiter));
        let store = VectorStore::new(self.vocab.clone(), read_matrix(path, format)?)?;
        self.evaluate(&store)
    }

    /// Run all benchmarks on a vector store.
    pub fn evaluate(&self, store: &VectorStore) -> Result<EvaluationResult> {
        let mut result = EvaluationResult::new();

        for similarity in &self.similarity {
            let scores = SimilarityBenchmark::new(&similarity.dataset)
                .restrict_vocab(similarity.restrict_vocab)
                .evaluate(store)?;
            result.extend(EvaluationResult::from(scores).prefixed(&similarity.name));
        }

        if let Some((ref dataset, config)) = self.analogy {
            result.extend(AnalogyBenchmark::new(dataset, config).accuracy(store)?.into());
        }

        Ok(result)
    }
}

/// Evaluation outcome of one matrix file.
#[derive(Clone, Debug, PartialEq)]
pub struct ReportRow {
    pub file: String,

    /// The metrics, or the error message when evaluation failed.
    pub outcome: std::result::Result<EvaluationResult, String>,
}

/// Evaluation results of a batch run, one row per matrix file.
#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    pub columns: Vec<String>,
    pub rows: Vec<ReportRow>,
}

impl Report {
    /// Cells of a row, aligned with the report columns.
    fn cells(&self, row: &ReportRow) -> Vec<String> {
        let mut cells = vec![String::new(); self.columns.len()];
        match row.outcome {
            Ok(ref result) => {
                for (cell, column) in cells.iter_mut().zip(&self.columns) {
                    if let Some(value) = result.get(column) {
                        *cell = value.to_string();
                    }
                }
            }
            Err(ref message) => match cells.first_mut() {
                Some(cell) => *cell = format!("ERROR: {}", message),
                None => cells.push(format!("ERROR: {}", message)),
            },
        }

        cells
    }
}

/// Write a report as tab-separated text.
pub trait WriteReport<W>
where
    W: Write,
{
    /// Write the report.
    ///
    /// The first line contains the column names, followed by one line
    /// per matrix file. Error rows hold the error message in the first
    /// metric column.
    fn write_report(&self, write: &mut W) -> Result<()>;
}

impl<W> WriteReport<W> for Report
where
    W: Write,
{
    fn write_report(&self, write: &mut W) -> Result<()> {
        writeln!(
            write,
            "file\t{}",
            self.columns.iter().map(|column| sanitize(column)).join("\t")
        )
        .map_err(|e| Error::write_error("Cannot write report header", e))?;

        for row in &self.rows {
            writeln!(
                write,
                "{}\t{}",
                sanitize(&row.file),
                self.cells(row).iter().map(|cell| sanitize(cell)).join("\t")
            )
            .map_err(|e| Error::write_error("Cannot write report row", e))?;
        }

        Ok(())
    }
}

// Tabs and newlines would break the table layout.
fn sanitize(cell: &str) -> String {
    cell.replace(|c: char| c == '\t' || c == '\n' || c == '\r', " ")
}
