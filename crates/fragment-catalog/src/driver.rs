use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::catalog::{EntryIndex, FragmentCatalog};
use crate::color_table::ColorTable;
use crate::colored_graph::ColoredGraph;
use crate::components::into_candidates;
use crate::isomorphism::DEFAULT_SEARCH_BUDGET;
use crate::parse::{parse_log, BlockKind, ParsedLog};

/// Number of [FailureRecord]s kept per batch. Later failures are only counted.
pub const MAX_FAILURE_RECORDS: usize = 32;

/// Provides the text of decomposition logs.
///
/// Implementations must be [Sync] because the logs of one batch may be read in parallel.
pub trait LogSource: Sync {
    /// Read the complete log identified by `path`.
    fn read_log(&self, path: &Path) -> io::Result<String>;
}

/// Reads logs from the file system.
#[derive(Copy, Clone, Debug, Default)]
pub struct FileSystem;

/// Bytes that are not valid UTF-8 are replaced, so they can only break the block they belong to.
impl LogSource for FileSystem {
    fn read_log(&self, path: &Path) -> io::Result<String> {
        let bytes = std::fs::read(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Logs held in memory, keyed by path.
impl LogSource for HashMap<PathBuf, String> {
    fn read_log(&self, path: &Path) -> io::Result<String> {
        self.get(path).cloned().ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such log"))
    }
}

/// A log could not be read. The file is skipped and the batch continues.
#[derive(Error, Debug)]
#[error("could not read {}: {source}", path.display())]
pub struct FileReadError {
    /// The log that failed.
    pub path: PathBuf,
    /// The underlying error.
    #[source]
    pub source: io::Error,
}

/// One time-ordered unit of input.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    /// Label credited as "first seen" for new shapes, e.g. `2020-01`.
    pub label: String,
    /// Logs of the batch, processed in this order.
    pub files: Vec<PathBuf>,
}

impl Batch {
    /// Create a batch.
    pub fn new(label: impl Into<String>, files: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self { label: label.into(), files: files.into_iter().map(Into::into).collect() }
    }
}

/// A recovered failure, kept for reporting.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct FailureRecord {
    /// Log in which the failure happened.
    pub path: PathBuf,
    /// Human-readable description.
    pub message: String,
}

/// Statistics of one processed batch.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct BatchResult {
    /// Label of the batch.
    pub batch_label: String,
    /// Logs that were read successfully.
    pub files_read: usize,
    /// Logs that could not be read.
    pub file_read_failures: usize,
    /// Blocks that were dropped as malformed.
    pub block_parse_failures: usize,
    /// Candidates obtained by splitting remnant blocks.
    pub remnant_components: usize,
    /// Candidates submitted to the catalog.
    pub candidates_processed: usize,
    /// Candidates that created a new catalog entry.
    pub novel_count: usize,
    /// Candidates that matched an existing entry.
    pub recurrence_count: usize,
    /// Isomorphism searches that gave up and were counted as non-matches.
    pub search_budget_exceeded: u64,
    /// Catalog entry of every candidate, in submission order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub matches: Vec<EntryIndex>,
    /// Entries created by this batch.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub novel_entries: Vec<EntryIndex>,
    /// The first [MAX_FAILURE_RECORDS] failures.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailureRecord>,
}

impl BatchResult {
    fn new(label: &str) -> Self {
        Self { batch_label: label.to_owned(), ..Default::default() }
    }

    fn record_failure(&mut self, path: &Path, message: String) {
        if self.failures.len() < MAX_FAILURE_RECORDS {
            self.failures.push(FailureRecord { path: path.to_owned(), message });
        }
    }
}

/// Settings of a [BatchDriver].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DriverOptions {
    /// Read and parse the logs of a batch on the rayon thread pool.
    pub parallel_parse: bool,
    /// Step budget of a single isomorphism search.
    pub search_budget: u64,
    /// Record the matched entry of every candidate in [BatchResult::matches].
    pub keep_matches: bool,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self { parallel_parse: true, search_budget: DEFAULT_SEARCH_BUDGET, keep_matches: true }
    }
}

/// Everything a run produced.
#[derive(Clone, Debug)]
pub struct RunSummary {
    /// One result per batch, in batch order.
    pub results: Vec<BatchResult>,
    /// The final catalog.
    pub catalog: FragmentCatalog,
    /// Colour tokens seen during the run.
    pub colors: ColorTable,
}

/// Feeds batches of decomposition logs through parser, splitter and catalog.
///
/// Batches are processed strictly in the order given, and so are the candidates within a batch,
/// which makes novelty attribution deterministic. Only reading and parsing of independent logs
/// may run in parallel.
#[derive(Debug)]
pub struct BatchDriver<S> {
    source: S,
    options: DriverOptions,
    colors: ColorTable,
    catalog: FragmentCatalog,
}

impl<S: LogSource> BatchDriver<S> {
    /// Create a driver with an empty catalog and colour table.
    pub fn new(source: S, options: DriverOptions) -> Self {
        let catalog = FragmentCatalog::with_search_budget(options.search_budget);
        Self { source, options, colors: ColorTable::new(), catalog }
    }

    /// Process all batches in order.
    pub fn run<I>(mut self, batches: I) -> RunSummary
    where
        I: IntoIterator<Item = Batch>,
    {
        let results = batches.into_iter().map(|batch| self.process_batch(&batch)).collect();
        RunSummary { results, catalog: self.catalog, colors: self.colors }
    }

    /// Process one batch against the current catalog.
    ///
    /// Failures to read a log or to parse a block are counted in the result and never stop the
    /// batch.
    #[instrument(skip_all, fields(batch = %batch.label))]
    pub fn process_batch(&mut self, batch: &Batch) -> BatchResult {
        let logs = self.read_logs(&batch.files);
        let budget_exceeded_before = self.catalog.stats().budget_exceeded;

        let mut result = BatchResult::new(&batch.label);
        for (path, log) in batch.files.iter().zip(logs) {
            let log = match log {
                Ok(log) => log,
                Err(err) => {
                    warn!(path = %path.display(), error = %err.source, "skipping unreadable log");
                    result.file_read_failures += 1;
                    result.record_failure(path, err.to_string());
                    continue;
                }
            };
            result.files_read += 1;

            let parsed = log.resolve(&mut self.colors);
            for err in parsed.failures {
                debug!(path = %path.display(), %err, "dropping block");
                result.block_parse_failures += 1;
                result.record_failure(path, err.to_string());
            }
            for fragment in parsed.fragments {
                let is_remnant = fragment.kind == BlockKind::Remnant;
                let candidates = into_candidates(fragment);
                if is_remnant {
                    result.remnant_components += candidates.len();
                }
                for candidate in candidates {
                    self.submit(&mut result, candidate);
                }
            }
        }

        result.search_budget_exceeded = self.catalog.stats().budget_exceeded - budget_exceeded_before;
        info!(
            files = result.files_read,
            candidates = result.candidates_processed,
            novel = result.novel_count,
            recurrences = result.recurrence_count,
            catalog_size = self.catalog.len(),
        );
        result
    }

    fn read_logs(&self, files: &[PathBuf]) -> Vec<Result<ParsedLog, FileReadError>> {
        let source = &self.source;
        let read = |path: &PathBuf| -> Result<ParsedLog, FileReadError> {
            let text = source.read_log(path).map_err(|source| FileReadError { path: path.clone(), source })?;
            Ok(parse_log(&text))
        };
        if self.options.parallel_parse {
            files.par_iter().map(read).collect()
        } else {
            files.iter().map(read).collect()
        }
    }

    fn submit(&mut self, result: &mut BatchResult, candidate: ColoredGraph) {
        let (index, novel) = self.catalog.find_or_insert(candidate, &result.batch_label);
        result.candidates_processed += 1;
        if novel {
            result.novel_count += 1;
            result.novel_entries.push(index);
        } else {
            result.recurrence_count += 1;
        }
        if self.options.keep_matches {
            result.matches.push(index);
        }
    }

    /// The catalog built so far.
    pub fn catalog(&self) -> &FragmentCatalog {
        &self.catalog
    }

    /// The colour table built so far.
    pub fn colors(&self) -> &ColorTable {
        &self.colors
    }
}
