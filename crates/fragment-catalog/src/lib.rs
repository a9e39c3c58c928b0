//! This is a library to measure the structural diversity of molecular fragments over time.
//!
//! A decomposition tool writes the fragments it cuts from each molecule as colored graphs. Vertex
//! colours are atom types, edge colours are bond types. This crate reads those logs batch by
//! batch, splits remnant graphs into connected pieces, and keeps a catalog with one representative
//! per isomorphism class. Every candidate is reported as either *novel* or a *recurrence* of an
//! earlier shape.
//!
//! # Examples
//!
//! Two fragments that only differ in vertex order are the same shape.
//! ```rust
//! use fragment_catalog::{parse_fragments, ColorTable, FragmentCatalog};
//!
//! let log = "\
//! ======
//! Vertices [0, 1, 2]
//! Edges [(0,1),(1,2)]
//! VertexColours [C, N, O]
//! EdgeColours [single, double]
//! ======
//! Vertices [7, 3, 5]
//! Edges [(5,3),(3,7)]
//! VertexColours [O, N, C]
//! EdgeColours [single, double]
//! ";
//!
//! let mut colors = ColorTable::new();
//! let parsed = parse_fragments(log, &mut colors);
//! assert!(parsed.failures.is_empty());
//!
//! let mut catalog = FragmentCatalog::new();
//! let novel: Vec<bool> = parsed
//!     .fragments
//!     .into_iter()
//!     .map(|fragment| catalog.find_or_insert(fragment.graph, "2020-01").1)
//!     .collect();
//!
//! assert_eq!(novel, [true, false]);
//! assert_eq!(catalog.len(), 1);
//! assert_eq!(catalog.entries()[0].count(), 2);
//! ```
//!
//! Whole runs over time-ordered batches are driven by [BatchDriver].
//! ```rust
//! use std::collections::HashMap;
//! use std::path::PathBuf;
//!
//! use fragment_catalog::{Batch, BatchDriver, DriverOptions};
//!
//! let triangle = "\
//! ======
//! Vertices [0, 1, 2]
//! Edges [(0,1),(1,2),(2,0)]
//! VertexColours [C, C, C]
//! EdgeColours [1, 1, 1]
//! ";
//! let logs: HashMap<PathBuf, String> = [
//!     (PathBuf::from("a.txt"), triangle.to_owned()),
//!     (PathBuf::from("b.txt"), triangle.to_owned()),
//! ]
//! .into_iter()
//! .collect();
//!
//! let batches = [Batch::new("2020-01", ["a.txt"]), Batch::new("2020-02", ["b.txt"])];
//! let summary = BatchDriver::new(logs, DriverOptions::default()).run(batches);
//!
//! assert_eq!(summary.results[0].novel_count, 1);
//! assert_eq!(summary.results[1].recurrence_count, 1);
//! assert_eq!(summary.catalog.entries()[0].first_seen_batch(), "2020-01");
//! ```
//!
//! # Isomorphism
//!
//! Catalog entries are bucketed by vertex count, edge count and vertex colour multiset. Inside a
//! bucket, cheap invariants are compared first and only then a backtracking search in the style
//! of VF2 is run. Each search has a step budget. A search that runs out of steps is counted as a
//! non-match, which can only ever over-count novelty.

#![forbid(unsafe_code)]
#![doc(test(attr(deny(warnings, rust_2018_idioms), allow(dead_code))))]
#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms, unreachable_pub)]

mod catalog;
mod color_table;
mod colored_graph;
mod components;
mod driver;
mod index;
mod isomorphism;
mod parse;

#[cfg(test)]
mod tests;

pub use catalog::{find_duplicates, CanonicalFragment, CatalogStats, EntryIndex, FragmentCatalog};
pub use color_table::{ColorId, ColorTable, Palette};
pub use colored_graph::{ColoredGraph, GraphError};
pub use components::{connected_components, into_candidates};
pub use driver::{
    Batch, BatchDriver, BatchResult, DriverOptions, FailureRecord, FileReadError, FileSystem, LogSource, RunSummary,
    MAX_FAILURE_RECORDS,
};
pub use isomorphism::{
    are_isomorphic, find_isomorphism, PreparedGraph, SearchBudgetExceeded, SearchOutcome, DEFAULT_SEARCH_BUDGET,
};
pub use parse::{
    parse_fragments, parse_log, BlockKind, BlockParseError, Fragment, LineKind, ParsedFile, ParsedLog, RawBlock,
    REMNANT_MARKER,
};
