use std::collections::HashMap;

use serde::Serialize;
use tracing::{trace, warn};

use crate::color_table::ColorId;
use crate::colored_graph::ColoredGraph;
use crate::index::make_index;
use crate::isomorphism::{PreparedGraph, DEFAULT_SEARCH_BUDGET};

make_index!(
    /// Position of an entry in a [FragmentCatalog]. Entries are numbered in discovery order.
    pub EntryIndex
);

/// The first-seen representative of an isomorphism class together with its occurrence count.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CanonicalFragment {
    graph: ColoredGraph,
    count: u64,
    first_seen_batch: String,
}

impl CanonicalFragment {
    /// The representative graph.
    pub fn graph(&self) -> &ColoredGraph {
        &self.graph
    }

    /// Number of candidates that matched this entry, including the one that created it.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Label of the batch in which the shape was first seen.
    pub fn first_seen_batch(&self) -> &str {
        &self.first_seen_batch
    }
}

/// Counters describing the work done by a [FragmentCatalog].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct CatalogStats {
    /// Candidates submitted to [FragmentCatalog::find_or_insert].
    pub candidates: u64,
    /// Entries a candidate was compared against after bucketing.
    pub comparisons: u64,
    /// Comparisons that passed the invariant check and needed a backtracking search.
    pub full_searches: u64,
    /// Candidate pairs tried over all searches.
    pub search_steps: u64,
    /// Searches that gave up and were counted as non-matches.
    pub budget_exceeded: u64,
}

/// Graphs with different keys can never be isomorphic.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
struct BucketKey {
    vertex_count: usize,
    edge_count: usize,
    colors: Box<[ColorId]>,
}

impl BucketKey {
    fn of(prepared: &PreparedGraph) -> Self {
        Self {
            vertex_count: prepared.vertex_count(),
            edge_count: prepared.edge_count(),
            colors: prepared.sorted_colors().into(),
        }
    }
}

#[derive(Default)]
struct Lookup {
    found: Option<EntryIndex>,
    comparisons: u64,
    full_searches: u64,
    steps: u64,
    budget_exceeded: u64,
}

/// The growing collection of pairwise non-isomorphic fragments.
///
/// Entries are only ever appended and their graphs never change; the occurrence count is the only
/// mutable part of an entry. Entries are bucketed by vertex count, edge count and vertex colour
/// multiset, so a candidate is only compared against entries that could match it.
#[derive(Clone, Debug)]
pub struct FragmentCatalog {
    entries: Vec<CanonicalFragment>,
    prepared: Vec<PreparedGraph>,
    buckets: HashMap<BucketKey, Vec<EntryIndex>>,
    search_budget: u64,
    stats: CatalogStats,
}

impl Default for FragmentCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl FragmentCatalog {
    /// Create an empty catalog using [DEFAULT_SEARCH_BUDGET].
    pub fn new() -> Self {
        Self::with_search_budget(DEFAULT_SEARCH_BUDGET)
    }

    /// Create an empty catalog whose isomorphism searches give up after `budget` steps.
    ///
    /// A search that gives up counts as a non-match. With a budget that is too small, isomorphic
    /// shapes may therefore end up as separate entries.
    pub fn with_search_budget(budget: u64) -> Self {
        Self {
            entries: vec![],
            prepared: vec![],
            buckets: HashMap::new(),
            search_budget: budget,
            stats: CatalogStats::default(),
        }
    }

    /// Return the entry isomorphic to `candidate` and increment its count, or append `candidate` as
    /// a new entry first seen in `batch_label`.
    ///
    /// Returns the entry index and whether the candidate was novel.
    pub fn find_or_insert(&mut self, candidate: ColoredGraph, batch_label: &str) -> (EntryIndex, bool) {
        let prepared = PreparedGraph::new(&candidate);
        let key = BucketKey::of(&prepared);
        let lookup = self.lookup(&prepared, &key);

        self.stats.candidates += 1;
        self.stats.comparisons += lookup.comparisons;
        self.stats.full_searches += lookup.full_searches;
        self.stats.search_steps += lookup.steps;
        self.stats.budget_exceeded += lookup.budget_exceeded;

        if let Some(index) = lookup.found {
            self.entries[index.index()].count += 1;
            trace!(entry = index.index(), "recurrence");
            return (index, false);
        }

        let index = EntryIndex::new(self.entries.len());
        self.entries.push(CanonicalFragment { graph: candidate, count: 1, first_seen_batch: batch_label.to_owned() });
        self.prepared.push(prepared);
        self.buckets.entry(key).or_default().push(index);
        trace!(entry = index.index(), batch = batch_label, "novel");
        (index, true)
    }

    /// Return the entry isomorphic to `candidate` without changing the catalog.
    pub fn find(&self, candidate: &ColoredGraph) -> Option<EntryIndex> {
        let prepared = PreparedGraph::new(candidate);
        self.lookup(&prepared, &BucketKey::of(&prepared)).found
    }

    fn lookup(&self, prepared: &PreparedGraph, key: &BucketKey) -> Lookup {
        let mut lookup = Lookup::default();
        let Some(bucket) = self.buckets.get(key) else {
            return lookup;
        };
        for &index in bucket {
            lookup.comparisons += 1;
            let entry = &self.prepared[index.index()];
            if !prepared.invariants_match(entry) {
                continue;
            }
            lookup.full_searches += 1;
            match prepared.find_isomorphism(entry, self.search_budget) {
                Ok(outcome) => {
                    lookup.steps += outcome.steps;
                    if outcome.mapping.is_some() {
                        lookup.found = Some(index);
                        break;
                    }
                }
                Err(err) => {
                    lookup.steps += err.budget;
                    lookup.budget_exceeded += 1;
                    warn!(
                        entry = index.index(),
                        n = key.vertex_count,
                        m = key.edge_count,
                        budget = err.budget,
                        "isomorphism search gave up, treating as non-match"
                    );
                }
            }
        }
        lookup
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the catalog has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Access an entry.
    pub fn get(&self, index: EntryIndex) -> Option<&CanonicalFragment> {
        self.entries.get(index.index())
    }

    /// All entries in discovery order.
    pub fn entries(&self) -> &[CanonicalFragment] {
        &self.entries
    }

    /// Iterate over entries with their indices, in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = (EntryIndex, &CanonicalFragment)> + '_ {
        self.entries.iter().enumerate().map(|(i, entry)| (EntryIndex::new(i), entry))
    }

    /// Entries first seen in the batch labelled `label`.
    pub fn entries_first_seen_in<'a>(&'a self, label: &'a str) -> impl Iterator<Item = EntryIndex> + 'a {
        self.iter().filter(move |(_, entry)| entry.first_seen_batch == label).map(|(i, _)| i)
    }

    /// Number of distinct `(vertex count, edge count, colour multiset)` buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Work counters since the catalog was created.
    pub fn stats(&self) -> CatalogStats {
        self.stats
    }

    /// Pairs of entries that are isomorphic to each other. Empty unless a search gave up.
    pub fn find_duplicates(&self) -> Vec<(EntryIndex, EntryIndex)> {
        duplicate_pairs(&self.prepared, self.search_budget)
            .into_iter()
            .map(|(i, j)| (EntryIndex::new(i), EntryIndex::new(j)))
            .collect()
    }
}

/// Pairs `(i, j)` with `i < j` of isomorphic graphs.
///
/// Only graphs with equal vertex count, edge count and colour multiset are compared. A search
/// that exceeds `budget` is logged and not reported.
pub fn find_duplicates(graphs: &[ColoredGraph], budget: u64) -> Vec<(usize, usize)> {
    let prepared: Vec<_> = graphs.iter().map(PreparedGraph::new).collect();
    duplicate_pairs(&prepared, budget)
}

fn duplicate_pairs(prepared: &[PreparedGraph], budget: u64) -> Vec<(usize, usize)> {
    let mut buckets: HashMap<BucketKey, Vec<usize>> = HashMap::new();
    for (i, p) in prepared.iter().enumerate() {
        buckets.entry(BucketKey::of(p)).or_default().push(i);
    }

    let mut pairs = vec![];
    for bucket in buckets.values() {
        for (k, &i) in bucket.iter().enumerate() {
            for &j in &bucket[k + 1..] {
                match prepared[i].find_isomorphism(&prepared[j], budget) {
                    Ok(outcome) if outcome.mapping.is_some() => pairs.push((i, j)),
                    Ok(_) => {}
                    Err(err) => warn!(i, j, budget = err.budget, "isomorphism search gave up"),
                }
            }
        }
    }
    pairs.sort_unstable();
    pairs
}
