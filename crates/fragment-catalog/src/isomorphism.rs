//! Colour-preserving isomorphism test for small graphs.
//!
//! The search extends a partial vertex mapping one pair at a time, in the spirit of VF2. Vertices of
//! the first graph are visited in a fixed order that stays connected to the already mapped part and
//! prefers rare colours, so that few candidates survive the feasibility check at every level.

use std::cmp::Reverse;
use std::collections::HashMap;

use thiserror::Error;
use tracing::warn;

use crate::color_table::ColorId;
use crate::colored_graph::ColoredGraph;

/// Default number of candidate pairs a single search may try before giving up.
pub const DEFAULT_SEARCH_BUDGET: u64 = 1_000_000;

/// The backtracking search tried more candidate pairs than allowed.
#[derive(Error, Debug, Clone, Copy, Eq, PartialEq)]
#[error("isomorphism search exceeded its budget of {budget} steps")]
pub struct SearchBudgetExceeded {
    /// The budget that was exceeded.
    pub budget: u64,
}

/// Returns `true` if there is a bijection between the vertices of `a` and `b` that preserves vertex
/// colours, adjacency and edge colours.
///
/// A search that exceeds [DEFAULT_SEARCH_BUDGET] is logged and counts as a non-match.
pub fn are_isomorphic(a: &ColoredGraph, b: &ColoredGraph) -> bool {
    match find_isomorphism(a, b, DEFAULT_SEARCH_BUDGET) {
        Ok(mapping) => mapping.is_some(),
        Err(err) => {
            warn!(n = a.vertex_count(), m = a.edge_count(), budget = err.budget, "isomorphism search gave up");
            false
        }
    }
}

/// Search for a colour-preserving isomorphism from `a` to `b`.
///
/// On success, `mapping[u]` is the vertex of `b` that vertex `u` of `a` is mapped to.
///
/// # Errors
///
/// Returns [SearchBudgetExceeded] if more than `budget` candidate pairs were tried.
pub fn find_isomorphism(
    a: &ColoredGraph,
    b: &ColoredGraph,
    budget: u64,
) -> Result<Option<Vec<usize>>, SearchBudgetExceeded> {
    PreparedGraph::new(a).find_isomorphism(&PreparedGraph::new(b), budget).map(|outcome| outcome.mapping)
}

/// Result of a completed search.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SearchOutcome {
    /// The isomorphism, if one exists.
    pub mapping: Option<Vec<usize>>,
    /// Number of candidate pairs tried. Zero if the invariants already differed.
    pub steps: u64,
}

/// A graph together with the invariants and the matching order used by the search.
///
/// Preparing a graph once and reusing it avoids recomputing this data for every comparison.
#[derive(Clone, Debug)]
pub struct PreparedGraph {
    colors: Vec<ColorId>,
    /// Sorted by neighbour.
    neighbors: Vec<Vec<(usize, ColorId)>>,
    edge_count: usize,
    sorted_colors: Vec<ColorId>,
    /// Sorted `(colour, degree)` pairs.
    signature: Vec<(ColorId, usize)>,
    sorted_edge_colors: Vec<ColorId>,
    order: Vec<usize>,
}

impl PreparedGraph {
    /// Compute invariants, adjacency lists and matching order of `graph`.
    pub fn new(graph: &ColoredGraph) -> Self {
        let n = graph.vertex_count();
        let colors: Vec<_> = graph.vertex_colors().collect();
        let mut neighbors = vec![vec![]; n];
        for (u, v, color) in graph.edges() {
            neighbors[u].push((v, color));
            neighbors[v].push((u, color));
        }
        for list in &mut neighbors {
            list.sort_unstable();
        }

        let sorted_colors = graph.sorted_vertex_colors();
        let mut signature: Vec<_> = (0..n).map(|u| (colors[u], neighbors[u].len())).collect();
        signature.sort_unstable();
        let mut sorted_edge_colors: Vec<_> = graph.edges().map(|(_, _, c)| c).collect();
        sorted_edge_colors.sort_unstable();

        let order = matching_order(&colors, &neighbors);

        Self { colors, neighbors, edge_count: graph.edge_count(), sorted_colors, signature, sorted_edge_colors, order }
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.colors.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Vertex colours sorted ascending.
    pub fn sorted_colors(&self) -> &[ColorId] {
        &self.sorted_colors
    }

    /// Cheap necessary conditions for isomorphism: equal vertex and edge counts, equal vertex colour
    /// multisets, equal `(colour, degree)` multisets and equal edge colour multisets.
    pub fn invariants_match(&self, other: &Self) -> bool {
        self.vertex_count() == other.vertex_count()
            && self.edge_count == other.edge_count
            && self.sorted_colors == other.sorted_colors
            && self.signature == other.signature
            && self.sorted_edge_colors == other.sorted_edge_colors
    }

    /// Search for an isomorphism from `self` to `other`.
    ///
    /// # Errors
    ///
    /// Returns [SearchBudgetExceeded] if more than `budget` candidate pairs were tried.
    pub fn find_isomorphism(&self, other: &Self, budget: u64) -> Result<SearchOutcome, SearchBudgetExceeded> {
        if !self.invariants_match(other) {
            return Ok(SearchOutcome { mapping: None, steps: 0 });
        }
        let n = self.vertex_count();
        let mut search =
            Search { a: self, b: other, core_a: vec![usize::MAX; n], core_b: vec![usize::MAX; n], steps: 0, budget };
        let found = search.extend(0)?;
        let steps = search.steps;
        Ok(SearchOutcome { mapping: found.then_some(search.core_a), steps })
    }

    fn edge(&self, u: usize, v: usize) -> Option<ColorId> {
        let list = &self.neighbors[u];
        list.binary_search_by_key(&v, |&(w, _)| w).ok().map(|i| list[i].1)
    }
}

/// Order in which the vertices of a graph are matched.
///
/// The next vertex is the one that is adjacent to an already ordered vertex, has the rarest colour,
/// the most ordered neighbours and the highest degree, in this priority. Ties go to the smaller
/// index.
fn matching_order(colors: &[ColorId], neighbors: &[Vec<(usize, ColorId)>]) -> Vec<usize> {
    let n = colors.len();
    let mut frequency: HashMap<ColorId, usize> = HashMap::new();
    for &c in colors {
        *frequency.entry(c).or_default() += 1;
    }

    let mut ordered = vec![false; n];
    let mut connections = vec![0_usize; n];
    let mut order = Vec::with_capacity(n);
    for _ in 0..n {
        let key = |u: usize| {
            (connections[u] > 0, Reverse(frequency[&colors[u]]), connections[u], neighbors[u].len(), Reverse(u))
        };
        let Some(u) = (0..n).filter(|&u| !ordered[u]).max_by_key(|&u| key(u)) else {
            break;
        };
        ordered[u] = true;
        order.push(u);
        for &(v, _) in &neighbors[u] {
            connections[v] += 1;
        }
    }
    order
}

struct Search<'a> {
    a: &'a PreparedGraph,
    b: &'a PreparedGraph,
    core_a: Vec<usize>,
    core_b: Vec<usize>,
    steps: u64,
    budget: u64,
}

impl Search<'_> {
    fn extend(&mut self, depth: usize) -> Result<bool, SearchBudgetExceeded> {
        if depth == self.a.order.len() {
            return Ok(true);
        }
        let u = self.a.order[depth];

        // A mapped neighbour restricts the candidates to the neighbours of its image.
        let anchor = self.a.neighbors[u].iter().map(|&(w, _)| w).find(|&w| self.core_a[w] != usize::MAX);
        let candidates: Vec<usize> = match anchor {
            Some(w) => self.b.neighbors[self.core_a[w]].iter().map(|&(x, _)| x).collect(),
            None => (0..self.b.vertex_count()).collect(),
        };

        for v in candidates {
            if self.core_b[v] != usize::MAX {
                continue;
            }
            self.steps += 1;
            if self.steps > self.budget {
                return Err(SearchBudgetExceeded { budget: self.budget });
            }
            if !self.feasible(u, v) {
                continue;
            }
            self.core_a[u] = v;
            self.core_b[v] = u;
            if self.extend(depth + 1)? {
                return Ok(true);
            }
            self.core_a[u] = usize::MAX;
            self.core_b[v] = usize::MAX;
        }
        Ok(false)
    }

    fn feasible(&self, u: usize, v: usize) -> bool {
        let (a, b) = (self.a, self.b);
        if a.colors[u] != b.colors[v] || a.neighbors[u].len() != b.neighbors[v].len() {
            return false;
        }
        let mut mapped_a = 0;
        for &(w, color) in &a.neighbors[u] {
            let x = self.core_a[w];
            if x != usize::MAX {
                if b.edge(v, x) != Some(color) {
                    return false;
                }
                mapped_a += 1;
            }
        }
        // Every mapped neighbour of `u` has a matching edge at `v`, so equal counts rule out extra
        // edges at `v`.
        let mapped_b = b.neighbors[v].iter().filter(|&&(x, _)| self.core_b[x] != usize::MAX).count();
        mapped_a == mapped_b
    }
}

#[cfg(test)]
mod test {
    use petgraph::algo::is_isomorphic_matching;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::tests::{colors, cycle_fragment, path_fragment, permuted, random_fragment};

    fn is_valid_mapping(a: &ColoredGraph, b: &ColoredGraph, mapping: &[usize]) -> bool {
        let mut image = mapping.to_vec();
        image.sort_unstable();
        if image != (0..b.vertex_count()).collect::<Vec<_>>() {
            return false;
        }
        let pb = PreparedGraph::new(b);
        (0..a.vertex_count()).all(|u| a.vertex_color(u) == b.vertex_color(mapping[u]))
            && a.edge_count() == b.edge_count()
            && a.edges().all(|(u, v, c)| pb.edge(mapping[u], mapping[v]) == Some(c))
    }

    fn reference(a: &ColoredGraph, b: &ColoredGraph) -> bool {
        is_isomorphic_matching(a.as_petgraph(), b.as_petgraph(), |x, y| x == y, |x, y| x == y)
    }

    #[test]
    fn empty_graphs_are_isomorphic() {
        let empty = ColoredGraph::new(vec![], []).unwrap();
        assert_eq!(find_isomorphism(&empty, &empty, 10), Ok(Some(vec![])));
    }

    #[test]
    fn reflexive() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut graphs = vec![path_fragment(&[0, 1, 2]), cycle_fragment(&[0, 0, 0, 0, 0, 0])];
        graphs.extend((0..50).map(|_| random_fragment(&mut rng, 12, 0.3, 3, 2)));
        for g in &graphs {
            let mapping = find_isomorphism(g, g, DEFAULT_SEARCH_BUDGET).unwrap().unwrap();
            assert!(is_valid_mapping(g, g, &mapping));
            assert!(are_isomorphic(g, g));
        }
    }

    #[test]
    fn relabelled_graphs_are_isomorphic() {
        let mut rng = StdRng::seed_from_u64(2);
        for n in [1, 2, 5, 10, 20, 30] {
            for _ in 0..20 {
                let a = random_fragment(&mut rng, n, 0.25, 3, 3);
                let b = permuted(&mut rng, &a);
                let mapping = find_isomorphism(&a, &b, DEFAULT_SEARCH_BUDGET).unwrap();
                let mapping = mapping.expect("a relabelled graph is isomorphic");
                assert!(is_valid_mapping(&a, &b, &mapping));
            }
        }
    }

    #[test]
    fn symmetric_and_agrees_with_petgraph() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..300 {
            // Few colours and similar sizes produce many near misses.
            let a = random_fragment(&mut rng, 6, 0.4, 2, 2);
            let b = random_fragment(&mut rng, 6, 0.4, 2, 2);
            let ab = are_isomorphic(&a, &b);
            assert_eq!(ab, are_isomorphic(&b, &a));
            assert_eq!(ab, reference(&a, &b), "a = {a:?}, b = {b:?}");
        }
    }

    #[test]
    fn transitive_on_curated_set() {
        let mut rng = StdRng::seed_from_u64(4);
        let base = [
            path_fragment(&[0, 1, 0, 1]),
            path_fragment(&[0, 0, 1, 1]),
            cycle_fragment(&[0, 1, 0, 1]),
            cycle_fragment(&[0, 0, 1, 1]),
        ];
        let mut set = vec![];
        for g in &base {
            set.push(g.clone());
            set.push(permuted(&mut rng, g));
            set.push(permuted(&mut rng, g));
        }
        for a in &set {
            for b in &set {
                for c in &set {
                    if are_isomorphic(a, b) && are_isomorphic(b, c) {
                        assert!(are_isomorphic(a, c));
                    }
                }
            }
        }
        // Each base graph is its own class.
        for (i, a) in base.iter().enumerate() {
            for (j, b) in base.iter().enumerate() {
                assert_eq!(are_isomorphic(a, b), i == j);
            }
        }
    }

    #[test]
    fn vertex_colours_matter() {
        assert!(!are_isomorphic(&path_fragment(&[0, 1, 2]), &path_fragment(&[1, 0, 2])));
        assert!(are_isomorphic(&path_fragment(&[0, 1, 2]), &path_fragment(&[2, 1, 0])));
    }

    #[test]
    fn edge_colours_matter() {
        let c = ColorId::new;
        let a = ColoredGraph::new(colors(&[0, 0, 0]), [(0, 1, c(0)), (1, 2, c(1))]).unwrap();
        let b = ColoredGraph::new(colors(&[0, 0, 0]), [(0, 1, c(1)), (1, 2, c(0))]).unwrap();
        let d = ColoredGraph::new(colors(&[0, 0, 0]), [(0, 1, c(1)), (1, 2, c(1))]).unwrap();
        assert!(are_isomorphic(&a, &b));
        assert!(!are_isomorphic(&a, &d));

        // Same edge colour multiset, different placement relative to vertex colours.
        let e = ColoredGraph::new(colors(&[0, 1, 2]), [(0, 1, c(0)), (1, 2, c(1))]).unwrap();
        let f = ColoredGraph::new(colors(&[0, 1, 2]), [(0, 1, c(1)), (1, 2, c(0))]).unwrap();
        assert!(!are_isomorphic(&e, &f));
    }

    #[test]
    fn equal_invariants_but_not_isomorphic() {
        // A hexagon and two triangles: same counts, colours and degrees.
        let hexagon = cycle_fragment(&[0; 6]);
        let c = ColorId::new(0);
        let triangles = ColoredGraph::new(
            colors(&[0; 6]),
            [(0, 1, c), (1, 2, c), (2, 0, c), (3, 4, c), (4, 5, c), (5, 3, c)],
        )
        .unwrap();
        assert!(PreparedGraph::new(&hexagon).invariants_match(&PreparedGraph::new(&triangles)));
        assert!(!are_isomorphic(&hexagon, &triangles));
        assert!(!are_isomorphic(&triangles, &hexagon));
    }

    #[test]
    fn size_mismatch_is_rejected_without_search() {
        let a = PreparedGraph::new(&path_fragment(&[0, 0, 0]));
        let b = PreparedGraph::new(&path_fragment(&[0, 0, 0, 0]));
        assert_eq!(a.find_isomorphism(&b, 0), Ok(SearchOutcome { mapping: None, steps: 0 }));
    }

    #[test]
    fn budget_exceeded() {
        let hexagon = cycle_fragment(&[0; 6]);
        assert_eq!(find_isomorphism(&hexagon, &hexagon, 2), Err(SearchBudgetExceeded { budget: 2 }));
        assert!(find_isomorphism(&hexagon, &hexagon, 100).unwrap().is_some());
    }

    #[test]
    fn matching_order_starts_with_rarest_colour_and_stays_connected() {
        // 0(C) - 1(C) - 2(N) - 3(C)
        let graph = path_fragment(&[0, 0, 1, 0]);
        let prepared = PreparedGraph::new(&graph);
        assert_eq!(prepared.order[0], 2);
        for (i, &u) in prepared.order.iter().enumerate().skip(1) {
            assert!(prepared.order[..i].iter().any(|&w| prepared.edge(u, w).is_some()));
        }
    }
}
