//! Fixtures shared by the unit tests.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::color_table::ColorId;
use crate::colored_graph::ColoredGraph;

pub(crate) const MINIMAL_BLOCK: &str = "\
======
Vertices [0, 1, 2]
Edges [(0,1),(1,2)]
VertexColours [C, N, O]
EdgeColours [single, double]
";

pub(crate) fn colors(ids: &[usize]) -> Vec<ColorId> {
    ids.iter().copied().map(ColorId::new).collect()
}

/// A path through the vertices in order, all edges coloured `0`.
pub(crate) fn path_fragment(vertex_colors: &[usize]) -> ColoredGraph {
    let n = vertex_colors.len();
    let edges = (1..n).map(|v| (v - 1, v, ColorId::new(0)));
    ColoredGraph::new(colors(vertex_colors), edges).unwrap()
}

/// A cycle through the vertices in order, all edges coloured `0`.
pub(crate) fn cycle_fragment(vertex_colors: &[usize]) -> ColoredGraph {
    let n = vertex_colors.len();
    let edges = (0..n).map(|v| (v, (v + 1) % n, ColorId::new(0)));
    ColoredGraph::new(colors(vertex_colors), edges).unwrap()
}

/// A random graph with edge probability `p` and colours drawn from `0..vertex_palette` and
/// `0..edge_palette`.
pub(crate) fn random_fragment(
    rng: &mut impl Rng,
    n: usize,
    p: f64,
    vertex_palette: usize,
    edge_palette: usize,
) -> ColoredGraph {
    let vertex_colors = (0..n).map(|_| ColorId::new(rng.gen_range(0..vertex_palette))).collect();
    let mut edges = vec![];
    for u in 0..n {
        for v in u + 1..n {
            if rng.gen_bool(p) {
                edges.push((u, v, ColorId::new(rng.gen_range(0..edge_palette))));
            }
        }
    }
    ColoredGraph::new(vertex_colors, edges).unwrap()
}

/// The same graph with shuffled vertex numbers, shuffled edge order and flipped edge endpoints.
pub(crate) fn permuted(rng: &mut impl Rng, graph: &ColoredGraph) -> ColoredGraph {
    let n = graph.vertex_count();
    let mut perm: Vec<usize> = (0..n).collect();
    perm.shuffle(rng);

    let mut vertex_colors = vec![ColorId::new(0); n];
    for (u, color) in graph.vertex_colors().enumerate() {
        vertex_colors[perm[u]] = color;
    }
    let mut edges: Vec<_> = graph
        .edges()
        .map(|(u, v, c)| if rng.gen_bool(0.5) { (perm[u], perm[v], c) } else { (perm[v], perm[u], c) })
        .collect();
    edges.shuffle(rng);
    ColoredGraph::new(vertex_colors, edges).unwrap()
}

/// Text of a standard block.
pub(crate) fn fragment_block(ids: &[i64], edges: &[(i64, i64)], vertex_colors: &[&str], edge_colors: &[&str]) -> String {
    let ids: Vec<_> = ids.iter().map(i64::to_string).collect();
    let edges: Vec<_> = edges.iter().map(|(u, v)| format!("({u}, {v})")).collect();
    format!(
        "======\nVertices [{}]\nEdges [{}]\nVertexColours [{}]\nEdgeColours [{}]\n",
        ids.join(", "),
        edges.join(", "),
        vertex_colors.join(", "),
        edge_colors.join(", ")
    )
}

/// Text of a remnant block.
pub(crate) fn remnant_block(ids: &[i64], edges: &[(i64, i64)], vertex_colors: &[&str], edge_colors: &[&str]) -> String {
    let block = fragment_block(ids, edges, vertex_colors, edge_colors);
    format!("Remnant Graph\n{}", block.trim_start_matches("======\n"))
}
