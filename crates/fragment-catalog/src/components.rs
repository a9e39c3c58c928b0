use tracing::trace;

use crate::colored_graph::ColoredGraph;
use crate::parse::{BlockKind, Fragment};

/// Split a possibly disconnected graph into its maximal connected components.
///
/// Components are returned in order of their smallest vertex. Within a component the vertices are
/// renumbered `0..m` in depth-first discovery order. Edges keep their original relative order,
/// not discovery order. Colours are carried over unchanged.
pub fn connected_components(graph: &ColoredGraph) -> Vec<ColoredGraph> {
    let n = graph.vertex_count();
    let mut component = vec![usize::MAX; n];
    let mut local = vec![usize::MAX; n];
    let mut members: Vec<Vec<usize>> = vec![];

    let mut i = 0;
    let mut stack = vec![];
    loop {
        let Some(pos) = component[i..].iter().position(|c| *c == usize::MAX) else {
            break;
        };
        i += pos;
        let part = members.len();
        let mut vertices = vec![];

        let mut add_to_stack = |stack: &mut Vec<usize>, u: usize| {
            if component[u] == usize::MAX {
                component[u] = part;
                local[u] = vertices.len();
                vertices.push(u);
                stack.push(u);
            }
        };

        add_to_stack(&mut stack, i);
        while let Some(u) = stack.pop() {
            for (v, _) in graph.neighbors(u) {
                add_to_stack(&mut stack, v);
            }
        }
        members.push(vertices);
    }

    let mut edges: Vec<Vec<_>> = vec![vec![]; members.len()];
    for (u, v, color) in graph.edges() {
        debug_assert_eq!(component[u], component[v]);
        edges[component[u]].push((local[u], local[v], color));
    }

    trace!(n, components = members.len());

    members
        .into_iter()
        .zip(edges)
        .map(|(vertices, edges)| {
            let colors = vertices.iter().map(|&u| graph.vertex_color(u)).collect();
            ColoredGraph::new(colors, edges).expect("components of a valid graph are valid graphs")
        })
        .collect()
}

/// Turn a parsed block into catalog candidates.
///
/// Standard fragments are passed through unchanged, remnant graphs are split into components.
pub fn into_candidates(fragment: Fragment) -> Vec<ColoredGraph> {
    match fragment.kind {
        BlockKind::Fragment => vec![fragment.graph],
        BlockKind::Remnant => connected_components(&fragment.graph),
    }
}
