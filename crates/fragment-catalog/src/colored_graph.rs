use std::fmt::{Debug, Formatter};

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use thiserror::Error;

use crate::color_table::ColorId;

/// A [ColoredGraph] could not be built from its parts.
#[derive(Error, Debug, Clone, Copy, Eq, PartialEq)]
pub enum GraphError {
    /// An edge references a vertex index that is not below the vertex count.
    #[error("edge ({u}, {v}) references a vertex outside 0..{n}")]
    VertexOutOfRange {
        /// First endpoint.
        u: usize,
        /// Second endpoint.
        v: usize,
        /// Number of vertices.
        n: usize,
    },
    /// An edge connects a vertex to itself.
    #[error("self loop at vertex {0}")]
    SelfLoop(usize),
    /// The same unordered vertex pair appears twice.
    #[error("duplicate edge ({0}, {1})")]
    DuplicateEdge(usize, usize),
}

/// A small, simple, undirected graph with one colour per vertex and one colour per edge.
///
/// Vertices are `0..n` in insertion order and edges keep their insertion order. The graph is
/// immutable once built.
#[derive(Clone)]
pub struct ColoredGraph {
    graph: UnGraph<ColorId, ColorId>,
}

impl ColoredGraph {
    /// Build a graph from its vertex colours and a list of `(u, v, colour)` edges.
    ///
    /// # Errors
    ///
    /// Returns a [GraphError] if an edge references a missing vertex, is a self loop, or repeats
    /// an earlier edge.
    pub fn new<I>(vertex_colors: Vec<ColorId>, edges: I) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = (usize, usize, ColorId)>,
    {
        let edges = edges.into_iter();
        let n = vertex_colors.len();
        let mut graph = UnGraph::with_capacity(n, edges.size_hint().0);
        for color in vertex_colors {
            graph.add_node(color);
        }
        for (u, v, color) in edges {
            if u >= n || v >= n {
                return Err(GraphError::VertexOutOfRange { u, v, n });
            }
            if u == v {
                return Err(GraphError::SelfLoop(u));
            }
            let (a, b) = (NodeIndex::new(u), NodeIndex::new(v));
            if graph.find_edge(a, b).is_some() {
                return Err(GraphError::DuplicateEdge(u, v));
            }
            graph.add_edge(a, b, color);
        }
        Ok(Self { graph })
    }

    /// Number of vertices.
    #[inline(always)]
    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges.
    #[inline(always)]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Colour of vertex `v`.
    ///
    /// Panics if `v` is not a vertex.
    pub fn vertex_color(&self, v: usize) -> ColorId {
        self.graph[NodeIndex::new(v)]
    }

    /// Vertex colours in vertex order.
    pub fn vertex_colors(&self) -> impl Iterator<Item = ColorId> + '_ {
        self.graph.node_weights().copied()
    }

    /// Edges as `(u, v, colour)` in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, ColorId)> + '_ {
        self.graph.edge_references().map(|e| (e.source().index(), e.target().index(), *e.weight()))
    }

    /// Neighbours of `v` together with the colour of the connecting edge.
    pub fn neighbors(&self, v: usize) -> impl Iterator<Item = (usize, ColorId)> + '_ {
        self.graph.edges(NodeIndex::new(v)).map(move |e| {
            let w = if e.source().index() == v { e.target() } else { e.source() };
            (w.index(), *e.weight())
        })
    }

    /// Number of edges incident to `v`.
    pub fn degree(&self, v: usize) -> usize {
        self.graph.edges(NodeIndex::new(v)).count()
    }

    /// Vertex colours sorted ascending. Two isomorphic graphs have equal colour multisets.
    pub fn sorted_vertex_colors(&self) -> Vec<ColorId> {
        let mut colors: Vec<_> = self.vertex_colors().collect();
        colors.sort_unstable();
        colors
    }

    /// Returns `true` if the graph has at most one connected component.
    pub fn is_connected(&self) -> bool {
        self.vertex_count() == 0 || petgraph::algo::connected_components(&self.graph) == 1
    }

    /// Borrow the underlying [petgraph] graph.
    ///
    /// Node weights are vertex colours and edge weights are edge colours.
    pub fn as_petgraph(&self) -> &UnGraph<ColorId, ColorId> {
        &self.graph
    }
}

/// Two graphs are equal if they have the same vertex colours and the same edges in the same
/// order. This is identity of representation, not isomorphism.
impl PartialEq for ColoredGraph {
    fn eq(&self, other: &Self) -> bool {
        self.vertex_count() == other.vertex_count()
            && self.edge_count() == other.edge_count()
            && self.vertex_colors().eq(other.vertex_colors())
            && self.edges().eq(other.edges())
    }
}

impl Eq for ColoredGraph {}

impl Debug for ColoredGraph {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColoredGraph")
            .field("vertex_colors", &self.vertex_colors().map(|c| c.index()).collect::<Vec<_>>())
            .field("edges", &self.edges().map(|(u, v, c)| (u, v, c.index())).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tests::{colors, path_fragment};

    #[test]
    fn build_and_query() {
        let graph = ColoredGraph::new(colors(&[0, 1, 2]), [(0, 1, ColorId::new(0)), (1, 2, ColorId::new(1))]).unwrap();
        assert_eq!(graph.vertex_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.vertex_color(1), ColorId::new(1));
        assert_eq!(graph.degree(1), 2);
        assert_eq!(graph.degree(0), 1);
        let mut neighbors: Vec<_> = graph.neighbors(1).collect();
        neighbors.sort();
        assert_eq!(neighbors, [(0, ColorId::new(0)), (2, ColorId::new(1))]);
        assert_eq!(graph.edges().collect::<Vec<_>>(), [(0, 1, ColorId::new(0)), (1, 2, ColorId::new(1))]);
        assert!(graph.is_connected());
    }

    #[test]
    fn rejects_invalid_edges() {
        let c = ColorId::new(0);
        assert_eq!(
            ColoredGraph::new(colors(&[0, 0]), [(0, 2, c)]).unwrap_err(),
            GraphError::VertexOutOfRange { u: 0, v: 2, n: 2 }
        );
        assert_eq!(ColoredGraph::new(colors(&[0, 0]), [(1, 1, c)]).unwrap_err(), GraphError::SelfLoop(1));
        assert_eq!(
            ColoredGraph::new(colors(&[0, 0]), [(0, 1, c), (1, 0, c)]).unwrap_err(),
            GraphError::DuplicateEdge(1, 0)
        );
    }

    #[test]
    fn empty_graph_is_connected() {
        let graph = ColoredGraph::new(vec![], []).unwrap();
        assert_eq!(graph.vertex_count(), 0);
        assert!(graph.is_connected());
    }

    #[test]
    fn disconnected_graph() {
        let c = ColorId::new(0);
        let graph = ColoredGraph::new(colors(&[0, 0, 0, 0]), [(0, 1, c), (2, 3, c)]).unwrap();
        assert!(!graph.is_connected());
    }

    #[test]
    fn equality_is_representational() {
        let a = path_fragment(&[0, 1, 2]);
        let b = path_fragment(&[0, 1, 2]);
        let c = path_fragment(&[2, 1, 0]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.sorted_vertex_colors(), c.sorted_vertex_colors());
    }
}
