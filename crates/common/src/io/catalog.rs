use std::io::{Read, Write};

use fragment_catalog::{ColorId, ColorTable, ColoredGraph, FragmentCatalog, GraphError, Palette};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::WriteOutputError;

/// A catalog entry with colours written out as tokens.
#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
pub struct FragmentRecord {
    pub vertices: Vec<String>,
    pub edges: Vec<(usize, usize, String)>,
    pub count: u64,
    pub first_seen_batch: String,
}

/// The serialized form of a whole catalog.
#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
pub struct CatalogRecord {
    pub vertex_colours: Vec<String>,
    pub edge_colours: Vec<String>,
    pub fragments: Vec<FragmentRecord>,
}

#[derive(Error, Debug)]
pub enum ReadCatalogError {
    #[error("fragment {index} is not a valid graph")]
    InvalidFragment {
        index: usize,
        #[source]
        source: GraphError,
    },
    #[error("invalid catalog")]
    Json(#[from] serde_json::Error),
    #[error("io error")]
    IoError(#[from] std::io::Error),
}

impl CatalogRecord {
    /// Snapshot `catalog`, resolving colour ids through `colors`.
    pub fn new(catalog: &FragmentCatalog, colors: &ColorTable) -> Result<Self, WriteOutputError> {
        let token = |palette: &Palette, id: ColorId| {
            palette.token(id).map(str::to_owned).ok_or(WriteOutputError::UnknownColor(id.index()))
        };

        let mut fragments = Vec::with_capacity(catalog.len());
        for entry in catalog.entries() {
            let graph = entry.graph();
            let vertices = graph
                .vertex_colors()
                .map(|c| token(colors.vertex_palette(), c))
                .collect::<Result<Vec<_>, _>>()?;
            let edges = graph
                .edges()
                .map(|(u, v, c)| Ok((u, v, token(colors.edge_palette(), c)?)))
                .collect::<Result<Vec<_>, WriteOutputError>>()?;
            fragments.push(FragmentRecord {
                vertices,
                edges,
                count: entry.count(),
                first_seen_batch: entry.first_seen_batch().to_owned(),
            });
        }

        Ok(Self {
            vertex_colours: colors.vertex_palette().tokens().map(str::to_owned).collect(),
            edge_colours: colors.edge_palette().tokens().map(str::to_owned).collect(),
            fragments,
        })
    }

    /// Rebuild the graphs of all fragments.
    ///
    /// The returned table interns the listed colours first, so ids agree with the run that wrote
    /// the catalog.
    pub fn to_graphs(&self) -> Result<(ColorTable, Vec<ColoredGraph>), ReadCatalogError> {
        let mut colors = ColorTable::new();
        for token in &self.vertex_colours {
            colors.intern_vertex(token);
        }
        for token in &self.edge_colours {
            colors.intern_edge(token);
        }

        let mut graphs = Vec::with_capacity(self.fragments.len());
        for (index, fragment) in self.fragments.iter().enumerate() {
            let vertex_colors = fragment.vertices.iter().map(|token| colors.intern_vertex(token)).collect();
            let edges: Vec<_> =
                fragment.edges.iter().map(|(u, v, token)| (*u, *v, colors.intern_edge(token))).collect();
            let graph = ColoredGraph::new(vertex_colors, edges)
                .map_err(|source| ReadCatalogError::InvalidFragment { index, source })?;
            graphs.push(graph);
        }
        Ok((colors, graphs))
    }
}

pub fn write_catalog<W: Write>(mut writer: W, record: &CatalogRecord) -> Result<(), WriteOutputError> {
    serde_json::to_writer_pretty(&mut writer, record)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

pub fn read_catalog<R: Read>(reader: R) -> Result<CatalogRecord, ReadCatalogError> {
    Ok(serde_json::from_reader(reader)?)
}
