//! Reader for the text output of the structural decomposition tool.
//!
//! A log contains any number of fragment blocks. A standard block starts with a separator line made
//! of `=` characters that is immediately followed by a `Vertices` line. A remnant block starts with
//! the line `Remnant Graph`. Both are followed by exactly four content lines:
//!
//! ```text
//! ======
//! Vertices [0, 1, 2]
//! Edges [(0,1),(1,2)]
//! VertexColours [C, N, O]
//! EdgeColours [single, double]
//! ```
//!
//! Parsing happens in two phases. [parse_log] is a pure function of the text and validates the
//! structure of every block. [RawBlock::resolve] then interns the colour tokens in a shared
//! [ColorTable]. Only the second phase needs exclusive access to shared state.

use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter};

use thiserror::Error;

use crate::color_table::ColorTable;
use crate::colored_graph::{ColoredGraph, GraphError};

/// Line that introduces a remnant block.
pub const REMNANT_MARKER: &str = "Remnant Graph";

/// Minimum number of `=` characters in a separator line.
const MIN_SEPARATOR_LEN: usize = 2;

/// The four content lines of a block, in the order they must appear.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum LineKind {
    /// `Vertices [...]`
    Vertices,
    /// `Edges [...]`
    Edges,
    /// `VertexColours [...]`
    VertexColours,
    /// `EdgeColours [...]`
    EdgeColours,
}

impl LineKind {
    const ORDER: [LineKind; 4] = [LineKind::Vertices, LineKind::Edges, LineKind::VertexColours, LineKind::EdgeColours];

    fn accepts(self, label: &str) -> bool {
        match self {
            LineKind::Vertices => label == "Vertices",
            LineKind::Edges => label == "Edges",
            LineKind::VertexColours => label == "VertexColours" || label == "VertexColors",
            LineKind::EdgeColours => label == "EdgeColours" || label == "EdgeColors",
        }
    }
}

impl Display for LineKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            LineKind::Vertices => "Vertices",
            LineKind::Edges => "Edges",
            LineKind::VertexColours => "VertexColours",
            LineKind::EdgeColours => "EdgeColours",
        })
    }
}

/// A block of a decomposition log was malformed and has been dropped.
///
/// `line` is the 1-based line number of the separator or marker that opened the block.
#[allow(missing_docs)]
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum BlockParseError {
    #[error("block at line {line}: missing {expected} line")]
    MissingLine { line: usize, expected: LineKind },
    #[error("block at line {line}: expected {expected} line, got {actual:?}")]
    UnexpectedLabel { line: usize, expected: LineKind, actual: String },
    #[error("block at line {line}: malformed {kind} values {content:?}")]
    MalformedValues { line: usize, kind: LineKind, content: String },
    #[error("block at line {line}: fragment has no vertices")]
    EmptyFragment { line: usize },
    #[error("block at line {line}: duplicate vertex id {vertex}")]
    DuplicateVertex { line: usize, vertex: i64 },
    #[error("block at line {line}: edge references unknown vertex {vertex}")]
    UnknownVertex { line: usize, vertex: i64 },
    #[error("block at line {line}: wrong number of vertex colours (expected {expected}, got {actual})")]
    VertexColorCount { line: usize, expected: usize, actual: usize },
    #[error("block at line {line}: wrong number of edge colours (expected {expected}, got {actual})")]
    EdgeColorCount { line: usize, expected: usize, actual: usize },
    #[error("block at line {line}: invalid graph")]
    Graph {
        line: usize,
        #[source]
        source: GraphError,
    },
}

/// Whether a block is assumed connected or may bundle several components.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum BlockKind {
    /// A regular fragment, connected by construction.
    Fragment,
    /// A remnant graph that may be disconnected.
    Remnant,
}

/// A structurally valid block whose colours are still raw tokens.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawBlock {
    kind: BlockKind,
    line: usize,
    vertex_count: usize,
    edges: Vec<(usize, usize)>,
    vertex_colors: Vec<String>,
    edge_colors: Vec<String>,
}

impl RawBlock {
    /// Kind of the block.
    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    /// 1-based line number of the separator or marker that opened the block.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Number of vertices after remapping the source ids to `0..n`.
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Intern the colour tokens and build the [ColoredGraph].
    ///
    /// Colours are only interned once the graph is known to be valid.
    pub fn resolve(&self, colors: &mut ColorTable) -> Result<ColoredGraph, BlockParseError> {
        let line = self.line;
        let vertex_colors = self.vertex_colors.iter().map(|token| colors.intern_vertex(token)).collect();
        let edge_colors: Vec<_> = self.edge_colors.iter().map(|token| colors.intern_edge(token)).collect();
        let edges = self.edges.iter().zip(edge_colors).map(|(&(u, v), color)| (u, v, color));
        ColoredGraph::new(vertex_colors, edges).map_err(|source| BlockParseError::Graph { line, source })
    }
}

/// Result of the structural phase over one log.
#[derive(Clone, Debug, Default)]
pub struct ParsedLog {
    /// Valid blocks in file order.
    pub blocks: Vec<RawBlock>,
    /// Dropped blocks in file order.
    pub failures: Vec<BlockParseError>,
}

/// A block with resolved colours.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Fragment {
    /// Kind of the block the graph came from.
    pub kind: BlockKind,
    /// 1-based line number of the block.
    pub line: usize,
    /// The graph.
    pub graph: ColoredGraph,
}

/// Result of parsing and resolving one log.
#[derive(Clone, Debug, Default)]
pub struct ParsedFile {
    /// Fragments in file order.
    pub fragments: Vec<Fragment>,
    /// Dropped blocks.
    pub failures: Vec<BlockParseError>,
}

impl ParsedLog {
    /// Resolve every block against `colors`, in file order.
    pub fn resolve(self, colors: &mut ColorTable) -> ParsedFile {
        let ParsedLog { blocks, mut failures } = self;
        let mut fragments = Vec::with_capacity(blocks.len());
        for block in blocks {
            match block.resolve(colors) {
                Ok(graph) => fragments.push(Fragment { kind: block.kind, line: block.line, graph }),
                Err(err) => failures.push(err),
            }
        }
        ParsedFile { fragments, failures }
    }
}

/// Parse and resolve one log. Malformed blocks are dropped and reported in
/// [ParsedFile::failures]; they never stop the rest of the file from being read.
pub fn parse_fragments(text: &str, colors: &mut ColorTable) -> ParsedFile {
    parse_log(text).resolve(colors)
}

/// Find and validate every block of a log without touching any shared state.
pub fn parse_log(text: &str) -> ParsedLog {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let mut log = ParsedLog::default();

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        let start = if is_remnant_marker(line) {
            // The marker may be followed by its own separator.
            let mut first = i + 1;
            if lines.get(first).is_some_and(|l| is_separator(l)) {
                first += 1;
            }
            Some((BlockKind::Remnant, first))
        } else if is_separator(line) && lines.get(i + 1).is_some_and(|l| l.starts_with("Vertices")) {
            Some((BlockKind::Fragment, i + 1))
        } else {
            None
        };

        let Some((kind, first)) = start else {
            i += 1;
            continue;
        };
        match parse_block(kind, i + 1, &lines[first.min(lines.len())..]) {
            Ok(block) => {
                log.blocks.push(block);
                i = first + LineKind::ORDER.len();
            }
            Err(err) => {
                log.failures.push(err);
                i = first;
            }
        }
    }
    log
}

fn is_separator(line: &str) -> bool {
    line.len() >= MIN_SEPARATOR_LEN && line.bytes().all(|b| b == b'=')
}

fn is_remnant_marker(line: &str) -> bool {
    line.strip_suffix(':').unwrap_or(line).trim_end() == REMNANT_MARKER
}

fn parse_block(kind: BlockKind, line: usize, content: &[&str]) -> Result<RawBlock, BlockParseError> {
    let mut values = Vec::with_capacity(LineKind::ORDER.len());
    for (idx, expected) in LineKind::ORDER.into_iter().enumerate() {
        let text = content.get(idx).copied().filter(|l| !l.is_empty());
        let Some(text) = text else {
            return Err(BlockParseError::MissingLine { line, expected });
        };
        let (label, rest) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
        if !expected.accepts(label) {
            return Err(BlockParseError::UnexpectedLabel { line, expected, actual: label.to_owned() });
        }
        let parsed = match expected {
            LineKind::VertexColours | LineKind::EdgeColours => parse_tokens(rest),
            LineKind::Vertices | LineKind::Edges => parse_values(rest),
        };
        values.push((rest.trim(), parsed));
    }

    let malformed = |kind: LineKind, content: &str| BlockParseError::MalformedValues {
        line,
        kind,
        content: content.to_owned(),
    };

    let (raw, v) = &values[0];
    let vertex_ids = v.clone().into_integers().ok_or_else(|| malformed(LineKind::Vertices, raw))?;
    let (raw, e) = &values[1];
    let edge_ids = e.clone().into_pairs().ok_or_else(|| malformed(LineKind::Edges, raw))?;
    let (raw, vc) = &values[2];
    let vertex_colors = vc.clone().into_tokens().ok_or_else(|| malformed(LineKind::VertexColours, raw))?;
    let (raw, ec) = &values[3];
    let edge_colors = ec.clone().into_tokens().ok_or_else(|| malformed(LineKind::EdgeColours, raw))?;

    if kind == BlockKind::Fragment && vertex_ids.is_empty() {
        return Err(BlockParseError::EmptyFragment { line });
    }

    // Source ids are arbitrary; vertices are numbered in the order they are listed.
    let mut dense = HashMap::with_capacity(vertex_ids.len());
    for (i, &id) in vertex_ids.iter().enumerate() {
        if dense.insert(id, i).is_some() {
            return Err(BlockParseError::DuplicateVertex { line, vertex: id });
        }
    }
    let lookup = |vertex: i64| dense.get(&vertex).copied().ok_or(BlockParseError::UnknownVertex { line, vertex });

    let mut seen = HashSet::with_capacity(edge_ids.len());
    let mut edges = Vec::with_capacity(edge_ids.len());
    for (a, b) in edge_ids {
        let (u, v) = (lookup(a)?, lookup(b)?);
        if u == v {
            return Err(BlockParseError::Graph { line, source: GraphError::SelfLoop(u) });
        }
        if !seen.insert((u.min(v), u.max(v))) {
            return Err(BlockParseError::Graph { line, source: GraphError::DuplicateEdge(u, v) });
        }
        edges.push((u, v));
    }

    if vertex_colors.len() != vertex_ids.len() {
        return Err(BlockParseError::VertexColorCount { line, expected: vertex_ids.len(), actual: vertex_colors.len() });
    }
    if edge_colors.len() != edges.len() {
        return Err(BlockParseError::EdgeColorCount { line, expected: edges.len(), actual: edge_colors.len() });
    }

    Ok(RawBlock { kind, line, vertex_count: vertex_ids.len(), edges, vertex_colors, edge_colors })
}

/// The content of a bracketed value list.
#[derive(Clone, Debug, Eq, PartialEq)]
enum Values {
    Empty,
    Integers(Vec<i64>),
    Pairs(Vec<(i64, i64)>),
    Tokens(Vec<String>),
}

impl Values {
    fn into_integers(self) -> Option<Vec<i64>> {
        match self {
            Values::Empty => Some(vec![]),
            Values::Integers(values) => Some(values),
            Values::Tokens(tokens) => tokens.iter().map(|t| t.parse().ok()).collect(),
            Values::Pairs(_) => None,
        }
    }

    fn into_pairs(self) -> Option<Vec<(i64, i64)>> {
        match self {
            Values::Empty => Some(vec![]),
            Values::Pairs(pairs) => Some(pairs),
            Values::Integers(_) | Values::Tokens(_) => None,
        }
    }

    fn into_tokens(self) -> Option<Vec<String>> {
        match self {
            Values::Empty => Some(vec![]),
            Values::Tokens(tokens) => Some(tokens),
            Values::Integers(_) | Values::Pairs(_) => None,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum Value {
    Int(i64),
    Pair(i64, i64),
    Str(String),
}

/// Try the structured grammar first and fall back to whitespace-separated tokens.
fn parse_values(text: &str) -> Values {
    if let Some(values) = ValueCursor::new(text).list() {
        if let Some(values) = classify(values) {
            return values;
        }
    }
    split_tokens(text)
}

/// Colour tokens keep their source text, so `01` and `1` stay distinct. Only quotes and list
/// punctuation are removed.
fn parse_tokens(text: &str) -> Values {
    match parse_values(text) {
        Values::Integers(_) => split_tokens(text),
        values => values,
    }
}

fn split_tokens(text: &str) -> Values {
    let tokens: Vec<String> = text
        .split(|c: char| c.is_whitespace() || matches!(c, ',' | '[' | ']'))
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
        .collect();
    if tokens.is_empty() {
        Values::Empty
    } else {
        Values::Tokens(tokens)
    }
}

fn classify(values: Vec<Value>) -> Option<Values> {
    match values.first() {
        None => Some(Values::Empty),
        Some(Value::Int(_)) => values
            .into_iter()
            .map(|v| if let Value::Int(x) = v { Some(x) } else { None })
            .collect::<Option<_>>()
            .map(Values::Integers),
        Some(Value::Pair(..)) => values
            .into_iter()
            .map(|v| if let Value::Pair(a, b) = v { Some((a, b)) } else { None })
            .collect::<Option<_>>()
            .map(Values::Pairs),
        Some(Value::Str(_)) => values
            .into_iter()
            .map(|v| if let Value::Str(s) = v { Some(s) } else { None })
            .collect::<Option<_>>()
            .map(Values::Tokens),
    }
}

/// Recursive-descent reader for `[1, 2]`, `[1 2]`, `[(0, 1), (1, 2)]`, `[[0 1] [1 2]]` and `['C', 'N']`.
struct ValueCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ValueCursor<'a> {
    fn new(text: &'a str) -> Self {
        Self { bytes: text.trim().as_bytes(), pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn eat(&mut self, b: u8) -> Option<()> {
        (self.peek()? == b).then(|| self.pos += 1)
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b',')) {
            self.pos += 1;
        }
    }

    fn list(mut self) -> Option<Vec<Value>> {
        self.eat(b'[')?;
        let mut values = vec![];
        loop {
            self.skip_separators();
            match self.peek()? {
                b']' => {
                    self.pos += 1;
                    break;
                }
                b'(' => values.push(self.pair(b')')?),
                b'[' => values.push(self.pair(b']')?),
                b'\'' | b'"' => values.push(Value::Str(self.quoted()?)),
                _ => values.push(Value::Int(self.integer()?)),
            }
        }
        (self.pos == self.bytes.len()).then_some(values)
    }

    fn pair(&mut self, close: u8) -> Option<Value> {
        self.pos += 1;
        self.skip_separators();
        let a = self.integer()?;
        self.skip_separators();
        let b = self.integer()?;
        self.skip_separators();
        self.eat(close)?;
        Some(Value::Pair(a, b))
    }

    fn quoted(&mut self) -> Option<String> {
        let quote = self.peek()?;
        self.pos += 1;
        let start = self.pos;
        let len = self.bytes[start..].iter().position(|&b| b == quote)?;
        self.pos = start + len + 1;
        String::from_utf8(self.bytes[start..start + len].to_vec()).ok()
    }

    fn integer(&mut self) -> Option<i64> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        std::str::from_utf8(&self.bytes[start..self.pos]).ok()?.parse().ok()
    }
}
