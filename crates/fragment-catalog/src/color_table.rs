use std::collections::HashMap;

use crate::index::make_index;

make_index!(
    /// Dense id of a colour token within one [Palette].
    pub ColorId
);

/// An append-only, bidirectional mapping between raw colour tokens and dense ids.
///
/// The first token interned gets id `0`, the next unseen token `1`, and so on. A token keeps its id
/// for the lifetime of the palette.
#[derive(Clone, Debug, Default)]
pub struct Palette {
    ids: HashMap<String, ColorId>,
    tokens: Vec<String>,
}

impl Palette {
    /// Create an empty palette.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id of `token`, assigning the next unused id if it has not been seen before.
    pub fn intern(&mut self, token: &str) -> ColorId {
        if let Some(&id) = self.ids.get(token) {
            return id;
        }
        let id = ColorId::new(self.tokens.len());
        self.tokens.push(token.to_owned());
        self.ids.insert(token.to_owned(), id);
        id
    }

    /// Return the id of `token` if it was interned.
    pub fn get(&self, token: &str) -> Option<ColorId> {
        self.ids.get(token).copied()
    }

    /// Return the token for `id`.
    pub fn token(&self, id: ColorId) -> Option<&str> {
        self.tokens.get(id.index()).map(String::as_str)
    }

    /// Return all tokens ordered by id.
    pub fn tokens(&self) -> impl Iterator<Item = &str> + '_ {
        self.tokens.iter().map(String::as_str)
    }

    /// Number of distinct tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns `true` if no token was interned yet.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Separate vertex and edge [Palette]s shared by every file of one run.
///
/// Sharing the table makes identical tokens from different files compare equal as plain integers.
#[derive(Clone, Debug, Default)]
pub struct ColorTable {
    vertex: Palette,
    edge: Palette,
}

impl ColorTable {
    /// Create a table with empty palettes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a vertex colour token.
    pub fn intern_vertex(&mut self, token: &str) -> ColorId {
        self.vertex.intern(token)
    }

    /// Intern an edge colour token.
    pub fn intern_edge(&mut self, token: &str) -> ColorId {
        self.edge.intern(token)
    }

    /// The vertex colour palette.
    pub fn vertex_palette(&self) -> &Palette {
        &self.vertex
    }

    /// The edge colour palette.
    pub fn edge_palette(&self) -> &Palette {
        &self.edge
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn intern_is_dense_and_stable() {
        let mut palette = Palette::new();
        let c = palette.intern("C");
        let n = palette.intern("N");
        assert_eq!(c, ColorId::new(0));
        assert_eq!(n, ColorId::new(1));
        assert_eq!(palette.intern("C"), c);
        assert_eq!(palette.len(), 2);
        assert_eq!(palette.token(n), Some("N"));
        assert_eq!(palette.token(ColorId::new(2)), None);
        assert_eq!(palette.tokens().collect::<Vec<_>>(), ["C", "N"]);
    }

    #[test]
    fn vertex_and_edge_palettes_are_separate() {
        let mut table = ColorTable::new();
        let v = table.intern_vertex("1");
        let e = table.intern_edge("2");
        let e1 = table.intern_edge("1");
        assert_eq!(v, ColorId::new(0));
        assert_eq!(e, ColorId::new(0));
        assert_eq!(e1, ColorId::new(1));
        assert_eq!(table.vertex_palette().get("2"), None);
        assert_eq!(table.edge_palette().get("1"), Some(e1));
    }
}
