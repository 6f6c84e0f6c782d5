use std::fmt::{self, Display, Formatter};

use regex::Regex;
use serde::Serialize;

/// Index of a line inside a [`ConfigTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct LineId(pub usize);

/// A single configuration line and its position in the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigLine {
    /// Line text with surrounding whitespace removed.
    pub text: String,
    /// Count of leading whitespace characters in the source line.
    pub depth: usize,
    /// 1-based line number in the source text.
    pub line: usize,
    /// Enclosing line, `None` for top-level lines.
    pub parent: Option<LineId>,
    /// Nested lines in source order.
    pub children: Vec<LineId>,
}

/// An ordered forest of configuration lines stored in an arena.
///
/// Lines are appended in source order, so iterating `lines` is a pre-order walk
/// of the forest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigTree {
    pub(crate) lines: Vec<ConfigLine>,
    pub(crate) roots: Vec<LineId>,
}

impl ConfigTree {
    /// Create an empty forest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line under `parent` (or as a new root) and return its id.
    pub fn push(
        &mut self,
        parent: Option<LineId>,
        text: impl Into<String>,
        depth: usize,
        line: usize,
    ) -> LineId {
        let id = LineId(self.lines.len());
        self.lines.push(ConfigLine {
            text: text.into(),
            depth,
            line,
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(parent) => self.lines[parent.0].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    /// Number of lines in the forest.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the forest holds no lines at all.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Raw line storage for `id`.
    pub fn get(&self, id: LineId) -> Option<&ConfigLine> {
        self.lines.get(id.0)
    }

    /// Top-level lines in source order.
    pub fn roots(&self) -> impl Iterator<Item = ConfigNode<'_>> + '_ {
        self.roots.iter().map(move |id| ConfigNode { tree: self, id: *id })
    }

    /// Every line in source order, at any depth.
    pub fn iter(&self) -> impl Iterator<Item = ConfigNode<'_>> + '_ {
        (0..self.lines.len()).map(move |idx| ConfigNode {
            tree: self,
            id: LineId(idx),
        })
    }

    /// Return every line whose text matches `pattern`.
    ///
    /// The match is an unanchored search: `zone name` also hits any line that
    /// merely contains the phrase. Anchor with `^` for prefix matches.
    pub fn find_objects(&self, pattern: &Regex) -> Vec<ConfigNode<'_>> {
        self.iter()
            .filter(|node| pattern.is_match(node.text()))
            .collect()
    }
}

/// Borrowed view of one line inside a [`ConfigTree`].
#[derive(Clone, Copy)]
pub struct ConfigNode<'a> {
    tree: &'a ConfigTree,
    id: LineId,
}

impl<'a> ConfigNode<'a> {
    /// Arena id of this line.
    pub fn id(&self) -> LineId {
        self.id
    }

    fn data(&self) -> &'a ConfigLine {
        &self.tree.lines[self.id.0]
    }

    /// Trimmed line text.
    pub fn text(&self) -> &'a str {
        &self.data().text
    }

    /// Leading whitespace count.
    pub fn depth(&self) -> usize {
        self.data().depth
    }

    /// 1-based source line number.
    pub fn line(&self) -> usize {
        self.data().line
    }

    /// Enclosing line, if any.
    pub fn parent(&self) -> Option<ConfigNode<'a>> {
        self.data().parent.map(|id| ConfigNode {
            tree: self.tree,
            id,
        })
    }

    /// Direct children in source order.
    pub fn children(&self) -> impl Iterator<Item = ConfigNode<'a>> + 'a {
        let tree = self.tree;
        self.data()
            .children
            .iter()
            .map(move |id| ConfigNode { tree, id: *id })
    }

    /// Whitespace-delimited tokens of the line.
    pub fn tokens(&self) -> Vec<&'a str> {
        self.text().split_whitespace().collect()
    }

    /// The `index`-th whitespace-delimited token (0-based).
    pub fn token(&self, index: usize) -> Option<&'a str> {
        self.text().split_whitespace().nth(index)
    }
}

impl fmt::Debug for ConfigNode<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigNode")
            .field("line", &self.line())
            .field("depth", &self.depth())
            .field("text", &self.text())
            .finish()
    }
}

impl Display for ConfigNode<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text())
    }
}
