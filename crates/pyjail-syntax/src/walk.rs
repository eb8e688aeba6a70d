//! Stack-safe pre-order traversal of a syntax tree.
//!
//! Submitted scripts may nest arbitrarily deep, so traversal uses a
//! [`tree_sitter::TreeCursor`] instead of recursion.

use tree_sitter::{Node, TreeCursor};

/// A node together with the context it was reached in.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Visit<'tree> {
    pub(crate) node: Node<'tree>,
    /// Field name of `node` within its parent, if any.
    pub(crate) field: Option<&'static str>,
    pub(crate) parent: Option<Node<'tree>>,
    pub(crate) grandparent: Option<Node<'tree>>,
}

impl Visit<'_> {
    pub(crate) fn parent_kind(&self) -> Option<&'static str> {
        self.parent.map(|node| node.kind())
    }

    pub(crate) fn grandparent_kind(&self) -> Option<&'static str> {
        self.grandparent.map(|node| node.kind())
    }
}

/// Iterator over every node below and including a root.
pub(crate) struct Preorder<'tree> {
    cursor: TreeCursor<'tree>,
    ancestors: Vec<Node<'tree>>,
    finished: bool,
}

/// Walks `root` and all its descendants in source order.
pub(crate) fn preorder(root: Node<'_>) -> Preorder<'_> {
    Preorder {
        cursor: root.walk(),
        ancestors: Vec::new(),
        finished: false,
    }
}

impl<'tree> Preorder<'tree> {
    fn advance(&mut self, current: Node<'tree>) {
        if self.cursor.goto_first_child() {
            self.ancestors.push(current);
            return;
        }
        loop {
            if self.ancestors.is_empty() {
                self.finished = true;
                return;
            }
            if self.cursor.goto_next_sibling() {
                return;
            }
            self.cursor.goto_parent();
            self.ancestors.pop();
        }
    }
}

impl<'tree> Iterator for Preorder<'tree> {
    type Item = Visit<'tree>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let depth = self.ancestors.len();
        let visit = Visit {
            node: self.cursor.node(),
            field: self.cursor.field_name(),
            parent: self.ancestors.last().copied(),
            grandparent: depth
                .checked_sub(2)
                .and_then(|index| self.ancestors.get(index))
                .copied(),
        };
        self.advance(visit.node);
        Some(visit)
    }
}

/// Text of `node` in `source`, or an empty string for invalid ranges.
pub(crate) fn node_text<'src>(node: Node<'_>, source: &'src str) -> &'src str {
    source.get(node.byte_range()).unwrap_or_default()
}
