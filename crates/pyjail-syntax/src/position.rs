//! One-based source locations for user-facing messages.

use std::fmt;

/// Line and column of a node, both counted from one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Location {
    /// One-based line number.
    pub line: u32,
    /// One-based column, in bytes.
    pub column: u32,
}

impl Location {
    /// Location of the first byte of `node`.
    #[must_use]
    pub fn of(node: tree_sitter::Node<'_>) -> Self {
        Self::from_point(node.start_position())
    }

    /// Converts a zero-based Tree-sitter point.
    #[must_use]
    pub fn from_point(point: tree_sitter::Point) -> Self {
        Self {
            line: one_based(point.row),
            column: one_based(point.column),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "line {}, column {}", self.line, self.column)
    }
}

fn one_based(index: usize) -> u32 {
    u32::try_from(index.saturating_add(1)).unwrap_or(u32::MAX)
}
