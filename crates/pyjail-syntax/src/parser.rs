//! Tree-sitter Python parsing with error recovery.
//!
//! The parser never executes anything: it turns script text into a concrete
//! syntax tree whose ERROR and MISSING nodes describe malformed input.

use std::ops::Range;

use crate::error::SyntaxError;
use crate::position::Location;
use crate::walk::{node_text, preorder};

const CONTEXT_LIMIT: usize = 40;

/// Result of parsing a script.
///
/// Tree-sitter is error-tolerant, so a parse result may contain both a
/// usable tree and error nodes.
#[derive(Debug)]
pub struct ParseResult {
    tree: tree_sitter::Tree,
    source: String,
}

impl ParseResult {
    /// Returns the parsed syntax tree.
    #[must_use]
    pub const fn tree(&self) -> &tree_sitter::Tree {
        &self.tree
    }

    /// Returns the source code that was parsed.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns whether the tree contains ERROR or MISSING nodes.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    /// Collects every syntax error in source order.
    #[must_use]
    pub fn errors(&self) -> Vec<SyntaxErrorInfo> {
        preorder(self.tree.root_node())
            .map(|visit| visit.node)
            .filter(|node| node.is_error() || node.is_missing())
            .map(|node| SyntaxErrorInfo::from_node(node, &self.source))
            .collect()
    }

    /// Returns the first syntax error, if any.
    #[must_use]
    pub fn first_error(&self) -> Option<SyntaxErrorInfo> {
        if !self.has_errors() {
            return None;
        }
        preorder(self.tree.root_node())
            .map(|visit| visit.node)
            .find(|node| node.is_error() || node.is_missing())
            .map(|node| SyntaxErrorInfo::from_node(node, &self.source))
    }

    /// Returns the root `module` node of the syntax tree.
    #[must_use]
    pub fn root_node(&self) -> tree_sitter::Node<'_> {
        self.tree.root_node()
    }
}

/// A syntax error found during parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxErrorInfo {
    /// Byte range of the error in the source.
    pub byte_range: Range<usize>,
    /// Where the error starts.
    pub location: Location,
    /// A snippet of the offending source text, possibly empty.
    pub context: String,
    /// Human-readable description of the error.
    pub message: String,
}

impl SyntaxErrorInfo {
    fn from_node(node: tree_sitter::Node<'_>, source: &str) -> Self {
        let text = node_text(node, source);
        let context = match text.char_indices().nth(CONTEXT_LIMIT) {
            Some((cut, _)) => format!("{}...", text.get(..cut).unwrap_or_default()),
            None => text.to_owned(),
        };
        let message = if node.is_missing() {
            format!("missing {}", node.kind())
        } else {
            "invalid syntax".to_owned()
        };

        Self {
            byte_range: node.byte_range(),
            location: Location::of(node),
            context,
            message,
        }
    }
}

impl std::fmt::Display for SyntaxErrorInfo {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}: {}", self.location, self.message)?;
        let snippet = self.context.trim();
        if !snippet.is_empty() {
            write!(formatter, " near `{snippet}`")?;
        }
        Ok(())
    }
}

/// Tree-sitter parser configured for Python.
pub struct Parser {
    inner: tree_sitter::Parser,
}

impl Parser {
    /// Creates a parser loaded with the Python grammar.
    ///
    /// # Errors
    ///
    /// Returns an error if the grammar's ABI does not match the linked
    /// Tree-sitter runtime.
    pub fn new() -> Result<Self, SyntaxError> {
        let mut inner = tree_sitter::Parser::new();
        inner
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|error| SyntaxError::parser_init(error.to_string()))?;
        Ok(Self { inner })
    }

    /// Parses `source`.
    ///
    /// Malformed input still yields a tree; use [`ParseResult::has_errors`]
    /// to check for errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the parser fails to produce a tree at all.
    pub fn parse(&mut self, source: &str) -> Result<ParseResult, SyntaxError> {
        let tree = self
            .inner
            .parse(source, None)
            .ok_or_else(|| SyntaxError::parse("parser produced no tree"))?;

        Ok(ParseResult {
            tree,
            source: source.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("def main():\n    return 1\n")]
    #[case("x = [i * 2 for i in range(3)]\n")]
    #[case("")]
    fn parses_valid_python(#[case] source: &str) {
        let mut parser = Parser::new().expect("parser init");
        let result = parser.parse(source).expect("parse");
        assert!(!result.has_errors());
        assert!(result.first_error().is_none());
    }

    #[rstest]
    #[case("def broken(")]
    #[case("def main()\n    return 1\n")]
    #[case("x = (1, 2\n")]
    fn reports_malformed_python(#[case] source: &str) {
        let mut parser = Parser::new().expect("parser init");
        let result = parser.parse(source).expect("parse");
        assert!(result.has_errors());
        assert!(!result.errors().is_empty());
    }

    #[test]
    fn error_location_is_one_based() {
        let mut parser = Parser::new().expect("parser init");
        let result = parser.parse("x = 1\ny = = 2\n").expect("parse");
        let error = result.first_error().expect("has error");
        assert_eq!(error.location.line, 2);
        assert!(error.location.column >= 1);
        assert!(error.to_string().starts_with("line 2, column "));
    }

    #[test]
    fn long_contexts_are_truncated() {
        let mut parser = Parser::new().expect("parser init");
        let source = format!("x = ({}", "1 + ".repeat(40));
        let result = parser.parse(&source).expect("parse");
        for error in result.errors() {
            assert!(error.context.chars().count() <= CONTEXT_LIMIT + 3);
        }
    }
}
