//! Error types for the script parser.
//!
//! Rejections of user scripts are not errors: they are reported through
//! [`crate::ValidationVerdict`]. [`SyntaxError`] covers failures of the
//! parsing machinery itself.

use thiserror::Error;

/// Errors raised by the Tree-sitter machinery.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SyntaxError {
    /// The Python grammar could not be loaded into a parser.
    #[error("failed to initialise the Python parser: {message}")]
    ParserInitError {
        /// Description of the failure.
        message: String,
    },

    /// The parser returned no tree.
    #[error("failed to parse Python source: {message}")]
    ParseError {
        /// Description of the failure.
        message: String,
    },
}

impl SyntaxError {
    /// Creates a parser initialisation error.
    #[must_use]
    pub fn parser_init(message: impl Into<String>) -> Self {
        Self::ParserInitError {
            message: message.into(),
        }
    }

    /// Creates a parse error.
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::ParseError {
            message: message.into(),
        }
    }
}
