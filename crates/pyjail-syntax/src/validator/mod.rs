//! Static validation of submitted scripts.
//!
//! Checks run in a fixed order and the first failure wins: size, syntax,
//! entry point, function definition budget, then the denylist scan. Nothing
//! in the submitted text is ever executed.

mod entry_point;
mod forbidden;
mod policy;
mod verdict;

pub use forbidden::{ForbiddenConstruct, ForbiddenUse};
pub use policy::{Denylist, ValidationPolicy};
pub use verdict::{AcceptedScript, Rejection, RejectionReason, ValidationVerdict};

use crate::error::SyntaxError;
use crate::parser::{ParseResult, Parser};
use crate::walk::preorder;

const REPORTED_CONSTRUCTS: usize = 5;

/// Judges scripts against a [`ValidationPolicy`].
///
/// A validator is immutable and may be shared between threads; each call to
/// [`Validator::validate`] uses its own parser.
#[derive(Debug, Clone)]
pub struct Validator {
    policy: ValidationPolicy,
}

impl Validator {
    /// Creates a validator, checking that the Python grammar loads.
    ///
    /// # Errors
    ///
    /// Returns [`SyntaxError`] if the grammar is incompatible with the linked
    /// Tree-sitter runtime.
    pub fn new(policy: ValidationPolicy) -> Result<Self, SyntaxError> {
        Parser::new()?;
        Ok(Self { policy })
    }

    /// The policy this validator enforces.
    #[must_use]
    pub const fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// Validates `source`.
    #[must_use]
    pub fn validate(&self, source: &str) -> ValidationVerdict {
        self.check(source).into()
    }

    fn check(&self, source: &str) -> Result<AcceptedScript, Rejection> {
        self.check_size(source)?;
        let parsed = parse(source)?;
        if let Some(error) = parsed.first_error() {
            return Err(Rejection::new(RejectionReason::SyntaxError, error.to_string()));
        }
        entry_point::check_entry_point(parsed.root_node(), source)?;
        let function_definitions = self.check_definition_budget(&parsed)?;
        self.check_denylist(&parsed)?;
        Ok(AcceptedScript::new(source.to_owned(), function_definitions))
    }

    fn check_size(&self, source: &str) -> Result<(), Rejection> {
        let limit = self.policy.max_script_bytes();
        if source.len() > limit {
            return Err(Rejection::new(
                RejectionReason::TooLarge,
                format!(
                    "script is too large ({} bytes > {limit} bytes)",
                    source.len()
                ),
            ));
        }
        Ok(())
    }

    fn check_definition_budget(&self, parsed: &ParseResult) -> Result<usize, Rejection> {
        let count = preorder(parsed.root_node())
            .filter(|visit| visit.node.kind() == "function_definition")
            .count();
        let limit = self.policy.max_function_definitions();
        if count > limit {
            return Err(Rejection::new(
                RejectionReason::TooLarge,
                format!("too many function definitions ({count} > {limit})"),
            ));
        }
        Ok(count)
    }

    fn check_denylist(&self, parsed: &ParseResult) -> Result<(), Rejection> {
        let found = forbidden::find_forbidden(
            parsed.root_node(),
            parsed.source(),
            self.policy.denylist(),
        );
        if found.is_empty() {
            return Ok(());
        }

        let mut detail = found
            .iter()
            .take(REPORTED_CONSTRUCTS)
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        if let Some(remaining) = found.len().checked_sub(REPORTED_CONSTRUCTS).filter(|n| *n > 0) {
            detail.push_str(&format!(" (and {remaining} more)"));
        }
        Err(Rejection::new(
            RejectionReason::ForbiddenConstruct,
            format!("script uses forbidden constructs: {detail}"),
        ))
    }
}

fn parse(source: &str) -> Result<ParseResult, Rejection> {
    Parser::new()
        .and_then(|mut parser| parser.parse(source))
        .map_err(|error| {
            Rejection::new(
                RejectionReason::SyntaxError,
                format!("script could not be parsed: {error}"),
            )
        })
}
