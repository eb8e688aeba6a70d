//! Tree-sitter powered static validation of untrusted Python scripts.
//!
//! The [`Validator`] decides whether a submitted script may run at all. It
//! parses the text with the Python grammar and applies, in order:
//!
//! - a byte-size limit,
//! - a syntax check (no ERROR or MISSING nodes),
//! - an entry-point check for a top-level `main()` callable without
//!   arguments,
//! - a function definition budget,
//! - a denylist scan for imports, builtins, and attributes.
//!
//! Accepted scripts come back as [`AcceptedScript`], the only input the
//! execution pipeline will take.
//!
//! ```
//! use pyjail_syntax::{RejectionReason, ValidationPolicy, ValidationVerdict, Validator};
//!
//! let validator = Validator::new(ValidationPolicy::default())?;
//!
//! let verdict = validator.validate("def main():\n    return {'ok': True}\n");
//! assert!(verdict.is_accepted());
//!
//! let verdict = validator.validate("import subprocess\ndef main():\n    return 1\n");
//! let ValidationVerdict::Rejected(rejection) = verdict else { panic!("accepted") };
//! assert_eq!(rejection.reason(), RejectionReason::ForbiddenConstruct);
//! # Ok::<(), pyjail_syntax::SyntaxError>(())
//! ```

mod error;
mod parser;
mod position;
mod validator;
mod walk;

pub use error::SyntaxError;
pub use parser::{ParseResult, Parser, SyntaxErrorInfo};
pub use position::Location;
pub use validator::{
    AcceptedScript, Denylist, ForbiddenConstruct, ForbiddenUse, Rejection, RejectionReason,
    ValidationPolicy, ValidationVerdict, Validator,
};

#[cfg(test)]
mod tests;
