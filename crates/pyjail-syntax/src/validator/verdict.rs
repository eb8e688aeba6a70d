//! Outcomes of validating a script.

use std::fmt;

/// Why a script was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionReason {
    /// The script exceeds the size limit or the function definition budget.
    TooLarge,
    /// The script does not parse as Python.
    SyntaxError,
    /// No usable top-level `main()` was found.
    MissingMain,
    /// The script uses a denied module, builtin, or attribute.
    ForbiddenConstruct,
}

impl RejectionReason {
    /// Stable snake-case label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TooLarge => "too_large",
            Self::SyntaxError => "syntax_error",
            Self::MissingMain => "missing_main",
            Self::ForbiddenConstruct => "forbidden_construct",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// A refused script: the reason plus a message fit for the submitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    reason: RejectionReason,
    detail: String,
}

impl Rejection {
    /// Creates a rejection.
    #[must_use]
    pub fn new(reason: RejectionReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }

    /// Category of the rejection.
    #[must_use]
    pub const fn reason(&self) -> RejectionReason {
        self.reason
    }

    /// Message returned to the submitter.
    #[must_use]
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.detail)
    }
}

/// A script that passed every check.
///
/// Only [`crate::Validator`] constructs this type, so holding one proves the
/// text was validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedScript {
    source: String,
    function_definitions: usize,
}

impl AcceptedScript {
    pub(crate) const fn new(source: String, function_definitions: usize) -> Self {
        Self {
            source,
            function_definitions,
        }
    }

    /// The validated script text, unchanged.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Consumes the script, returning its text.
    #[must_use]
    pub fn into_source(self) -> String {
        self.source
    }

    /// Number of function definitions in the script.
    #[must_use]
    pub const fn function_definitions(&self) -> usize {
        self.function_definitions
    }

    /// Size of the script in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.source.len()
    }

    /// Returns whether the script text is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }
}

/// Verdict of [`crate::Validator::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationVerdict {
    /// The script may be executed.
    Accepted(AcceptedScript),
    /// The script must not be executed.
    Rejected(Rejection),
}

impl ValidationVerdict {
    /// Returns whether the script was accepted.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }

    /// Converts the verdict into a `Result`.
    ///
    /// # Errors
    ///
    /// Returns the [`Rejection`] for refused scripts.
    pub fn into_result(self) -> Result<AcceptedScript, Rejection> {
        match self {
            Self::Accepted(script) => Ok(script),
            Self::Rejected(rejection) => Err(rejection),
        }
    }

    /// The rejection, if the script was refused.
    #[must_use]
    pub const fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Accepted(_) => None,
            Self::Rejected(rejection) => Some(rejection),
        }
    }
}

impl From<Result<AcceptedScript, Rejection>> for ValidationVerdict {
    fn from(result: Result<AcceptedScript, Rejection>) -> Self {
        match result {
            Ok(script) => Self::Accepted(script),
            Err(rejection) => Self::Rejected(rejection),
        }
    }
}
