//! Failure taxonomy for script execution.
//!
//! [`ExecutionError`] describes what went wrong with one script and is
//! always reported through the response's `error` field.
//! [`InfrastructureError`] means the service could not run the script at
//! all; the daemon reports it as `unavailable` instead. I/O errors are wrapped
//! in `Arc` to satisfy the `result_large_err` Clippy lint.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Per-script failures, rendered with bounded summaries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// The wall-clock limit expired.
    #[error("execution timed out after {limit_ms} ms")]
    Timeout {
        /// Configured wall-clock limit.
        limit_ms: u64,
    },

    /// The process was killed by a signal or cancelled.
    #[error("execution failed: process was killed by signal {signal}")]
    Killed {
        /// Signal number.
        signal: i32,
    },

    /// The process exited with a nonzero status.
    #[error("execution failed: process exited with code {code}")]
    CrashedNonZero {
        /// Exit code.
        code: i32,
    },

    /// The process exited cleanly but left no usable result.
    #[error("execution failed: no result was produced (exit code {code})")]
    MissingResult {
        /// Exit code.
        code: i32,
    },

    /// `main()` returned a value `json.dumps` refused.
    #[error("returned value is not valid JSON: {type_name} is not JSON serializable")]
    NonJsonReturn {
        /// Python type name of the offending value.
        type_name: String,
    },

    /// `main()` returned `None`.
    #[error("main() returned None; return a JSON-serialisable value")]
    ReturnedNone,

    /// `main()` raised.
    #[error("unhandled exception: {summary}")]
    UnhandledException {
        /// `<Type>: <message>`, truncated.
        summary: String,
    },
}

/// Failures that prevent a script from running.
#[derive(Debug, Clone, Error)]
pub enum InfrastructureError {
    /// The isolation tool could not be started.
    #[error("isolation tool {tool} could not be started: {source}")]
    IsolationUnavailable {
        /// Configured tool path.
        tool: PathBuf,
        /// Spawn error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The isolation tool reported a setup failure or left no verdict.
    #[error("isolation tool failed to prepare the sandbox: {diagnostic}")]
    IsolationMisconfigured {
        /// The tool's reason, or the last line it wrote to stderr.
        diagnostic: String,
    },

    /// The per-run scratch directory could not be prepared or read.
    #[error("scratch I/O failed at {path}: {source}")]
    ScratchIo {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// No sandbox slot became free in time.
    #[error("no sandbox slot became free within {waited_ms} ms")]
    CapacityExceeded {
        /// Time spent waiting.
        waited_ms: u64,
    },
}

impl InfrastructureError {
    pub(crate) fn scratch_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ScratchIo {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    /// Whether the service cannot serve any request until an operator acts.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::CapacityExceeded { .. })
    }

    /// Stable machine-readable reason used on the wire.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::IsolationUnavailable { .. } => "isolation_unavailable",
            Self::IsolationMisconfigured { .. } => "isolation_misconfigured",
            Self::ScratchIo { .. } => "scratch_io",
            Self::CapacityExceeded { .. } => "capacity_exceeded",
        }
    }
}
