//! Turning raw sandbox output into the public response.
//!
//! The executor reports what it observed as an [`ExecutionOutcome`];
//! [`assemble`] interprets the exit state and the result-channel envelope
//! written by the harness. [`ExecutionResponse`] stores `stdout` next to a
//! `Result<Value, String>`, so a response always carries exactly one of a
//! result or an error.

use std::fmt;
use std::time::Duration;

use pyjail_config::Config;
use pyjail_syntax::Rejection;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::error::ExecutionError;

/// How the sandboxed process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitState {
    /// Exited with status zero.
    Completed,
    /// A wall-clock limit expired.
    TimedOut,
    /// Killed by a signal or cancelled.
    Killed,
    /// Exited with a nonzero status.
    CrashedNonZero,
}

impl ExitState {
    /// Name used in log events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::TimedOut => "timed_out",
            Self::Killed => "killed",
            Self::CrashedNonZero => "crashed_non_zero",
        }
    }
}

impl fmt::Display for ExitState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Everything the executor observed about one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// Terminal state.
    pub state: ExitState,
    /// Captured stdout, decoded lossily.
    pub stdout: String,
    /// Whether stdout exceeded the capture limit.
    pub stdout_truncated: bool,
    /// Contents of the result file, if any were written.
    pub result_channel: Option<String>,
    /// Exit code of the isolation tool.
    pub exit_code: Option<i32>,
    /// Signal that ended the run, if any.
    pub signal: Option<i32>,
    /// Captured stderr; logged, never returned to callers.
    pub stderr: String,
    /// Wall-clock limit the run was held to.
    pub wall_timeout_ms: u64,
    /// Time from spawn to exit.
    pub elapsed: Duration,
}

/// Bounds applied while interpreting the result channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserSettings {
    /// Characters of an exception summary returned to callers.
    pub error_summary_chars: usize,
    /// Largest result-channel payload interpreted.
    pub max_result_bytes: usize,
}

impl ParserSettings {
    /// Settings from configuration.
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self {
            error_summary_chars: config.error_summary_chars(),
            max_result_bytes: config.max_result_bytes(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum ResultEnvelope {
    Ok {
        value: Value,
    },
    NotSerializable {
        #[serde(rename = "type")]
        type_name: String,
    },
    Exception {
        summary: String,
    },
}

/// Response returned to the submitter.
///
/// Serialises as `{"result": ..., "stdout": "...", "error": ...}` with
/// exactly one of `result` and `error` non-null.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResponse {
    stdout: String,
    result: Result<Value, String>,
}

impl ExecutionResponse {
    /// A successful run. A `null` value is reported as
    /// [`ExecutionError::ReturnedNone`].
    #[must_use]
    pub fn succeeded(stdout: String, value: Value) -> Self {
        if value.is_null() {
            return Self::failed(stdout, &ExecutionError::ReturnedNone);
        }
        Self {
            stdout,
            result: Ok(value),
        }
    }

    /// A failed run.
    #[must_use]
    pub fn failed(stdout: String, error: &ExecutionError) -> Self {
        Self {
            stdout,
            result: Err(error.to_string()),
        }
    }

    /// A script refused by the validator; it never ran, so stdout is empty.
    #[must_use]
    pub fn rejected(rejection: &Rejection) -> Self {
        Self {
            stdout: String::new(),
            result: Err(rejection.detail().to_owned()),
        }
    }

    /// Everything the script printed.
    #[must_use]
    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    /// The value `main()` returned, on success.
    #[must_use]
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref().ok()
    }

    /// The error message, on failure.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.result.as_ref().err().map(String::as_str)
    }
}

impl Serialize for ExecutionResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ExecutionResponse", 3)?;
        state.serialize_field("result", &self.result())?;
        state.serialize_field("stdout", &self.stdout)?;
        state.serialize_field("error", &self.error())?;
        state.end()
    }
}

/// Interprets `outcome` into the public response.
#[must_use]
pub fn assemble(outcome: ExecutionOutcome, settings: &ParserSettings) -> ExecutionResponse {
    let ExecutionOutcome {
        state,
        stdout,
        result_channel,
        exit_code,
        signal,
        wall_timeout_ms,
        ..
    } = outcome;

    let error = match state {
        ExitState::TimedOut => ExecutionError::Timeout {
            limit_ms: wall_timeout_ms,
        },
        ExitState::Killed => ExecutionError::Killed {
            signal: signal.unwrap_or(SIGKILL),
        },
        ExitState::CrashedNonZero => ExecutionError::CrashedNonZero {
            code: exit_code.unwrap_or(-1),
        },
        ExitState::Completed => {
            match parse_envelope(result_channel.as_deref(), settings) {
                Some(ResultEnvelope::Ok { value }) => {
                    return ExecutionResponse::succeeded(stdout, value);
                }
                Some(ResultEnvelope::NotSerializable { type_name }) => {
                    ExecutionError::NonJsonReturn {
                        type_name: bounded(&type_name, settings.error_summary_chars),
                    }
                }
                Some(ResultEnvelope::Exception { summary }) => {
                    ExecutionError::UnhandledException {
                        summary: bounded(&summary, settings.error_summary_chars),
                    }
                }
                None => ExecutionError::MissingResult {
                    code: exit_code.unwrap_or(0),
                },
            }
        }
    };
    ExecutionResponse::failed(stdout, &error)
}

const SIGKILL: i32 = 9;

fn parse_envelope(channel: Option<&str>, settings: &ParserSettings) -> Option<ResultEnvelope> {
    let text = channel?.trim();
    if text.is_empty() || text.len() > settings.max_result_bytes {
        return None;
    }
    serde_json::from_str(text).ok()
}

fn bounded(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
