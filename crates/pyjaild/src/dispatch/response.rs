//! Response messages and their JSONL framing.

use std::io::Write;

use serde::Serialize;

use pyjail_runner::{ExecutionResponse, InfrastructureError, SlotPool};

use super::errors::DispatchError;

/// The single line written back on a connection.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum DaemonMessage {
    /// Outcome of a script: `result`, `stdout`, and `error`.
    Response(ExecutionResponse),
    /// Liveness report.
    Health {
        ok: bool,
        capacity: usize,
        available_slots: usize,
    },
    /// The script could not be run at all.
    Unavailable {
        reason: &'static str,
        fatal: bool,
        message: String,
    },
    /// The request line was not understood.
    BadRequest { message: String },
}

impl DaemonMessage {
    pub(crate) fn health(pool: &SlotPool) -> Self {
        Self::Health {
            ok: true,
            capacity: pool.capacity(),
            available_slots: pool.available(),
        }
    }

    pub(crate) fn unavailable(error: &InfrastructureError) -> Self {
        Self::Unavailable {
            reason: error.reason(),
            fatal: error.is_fatal(),
            message: error.to_string(),
        }
    }

    pub(crate) fn bad_request(error: &DispatchError) -> Self {
        Self::BadRequest {
            message: error.to_string(),
        }
    }
}

/// Writes [`DaemonMessage`]s as JSON lines.
pub(crate) struct ResponseWriter<W> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    pub(crate) const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Serialises `message`, appends the newline, and flushes.
    pub(crate) fn write_message(&mut self, message: &DaemonMessage) -> Result<(), DispatchError> {
        let mut line = serde_json::to_vec(message).map_err(DispatchError::SerializeResponse)?;
        line.push(b'\n');
        self.writer.write_all(&line)?;
        self.writer.flush()?;
        Ok(())
    }
}
