//! Request framing and deserialisation.

use std::io::{self, Read};

use serde::Deserialize;

use pyjail_config::Config;
use pyjail_runner::LimitOverrides;

use super::errors::DispatchError;

/// Room for the JSON envelope around the script text.
const REQUEST_OVERHEAD_BYTES: usize = 64 * 1024;

/// Worst-case growth of one script byte once JSON-escaped.
const MAX_ESCAPE_EXPANSION: usize = 6;

/// Largest request line accepted for `config`.
///
/// JSON escapes a control character as `\u00XX`, six bytes for one, so the
/// limit is six times the script limit plus the envelope. Scripts between the
/// two limits reach the validator and are rejected there as too large.
#[must_use]
pub(crate) const fn request_limit(config: &Config) -> usize {
    config
        .max_script_bytes()
        .saturating_mul(MAX_ESCAPE_EXPANSION)
        .saturating_add(REQUEST_OVERHEAD_BYTES)
}

/// A parsed client request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub(crate) enum DaemonRequest {
    /// Validate and run a script.
    Execute {
        script: String,
        #[serde(default)]
        limits: Option<LimitOverrides>,
    },
    /// Report liveness and slot usage.
    Health,
}

impl DaemonRequest {
    /// Parses one request line. Trailing whitespace, including the newline,
    /// is ignored.
    pub(crate) fn parse(line: &[u8]) -> Result<Self, DispatchError> {
        let trimmed = line.trim_ascii_end();
        if trimmed.is_empty() {
            return Err(DispatchError::malformed("empty request line"));
        }
        serde_json::from_slice(trimmed).map_err(DispatchError::from_json_error)
    }
}

/// Reads one newline-terminated request of at most `limit` bytes.
///
/// Returns `Ok(None)` if the client disconnects without sending anything.
/// A final line without a newline is accepted at end of stream. Bytes after
/// the first newline are discarded.
pub(crate) fn read_request_line<R: Read>(
    stream: &mut R,
    limit: usize,
) -> Result<Option<Vec<u8>>, DispatchError> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 8 * 1024];

    loop {
        let read = read_with_retry(stream, &mut chunk)?;
        let Some(received) = chunk.get(..read).filter(|bytes| !bytes.is_empty()) else {
            return Ok((!buffer.is_empty()).then_some(buffer));
        };

        let newline = received.iter().position(|byte| *byte == b'\n');
        let line_part = newline.map_or(received, |position| {
            received.get(..=position).unwrap_or(received)
        });
        buffer.extend_from_slice(line_part);
        if buffer.len() > limit {
            return Err(DispatchError::RequestTooLarge { max_size: limit });
        }
        if newline.is_some() {
            return Ok(Some(buffer));
        }
    }
}

fn read_with_retry<R: Read>(stream: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match stream.read(buf) {
            Ok(read) => return Ok(read),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(error),
        }
    }
}
