//! Error types for request dispatch failures.

use std::io;

use thiserror::Error;

/// Errors surfaced while reading or answering a request.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Request line could not be parsed as a request.
    #[error("malformed request: {message}")]
    MalformedRequest {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Request exceeds the maximum allowed size.
    #[error("request too large: more than {max_size} bytes")]
    RequestTooLarge { max_size: usize },

    /// IO error during read or write.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Response serialisation failed.
    #[error("failed to serialise response: {0}")]
    SerializeResponse(#[source] serde_json::Error),
}

impl DispatchError {
    /// Whether the client is at fault and should be told so.
    pub(crate) const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedRequest { .. } | Self::RequestTooLarge { .. }
        )
    }

    pub(crate) fn from_json_error(source: serde_json::Error) -> Self {
        Self::MalformedRequest {
            message: source.to_string(),
            source: Some(source),
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedRequest {
            message: message.into(),
            source: None,
        }
    }
}
