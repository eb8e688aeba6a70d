//! Failures raised while binding or supervising the daemon socket.

use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;

use pyjail_config::SocketEndpoint;

/// Errors surfaced while binding or running the socket listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The TCP host did not resolve to a usable address.
    #[error("cannot resolve {host}:{port}")]
    Resolve {
        /// Host as configured.
        host: String,
        /// Port as configured.
        port: u16,
        /// Resolver failure, absent when the lookup simply came back empty.
        #[source]
        source: Option<io::Error>,
    },
    /// The socket could not be bound.
    #[error("cannot bind {endpoint}: {source}")]
    Bind {
        /// Endpoint being bound.
        endpoint: SocketEndpoint,
        /// Underlying bind failure.
        #[source]
        source: io::Error,
    },
    /// The bound socket could not be switched to non-blocking accepts.
    #[error("cannot configure listener on {endpoint}: {source}")]
    Configure {
        /// Endpoint that was bound.
        endpoint: SocketEndpoint,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
    /// Another process still answers on the socket path.
    #[error("{path} is already served by another process")]
    SocketInUse {
        /// Socket path.
        path: Utf8PathBuf,
    },
    /// The socket path is occupied by something other than a socket.
    #[error("{path} exists and is not a socket")]
    NotASocket {
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// A leftover socket file could not be inspected or removed.
    #[error("cannot reclaim stale socket {path}: {source}")]
    StaleSocket {
        /// Socket path.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
    /// The accept thread could not be started.
    #[error("cannot start the accept thread: {source}")]
    Spawn {
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
    /// The accept thread panicked.
    #[error("listener thread panicked")]
    ThreadPanic,
}
