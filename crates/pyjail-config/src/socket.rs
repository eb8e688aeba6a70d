//! Listener endpoint configuration.

use std::fmt;
use std::fs::DirBuilder;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::{Host, Url};

/// Endpoint the daemon accepts submissions on.
///
/// Parsed from `tcp://host:port` or `unix:///absolute/path` on the command
/// line and in environment variables, or from a tagged table in TOML:
///
/// ```toml
/// listen = { transport = "unix", path = "/run/pyjail/pyjaild.sock" }
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "transport", rename_all = "snake_case")]
pub enum SocketEndpoint {
    /// Unix domain socket endpoint.
    Unix {
        /// Filesystem path of the socket.
        path: Utf8PathBuf,
    },
    /// TCP socket endpoint.
    Tcp {
        /// Host name or address to bind.
        host: String,
        /// Port to bind; zero picks an ephemeral port.
        port: u16,
    },
}

impl SocketEndpoint {
    /// Builds a Unix domain socket endpoint.
    #[must_use]
    pub fn unix(path: impl Into<Utf8PathBuf>) -> Self {
        Self::Unix { path: path.into() }
    }

    /// Builds a TCP socket endpoint.
    #[must_use]
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Returns the Unix socket path when the endpoint uses the Unix transport.
    #[must_use]
    pub fn unix_path(&self) -> Option<&Utf8Path> {
        match self {
            Self::Unix { path } => Some(path.as_ref()),
            Self::Tcp { .. } => None,
        }
    }

    /// Ensures a Unix socket's parent directory exists with owner-only
    /// permissions. TCP endpoints need no preparation.
    ///
    /// # Errors
    ///
    /// Returns [`SocketPreparationError`] when the path has no parent or the
    /// directory cannot be created.
    pub fn prepare_filesystem(&self) -> Result<(), SocketPreparationError> {
        let Some(path) = self.unix_path() else {
            return Ok(());
        };
        let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) else {
            return Err(SocketPreparationError::MissingParent {
                path: path.to_path_buf(),
            });
        };

        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }

        if let Err(source) = builder.create(parent.as_std_path())
            && source.kind() != std::io::ErrorKind::AlreadyExists
        {
            return Err(SocketPreparationError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            });
        }

        Ok(())
    }
}

impl fmt::Display for SocketEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix { path } => write!(formatter, "unix://{path}"),
            Self::Tcp { host, port } => write!(formatter, "tcp://{host}:{port}"),
        }
    }
}

impl FromStr for SocketEndpoint {
    type Err = SocketParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(input).map_err(|source| SocketParseError::Url {
            input: input.to_owned(),
            source,
        })?;
        let missing = |part| SocketParseError::Missing {
            input: input.to_owned(),
            part,
        };
        match url.scheme() {
            "tcp" => {
                let host = match url.host().ok_or_else(|| missing("host"))? {
                    Host::Domain(name) => name.to_owned(),
                    Host::Ipv4(addr) => addr.to_string(),
                    Host::Ipv6(addr) => addr.to_string(),
                };
                let port = url.port().ok_or_else(|| missing("port"))?;
                Ok(Self::tcp(host, port))
            }
            "unix" if url.has_host() => Err(SocketParseError::RelativeUnixPath {
                input: input.to_owned(),
            }),
            "unix" => match url.path() {
                "" | "/" => Err(missing("socket path")),
                path => Ok(Self::unix(path)),
            },
            other => Err(SocketParseError::Scheme {
                scheme: other.to_owned(),
            }),
        }
    }
}

/// Why a `listen` value could not be turned into a [`SocketEndpoint`].
#[derive(Debug, Error)]
pub enum SocketParseError {
    /// The value is not a URL at all.
    #[error("'{input}' is not an endpoint URL: {source}")]
    Url {
        /// Value as given.
        input: String,
        /// Parser failure.
        #[source]
        source: url::ParseError,
    },
    /// Only `tcp` and `unix` are served.
    #[error("unsupported transport '{scheme}'; use tcp:// or unix://")]
    Scheme {
        /// Scheme found in the value.
        scheme: String,
    },
    /// A required component is absent.
    #[error("'{input}' has no {part}")]
    Missing {
        /// Value as given.
        input: String,
        /// The absent component.
        part: &'static str,
    },
    /// `unix://name` puts `name` in the host position.
    #[error("'{input}' must use an absolute path, as in unix:///run/pyjaild.sock")]
    RelativeUnixPath {
        /// Value as given.
        input: String,
    },
}

/// Errors raised when preparing socket directories.
#[derive(Debug, Error)]
pub enum SocketPreparationError {
    /// Parent directory is missing when creating a Unix socket path.
    #[error("socket path '{path}' has no parent directory")]
    MissingParent {
        /// Socket path lacking a parent.
        path: Utf8PathBuf,
    },
    /// Failed to create or adjust socket directories.
    #[error("failed to create socket directory '{path}': {source}")]
    CreateDirectory {
        /// Directory that could not be created.
        path: Utf8PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },
}
