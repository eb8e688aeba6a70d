//! Setup failures; every one of them is recorded as
//! [`crate::CageVerdict::SetupFailed`].

use std::io;
use std::path::PathBuf;

use nix::errno::Errno;
use pyjail_sandbox::SandboxError;
use thiserror::Error;

/// Reasons the cage could not start or supervise its child.
#[derive(Debug, Error)]
pub enum CageError {
    /// The base profile could not be read.
    #[error("failed to read profile {path}: {source}")]
    ProfileRead {
        /// Profile path.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// The base profile is not valid TOML or has unknown keys.
    #[error("invalid profile {path}: {source}")]
    ProfileFormat {
        /// Profile path.
        path: PathBuf,
        /// Parse error.
        source: toml::de::Error,
    },

    /// The scratch directory is missing or not a directory.
    #[error("scratch directory {0} is not a directory")]
    ScratchMissing(PathBuf),

    /// The status file lies inside the scratch directory, where the child
    /// could forge it.
    #[error("status file {0} must not lie inside the scratch directory")]
    StatusFileInScratch(PathBuf),

    /// No command followed `--`.
    #[error("no command given")]
    MissingCommand,

    /// The program to run could not be resolved.
    #[error("program {path} is unusable: {source}")]
    Program {
        /// Program as given on the command line.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// The start-up handshake pipe could not be created.
    #[error("failed to create the start-up channel: {0}")]
    ReadyChannel(#[source] Errno),

    /// Sandbox preparation or spawn failed.
    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    /// Waiting on or killing the child failed.
    #[error("failed to supervise child: {0}")]
    Supervise(#[source] io::Error),
}
