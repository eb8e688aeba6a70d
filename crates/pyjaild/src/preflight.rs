//! Startup checks for the sandbox toolchain.
//!
//! The daemon refuses to start when it could not launch a single sandbox:
//! every run would otherwise fail with the same infrastructure error.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use nix::unistd::{AccessFlags, access};
use thiserror::Error;

use pyjail_config::Config;

/// A file the daemon needs before it can run scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prerequisite {
    /// The `pyjail-cage` binary.
    IsolationTool,
    /// The base profile handed to the isolation tool.
    IsolationProfile,
    /// The Python interpreter.
    Interpreter,
}

impl Prerequisite {
    /// Stable label for logs and error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IsolationTool => "isolation tool",
            Self::IsolationProfile => "isolation profile",
            Self::Interpreter => "interpreter",
        }
    }
}

/// Errors reported by [`check`].
#[derive(Debug, Error)]
pub enum PreflightError {
    /// A required file does not exist.
    #[error("{} '{path}' does not exist", prerequisite.as_str())]
    Missing {
        /// Which prerequisite is absent.
        prerequisite: Prerequisite,
        /// Configured path.
        path: Utf8PathBuf,
    },
    /// The isolation tool exists but cannot be executed by this process.
    #[error("isolation tool '{path}' is not executable: {source}")]
    NotExecutable {
        /// Configured path.
        path: Utf8PathBuf,
        /// Error reported by `access(2)`.
        #[source]
        source: nix::Error,
    },
    /// Nothing can be created under the scratch root.
    #[error("scratch root '{path}' is not writable: {source}")]
    ScratchNotWritable {
        /// Configured scratch root.
        path: Utf8PathBuf,
        /// Error raised while creating a trial directory.
        #[source]
        source: io::Error,
    },
}

/// Verifies the isolation tool, its profile, the interpreter, and the
/// scratch root.
///
/// # Errors
///
/// Returns the first [`PreflightError`] encountered.
pub fn check(config: &Config) -> Result<(), PreflightError> {
    require(Prerequisite::IsolationTool, config.isolation_tool())?;
    access(config.isolation_tool().as_std_path(), AccessFlags::X_OK).map_err(|source| {
        PreflightError::NotExecutable {
            path: config.isolation_tool().to_path_buf(),
            source,
        }
    })?;
    require(Prerequisite::IsolationProfile, config.isolation_profile())?;
    require(Prerequisite::Interpreter, config.interpreter())?;
    check_scratch_writable(config.scratch_root())
}

fn require(prerequisite: Prerequisite, path: &Utf8Path) -> Result<(), PreflightError> {
    if path.as_std_path().exists() {
        Ok(())
    } else {
        Err(PreflightError::Missing {
            prerequisite,
            path: path.to_path_buf(),
        })
    }
}

fn check_scratch_writable(root: &Utf8Path) -> Result<(), PreflightError> {
    tempfile::Builder::new()
        .prefix("pyjail-preflight-")
        .tempdir_in(root.as_std_path())
        .and_then(tempfile::TempDir::close)
        .map_err(|source| PreflightError::ScratchNotWritable {
            path: root.to_path_buf(),
            source,
        })
}
