//! Operator-maintained base profile.

use std::fs;
use std::path::{Path, PathBuf};

use pyjail_sandbox::RunAs;
use serde::Deserialize;

use crate::error::CageError;

/// Deployment-wide additions to every sandbox.
///
/// ```toml
/// read_only_paths = ["/dev/null", "/dev/urandom"]
/// environment = ["LANG"]
/// run_as_uid = 65534
/// run_as_gid = 65534
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BaseProfile {
    /// Extra paths the child may read.
    #[serde(default)]
    pub read_only_paths: Vec<PathBuf>,
    /// Environment variables passed through to the child.
    #[serde(default)]
    pub environment: Vec<String>,
    /// Account to switch to when started as root.
    pub run_as_uid: Option<u32>,
    /// Group to switch to; defaults to `run_as_uid`.
    pub run_as_gid: Option<u32>,
}

impl BaseProfile {
    /// Reads and parses the profile at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CageError`] when the file is unreadable or not a valid
    /// profile.
    pub fn load(path: &Path) -> Result<Self, CageError> {
        let text = fs::read_to_string(path).map_err(|source| CageError::ProfileRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| CageError::ProfileFormat {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Identity the child runs as, if configured.
    #[must_use]
    pub fn run_as(&self) -> Option<RunAs> {
        self.run_as_uid.map(|uid| RunAs {
            uid,
            gid: self.run_as_gid.unwrap_or(uid),
        })
    }
}
