//! Declarative sandbox policy.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::limits::{ResourceCeilings, RunAs};
use crate::runtime::linux_runtime_roots;

/// Environment inheritance strategy applied to sandboxed processes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EnvironmentPolicy {
    /// Remove all environment variables before launching the child.
    #[default]
    Isolated,
    /// Allow only the named environment variables to be inherited.
    AllowList(BTreeSet<String>),
    /// Inherit the full environment unchanged.
    InheritAll,
}

impl EnvironmentPolicy {
    fn with_allowed(self, key: String) -> Self {
        match self {
            Self::Isolated => Self::AllowList(BTreeSet::from([key])),
            Self::AllowList(mut keys) => {
                keys.insert(key);
                Self::AllowList(keys)
            }
            Self::InheritAll => Self::InheritAll,
        }
    }
}

/// Network access policy applied to sandboxed processes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum NetworkPolicy {
    /// Block networking by entering a separate network namespace.
    #[default]
    Deny,
    /// Permit networking in the sandboxed process.
    Allow,
}

impl NetworkPolicy {
    /// Returns true when networking is denied.
    #[must_use]
    pub const fn is_denied(self) -> bool {
        matches!(self, Self::Deny)
    }
}

/// What a sandboxed process may touch, and the limits it runs under.
///
/// Profiles start restrictive: no network, an empty environment, no
/// executables, and read access to the Linux runtime library roots only.
///
/// ```
/// use pyjail_sandbox::{ResourceCeilings, SandboxProfile};
///
/// let profile = SandboxProfile::new()
///     .allow_executable("/usr/bin/python3")
///     .allow_read_write_path("/tmp/pyjail-run")
///     .with_resource_ceilings(ResourceCeilings::new(5, 256 << 20, 16 << 20, 64));
/// assert!(profile.network_policy().is_denied());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxProfile {
    read_only_paths: Vec<PathBuf>,
    read_write_paths: Vec<PathBuf>,
    executable_paths: Vec<PathBuf>,
    environment: EnvironmentPolicy,
    network: NetworkPolicy,
    ceilings: Option<ResourceCeilings>,
    run_as: Option<RunAs>,
}

impl SandboxProfile {
    /// Creates a profile with Linux runtime library paths readable.
    #[must_use]
    pub fn new() -> Self {
        Self {
            read_only_paths: linux_runtime_roots(),
            read_write_paths: Vec::new(),
            executable_paths: Vec::new(),
            environment: EnvironmentPolicy::default(),
            network: NetworkPolicy::default(),
            ceilings: None,
            run_as: None,
        }
    }

    /// Grants execute and read access to the provided path.
    #[must_use]
    pub fn allow_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable_paths.push(path.into());
        self
    }

    /// Grants read-only access to the provided path.
    #[must_use]
    pub fn allow_read_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.read_only_paths.push(path.into());
        self
    }

    /// Grants read-write access to the provided path.
    #[must_use]
    pub fn allow_read_write_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.read_write_paths.push(path.into());
        self
    }

    /// Lets the named environment variable through. A no-op under
    /// [`EnvironmentPolicy::InheritAll`].
    #[must_use]
    pub fn allow_environment_variable(mut self, key: impl Into<String>) -> Self {
        self.environment = self.environment.with_allowed(key.into());
        self
    }

    /// Inherits all environment variables from the parent process.
    #[must_use]
    pub fn allow_full_environment(mut self) -> Self {
        self.environment = EnvironmentPolicy::InheritAll;
        self
    }

    /// Allows the sandboxed process to use the host network namespace.
    #[must_use]
    pub const fn allow_networking(mut self) -> Self {
        self.network = NetworkPolicy::Allow;
        self
    }

    /// Applies kernel resource ceilings before spawning.
    #[must_use]
    pub const fn with_resource_ceilings(mut self, ceilings: ResourceCeilings) -> Self {
        self.ceilings = Some(ceilings);
        self
    }

    /// Drops root privileges to `run_as` before spawning.
    #[must_use]
    pub const fn run_as(mut self, run_as: RunAs) -> Self {
        self.run_as = Some(run_as);
        self
    }

    /// Paths readable by the child.
    #[must_use]
    pub fn read_only_paths(&self) -> &[PathBuf] {
        &self.read_only_paths
    }

    /// Paths readable and writable by the child.
    #[must_use]
    pub fn read_write_paths(&self) -> &[PathBuf] {
        &self.read_write_paths
    }

    /// Programs the child may execute.
    #[must_use]
    pub fn executable_paths(&self) -> &[PathBuf] {
        &self.executable_paths
    }

    /// Returns whether `path` was whitelisted as an executable, before
    /// canonicalisation.
    #[must_use]
    pub fn allows_executable(&self, path: &Path) -> bool {
        self.executable_paths.iter().any(|allowed| allowed == path)
    }

    /// Returns the configured environment policy.
    #[must_use]
    pub const fn environment_policy(&self) -> &EnvironmentPolicy {
        &self.environment
    }

    /// Returns the network policy.
    #[must_use]
    pub const fn network_policy(&self) -> NetworkPolicy {
        self.network
    }

    /// Resource ceilings, if any.
    #[must_use]
    pub const fn resource_ceilings(&self) -> Option<&ResourceCeilings> {
        self.ceilings.as_ref()
    }

    /// Account the child runs as, if configured.
    #[must_use]
    pub const fn run_as_identity(&self) -> Option<RunAs> {
        self.run_as
    }
}

impl Default for SandboxProfile {
    fn default() -> Self {
        Self::new()
    }
}
