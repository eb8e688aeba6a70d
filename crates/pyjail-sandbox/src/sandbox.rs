//! Spawning commands under a [`SandboxProfile`] with `birdcage`.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use birdcage::process::{Child, Command, Output};
use birdcage::{Birdcage, Exception, Sandbox as BirdcageSandbox};

use crate::env_guard::EnvGuard;
use crate::error::SandboxError;
use crate::profile::{EnvironmentPolicy, SandboxProfile};
use crate::runtime::thread_count;

/// Builder for sandboxed commands.
pub type SandboxCommand = Command;
/// Handle to a running sandboxed process.
pub type SandboxChild = Child;
/// Captured output from a sandboxed process.
pub type SandboxOutput = Output;

/// Launches commands inside a restrictive sandbox.
#[derive(Debug)]
pub struct Sandbox {
    profile: SandboxProfile,
}

impl Sandbox {
    /// Creates a sandbox with the supplied profile.
    #[must_use]
    pub const fn new(profile: SandboxProfile) -> Self {
        Self { profile }
    }

    /// The profile this sandbox enforces.
    #[must_use]
    pub const fn profile(&self) -> &SandboxProfile {
        &self.profile
    }

    /// Spawns `command` inside the sandbox.
    ///
    /// Preparation happens in a fixed order: the program is resolved and
    /// checked against the profile, every whitelisted path is canonicalised,
    /// privileges are dropped, resource ceilings are applied to the calling
    /// process, and only then does `birdcage` activate and spawn.
    ///
    /// The ceilings and identity change persist in the caller, so this is
    /// meant for a dedicated launcher process.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError`] if the program is relative, missing, or not
    /// whitelisted, if the process has more than one thread, if any
    /// whitelisted path is missing, or if privilege, limit, or namespace
    /// setup fails.
    pub fn spawn(&self, command: SandboxCommand) -> Result<SandboxChild, SandboxError> {
        let program = canonical_program(Path::new(command.get_program()))?;
        self.ensure_program_whitelisted(&program)?;
        ensure_single_threaded()?;

        let exceptions = self.collect_exceptions(&program)?;

        if let Some(run_as) = self.profile.run_as_identity() {
            run_as.apply()?;
        }
        if let Some(ceilings) = self.profile.resource_ceilings() {
            ceilings.apply()?;
        }

        let env_guard = EnvGuard::capture();
        let mut sandbox = Birdcage::new();
        for exception in exceptions {
            sandbox.add_exception(exception)?;
        }
        let child = sandbox.spawn(command)?;
        drop(env_guard);
        Ok(child)
    }

    fn ensure_program_whitelisted(&self, program: &Path) -> Result<(), SandboxError> {
        let authorised = canonicalised_set(self.profile.executable_paths())?;
        if authorised.contains(program) {
            return Ok(());
        }
        Err(SandboxError::ExecutableNotAuthorised {
            program: program.to_path_buf(),
        })
    }

    fn collect_exceptions(&self, program: &Path) -> Result<Vec<Exception>, SandboxError> {
        let mut exceptions: Vec<Exception> = Vec::new();
        exceptions.extend(
            canonicalised_set(self.profile.read_only_paths())?
                .into_iter()
                .map(Exception::Read),
        );
        exceptions.extend(
            canonicalised_set(self.profile.read_write_paths())?
                .into_iter()
                .map(Exception::WriteAndRead),
        );
        let mut executables = canonicalised_set(self.profile.executable_paths())?;
        executables.insert(program.to_path_buf());
        exceptions.extend(executables.into_iter().map(Exception::ExecuteAndRead));

        match self.profile.environment_policy() {
            EnvironmentPolicy::Isolated => {}
            EnvironmentPolicy::AllowList(keys) => {
                exceptions.extend(keys.iter().cloned().map(Exception::Environment));
            }
            EnvironmentPolicy::InheritAll => exceptions.push(Exception::FullEnvironment),
        }

        if !self.profile.network_policy().is_denied() {
            exceptions.push(Exception::Networking);
        }

        Ok(exceptions)
    }
}

fn ensure_single_threaded() -> Result<(), SandboxError> {
    let threads =
        thread_count().map_err(|source| SandboxError::ThreadCountUnavailable { source })?;
    if threads > 1 {
        return Err(SandboxError::MultiThreaded {
            thread_count: threads,
        });
    }
    Ok(())
}

fn canonical_program(program: &Path) -> Result<PathBuf, SandboxError> {
    if !program.is_absolute() {
        return Err(SandboxError::ProgramNotAbsolute(program.to_path_buf()));
    }
    canonicalise(program)
}

fn canonicalised_set(paths: &[PathBuf]) -> Result<BTreeSet<PathBuf>, SandboxError> {
    paths.iter().map(|path| canonicalise(path)).collect()
}

fn canonicalise(path: &Path) -> Result<PathBuf, SandboxError> {
    if !path.exists() {
        return Err(SandboxError::MissingPath {
            path: path.to_path_buf(),
        });
    }
    fs::canonicalize(path).map_err(|source| SandboxError::CanonicalisationFailed {
        path: path.to_path_buf(),
        source,
    })
}
