//! Errors raised while preparing or launching a sandboxed process.

use std::io;
use std::path::PathBuf;

use birdcage::error::Error as BirdcageError;
use nix::sys::resource::Resource;
use thiserror::Error;

/// Errors raised while preparing or launching a sandboxed process.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// The supplied program path was not absolute.
    #[error("sandboxed commands require absolute program paths, got {0}")]
    ProgramNotAbsolute(PathBuf),

    /// The program was not whitelisted in the profile.
    #[error("executable {program} is not authorised by the sandbox profile")]
    ExecutableNotAuthorised {
        /// Canonical program path.
        program: PathBuf,
    },

    /// A whitelisted path does not exist.
    #[error("path {path} does not exist on the host filesystem")]
    MissingPath {
        /// Path named by the profile.
        path: PathBuf,
    },

    /// Canonicalisation of a path failed.
    #[error("failed to canonicalise {path}: {source}")]
    CanonicalisationFailed {
        /// Path named by the profile.
        path: PathBuf,
        /// Underlying filesystem error.
        source: io::Error,
    },

    /// The current process hosts more than one thread.
    #[error("sandboxing must occur in a single-threaded context (observed {thread_count} threads)")]
    MultiThreaded {
        /// Threads observed in `/proc/self/status`.
        thread_count: usize,
    },

    /// Thread count could not be determined from `/proc`.
    #[error("failed to determine thread count: {source}")]
    ThreadCountUnavailable {
        /// Underlying read or parse error.
        source: io::Error,
    },

    /// The kernel refused a resource ceiling.
    #[error("failed to limit {resource:?} to {value}: {source}")]
    ResourceLimit {
        /// Resource being limited.
        resource: Resource,
        /// Requested soft and hard limit.
        value: u64,
        /// Errno from `setrlimit`.
        source: nix::Error,
    },

    /// Switching to the unprivileged account failed.
    #[error("failed to drop privileges to {uid}:{gid} during {step}: {source}")]
    PrivilegeDrop {
        /// Call that failed.
        step: &'static str,
        /// Target user id.
        uid: u32,
        /// Target group id.
        gid: u32,
        /// Errno from the failing call.
        source: nix::Error,
    },

    /// The underlying sandbox library rejected activation.
    #[error("birdcage activation failed: {0}")]
    Activation(#[from] BirdcageError),
}
