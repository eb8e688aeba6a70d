//! Process isolation for untrusted script runs.
//!
//! `pyjail-sandbox` wraps [`birdcage`] with the policy the execution service
//! needs. A [`SandboxProfile`] lists the paths, executables, and environment
//! variables a child may use, together with kernel [`ResourceCeilings`] and
//! an optional unprivileged [`RunAs`] identity. [`Sandbox::spawn`] applies all
//! of it and launches the child inside fresh namespaces with a `seccomp-bpf`
//! filter.
//!
//! Defaults are restrictive:
//! - networking is disabled unless explicitly enabled,
//! - environment variables are stripped unless whitelisted,
//! - executables must be whitelisted and given as absolute paths,
//! - only the Linux runtime library roots are readable.
//!
//! ```rust,no_run
//! use pyjail_sandbox::{ResourceCeilings, Sandbox, SandboxCommand, SandboxProfile};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let profile = SandboxProfile::new()
//!     .allow_executable("/usr/bin/python3")
//!     .allow_read_write_path("/tmp/pyjail-run")
//!     .with_resource_ceilings(ResourceCeilings::new(5, 256 << 20, 16 << 20, 64));
//!
//! let mut command = SandboxCommand::new("/usr/bin/python3");
//! command.arg("-I").arg("/tmp/pyjail-run/harness.py");
//!
//! let mut child = Sandbox::new(profile).spawn(command)?;
//! let status = child.wait()?;
//! # let _ = status;
//! # Ok(()) }
//! ```
//!
//! [`Sandbox::spawn`] must run in a single-threaded process; otherwise it
//! returns [`SandboxError::MultiThreaded`] instead of tripping the assertion
//! inside `birdcage`.

mod env_guard;
mod error;
mod limits;
mod profile;
mod runtime;
mod sandbox;

pub use birdcage::process;
pub use error::SandboxError;
pub use limits::{PrivilegeChange, ResourceCeilings, ResourceLimit, RunAs};
pub use nix::sys::resource::Resource;
pub use profile::{EnvironmentPolicy, NetworkPolicy, SandboxProfile};
pub use runtime::{linux_runtime_roots, thread_count};
pub use sandbox::{Sandbox, SandboxChild, SandboxCommand, SandboxOutput};

#[cfg(test)]
mod tests;
