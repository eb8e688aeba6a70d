//! Kernel resource ceilings and privilege dropping.
//!
//! Both are applied to the launching process immediately before the sandbox
//! spawns its child, which inherits them. Hard and soft limits are set to the
//! same value so the child cannot raise them again.

use nix::sys::resource::{Resource, setrlimit};
use nix::unistd::{Gid, Uid, setgid, setgroups, setuid};

use crate::error::SandboxError;

/// One `setrlimit` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLimit {
    /// Limited resource.
    pub resource: Resource,
    /// Soft and hard limit.
    pub value: u64,
}

/// Per-process ceilings enforced by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceCeilings {
    cpu_seconds: u64,
    address_space_bytes: u64,
    file_size_bytes: u64,
    open_files: u64,
    processes: Option<u64>,
}

impl ResourceCeilings {
    /// Creates ceilings for CPU time, address space, written file size, and
    /// open descriptors. Core dumps are always disabled.
    #[must_use]
    pub const fn new(
        cpu_seconds: u64,
        address_space_bytes: u64,
        file_size_bytes: u64,
        open_files: u64,
    ) -> Self {
        Self {
            cpu_seconds,
            address_space_bytes,
            file_size_bytes,
            open_files,
            processes: None,
        }
    }

    /// Caps the number of processes owned by the running user.
    ///
    /// `RLIMIT_NPROC` counts every process of the real user id, so only set
    /// this when sandboxed runs use a dedicated account.
    #[must_use]
    pub const fn with_process_limit(mut self, processes: Option<u64>) -> Self {
        self.processes = processes;
        self
    }

    /// CPU seconds before the kernel sends `SIGXCPU`/`SIGKILL`.
    #[must_use]
    pub const fn cpu_seconds(&self) -> u64 {
        self.cpu_seconds
    }

    /// Address space ceiling.
    #[must_use]
    pub const fn address_space_bytes(&self) -> u64 {
        self.address_space_bytes
    }

    /// The `setrlimit` calls these ceilings translate to, in application
    /// order.
    #[must_use]
    pub fn limits(&self) -> Vec<ResourceLimit> {
        let mut limits = vec![
            ResourceLimit {
                resource: Resource::RLIMIT_CORE,
                value: 0,
            },
            ResourceLimit {
                resource: Resource::RLIMIT_CPU,
                value: self.cpu_seconds,
            },
            ResourceLimit {
                resource: Resource::RLIMIT_AS,
                value: self.address_space_bytes,
            },
            ResourceLimit {
                resource: Resource::RLIMIT_FSIZE,
                value: self.file_size_bytes,
            },
            ResourceLimit {
                resource: Resource::RLIMIT_NOFILE,
                value: self.open_files,
            },
        ];
        if let Some(processes) = self.processes {
            limits.push(ResourceLimit {
                resource: Resource::RLIMIT_NPROC,
                value: processes,
            });
        }
        limits
    }

    /// Applies every ceiling to the current process.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::ResourceLimit`] naming the first resource the
    /// kernel refused to limit.
    pub fn apply(&self) -> Result<(), SandboxError> {
        for limit in self.limits() {
            setrlimit(limit.resource, limit.value, limit.value).map_err(|source| {
                SandboxError::ResourceLimit {
                    resource: limit.resource,
                    value: limit.value,
                    source,
                }
            })?;
        }
        Ok(())
    }
}

/// Whether [`RunAs::apply`] switched identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegeChange {
    /// The process dropped root privileges to the configured ids.
    Dropped,
    /// The process was not running as root and kept its identity.
    Unchanged,
}

/// Unprivileged account the sandboxed process runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunAs {
    /// Target user id.
    pub uid: u32,
    /// Target group id.
    pub gid: u32,
}

impl RunAs {
    /// Drops root privileges to this account. Unprivileged callers are left
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::PrivilegeDrop`] if any identity change fails
    /// or root privileges remain afterwards.
    pub fn apply(&self) -> Result<PrivilegeChange, SandboxError> {
        if !Uid::effective().is_root() {
            return Ok(PrivilegeChange::Unchanged);
        }
        let gid = Gid::from_raw(self.gid);
        let uid = Uid::from_raw(self.uid);
        let failed = |step: &'static str| {
            move |source: nix::Error| SandboxError::PrivilegeDrop {
                step,
                uid: self.uid,
                gid: self.gid,
                source,
            }
        };

        setgroups(&[gid]).map_err(failed("setgroups"))?;
        setgid(gid).map_err(failed("setgid"))?;
        setuid(uid).map_err(failed("setuid"))?;

        if self.uid != 0 && (Uid::effective().is_root() || Uid::current().is_root()) {
            return Err(SandboxError::PrivilegeDrop {
                step: "verify",
                uid: self.uid,
                gid: self.gid,
                source: nix::errno::Errno::EPERM,
            });
        }
        Ok(PrivilegeChange::Dropped)
    }
}
