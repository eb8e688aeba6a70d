//! Declarative isolation profile rendered for the `pyjail-cage` tool.

use std::ffi::OsString;
use std::path::Path;

use pyjail_cage::CageArgs;

use crate::executor::ExecutorSettings;
use crate::request::ExecutionRequest;

/// Everything the isolation tool needs for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsolationProfile {
    args: CageArgs,
}

impl IsolationProfile {
    /// Builds the profile for `request` laid out in `scratch`, with the
    /// tool's verdict going to `status_file`.
    #[must_use]
    pub fn for_request(
        settings: &ExecutorSettings,
        request: &ExecutionRequest,
        scratch: &Path,
        status_file: &Path,
    ) -> Self {
        let limits = request.limits();
        let mut command = vec![settings.interpreter.clone().into_os_string()];
        command.extend(request.payload().interpreter_args(scratch));
        Self {
            args: CageArgs {
                profile: settings.isolation_profile.clone(),
                scratch: scratch.to_path_buf(),
                status_file: status_file.to_path_buf(),
                cpu_seconds: limits.cpu_seconds,
                memory_bytes: limits.memory_bytes,
                file_size_bytes: limits.file_size_bytes,
                open_files: limits.open_files,
                max_processes: limits.max_processes,
                wall_timeout_ms: limits.wall_timeout_ms,
                command,
            },
        }
    }

    /// Structured view of the tool arguments.
    #[must_use]
    pub const fn args(&self) -> &CageArgs {
        &self.args
    }

    /// Argument vector passed to the tool.
    #[must_use]
    pub fn argv(&self) -> Vec<OsString> {
        self.args.to_argv()
    }
}
