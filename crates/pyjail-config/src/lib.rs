//! Shared configuration for the pyjail execution service.
//!
//! [`Config`] is loaded once at process start by layering built-in defaults,
//! an optional TOML file, `PYJAIL_*` environment variables, and command-line
//! flags through [`ortho_config`]. The resulting value is immutable: the
//! daemon wraps it in an `Arc` and hands read-only references to the
//! validator, the executor, and the transport.
//!
//! ```no_run
//! use pyjail_config::Config;
//!
//! let config = Config::load_from_iter(["pyjaild", "--wall-timeout-ms", "2000"])?;
//! assert_eq!(config.wall_timeout_ms(), 2000);
//! # Ok::<(), std::sync::Arc<ortho_config::OrthoError>>(())
//! ```

mod defaults;
mod logging;
mod names;
mod socket;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_CPU_TIME_SECONDS, DEFAULT_ERROR_SUMMARY_CHARS, DEFAULT_LOG_FILTER,
    DEFAULT_MAX_CONCURRENT_RUNS, DEFAULT_MAX_FILE_SIZE_BYTES, DEFAULT_MAX_FUNCTION_DEFINITIONS,
    DEFAULT_MAX_OPEN_FILES, DEFAULT_MAX_OUTPUT_BYTES, DEFAULT_MAX_PROCESSES,
    DEFAULT_MAX_RESULT_BYTES, DEFAULT_MAX_SCRIPT_BYTES, DEFAULT_MEMORY_BYTES,
    DEFAULT_QUEUE_TIMEOUT_MS, DEFAULT_TCP_PORT, DEFAULT_WALL_TIMEOUT_MS,
    DEFAULT_WATCHDOG_GRACE_MS, default_denied_attributes, default_denied_calls,
    default_denied_modules, default_interpreter, default_isolation_profile,
    default_isolation_tool, default_listen_endpoint, default_log_filter,
    default_log_filter_string, default_log_format, default_scratch_root,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use names::NameList;
pub use socket::{SocketEndpoint, SocketParseError, SocketPreparationError};

/// Runtime configuration shared by the daemon and its collaborators.
#[derive(Debug, Clone, Deserialize, Serialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "PYJAIL")]
pub struct Config {
    /// Endpoint the daemon listens on.
    #[ortho_config(default = default_listen_endpoint())]
    pub listen: SocketEndpoint,
    /// `tracing` filter expression.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Log output format.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Largest accepted script, in bytes.
    #[ortho_config(default = DEFAULT_MAX_SCRIPT_BYTES)]
    pub max_script_bytes: usize,
    /// Largest number of function definitions a script may contain.
    #[ortho_config(default = DEFAULT_MAX_FUNCTION_DEFINITIONS)]
    pub max_function_definitions: usize,
    /// Modules that scripts may not import.
    #[ortho_config(default = default_denied_modules())]
    pub denied_modules: NameList,
    /// Builtins that scripts may not reference.
    #[ortho_config(default = default_denied_calls())]
    pub denied_calls: NameList,
    /// Qualified (`os.system`) or bare (`__globals__`) attributes scripts may
    /// not touch.
    #[ortho_config(default = default_denied_attributes())]
    pub denied_attributes: NameList,
    /// Hard CPU time ceiling per run.
    #[ortho_config(default = DEFAULT_CPU_TIME_SECONDS)]
    pub cpu_time_seconds: u64,
    /// Hard address-space ceiling per run.
    #[ortho_config(default = DEFAULT_MEMORY_BYTES)]
    pub memory_bytes: u64,
    /// Wall-clock limit per run.
    #[ortho_config(default = DEFAULT_WALL_TIMEOUT_MS)]
    pub wall_timeout_ms: u64,
    /// Extra time the supervising watchdog grants the isolation tool before
    /// killing the process group itself.
    #[ortho_config(default = DEFAULT_WATCHDOG_GRACE_MS)]
    pub watchdog_grace_ms: u64,
    /// Largest file a run may write.
    #[ortho_config(default = DEFAULT_MAX_FILE_SIZE_BYTES)]
    pub max_file_size_bytes: u64,
    /// Open file descriptor ceiling per run.
    #[ortho_config(default = DEFAULT_MAX_OPEN_FILES)]
    pub max_open_files: u64,
    /// Process ceiling per run; zero leaves `RLIMIT_NPROC` untouched.
    #[ortho_config(default = DEFAULT_MAX_PROCESSES)]
    pub max_processes: u64,
    /// Stdout bytes retained per run; the remainder is discarded.
    #[ortho_config(default = DEFAULT_MAX_OUTPUT_BYTES)]
    pub max_output_bytes: usize,
    /// Largest accepted result-channel payload.
    #[ortho_config(default = DEFAULT_MAX_RESULT_BYTES)]
    pub max_result_bytes: usize,
    /// Characters of an exception summary returned to callers.
    #[ortho_config(default = DEFAULT_ERROR_SUMMARY_CHARS)]
    pub error_summary_chars: usize,
    /// Concurrent sandbox slots.
    #[ortho_config(default = DEFAULT_MAX_CONCURRENT_RUNS)]
    pub max_concurrent_runs: usize,
    /// How long a request waits for a free slot before being refused.
    #[ortho_config(default = DEFAULT_QUEUE_TIMEOUT_MS)]
    pub queue_timeout_ms: u64,
    /// Path of the isolation tool binary.
    #[ortho_config(default = default_isolation_tool())]
    pub isolation_tool: Utf8PathBuf,
    /// Base profile handed to the isolation tool.
    #[ortho_config(default = default_isolation_profile())]
    pub isolation_profile: Utf8PathBuf,
    /// Python interpreter executed inside the sandbox.
    #[ortho_config(default = default_interpreter())]
    pub interpreter: Utf8PathBuf,
    /// Directory under which per-run scratch directories are created.
    #[ortho_config(default = default_scratch_root())]
    pub scratch_root: Utf8PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen_endpoint(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            max_script_bytes: DEFAULT_MAX_SCRIPT_BYTES,
            max_function_definitions: DEFAULT_MAX_FUNCTION_DEFINITIONS,
            denied_modules: default_denied_modules(),
            denied_calls: default_denied_calls(),
            denied_attributes: default_denied_attributes(),
            cpu_time_seconds: DEFAULT_CPU_TIME_SECONDS,
            memory_bytes: DEFAULT_MEMORY_BYTES,
            wall_timeout_ms: DEFAULT_WALL_TIMEOUT_MS,
            watchdog_grace_ms: DEFAULT_WATCHDOG_GRACE_MS,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            max_open_files: DEFAULT_MAX_OPEN_FILES,
            max_processes: DEFAULT_MAX_PROCESSES,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            max_result_bytes: DEFAULT_MAX_RESULT_BYTES,
            error_summary_chars: DEFAULT_ERROR_SUMMARY_CHARS,
            max_concurrent_runs: DEFAULT_MAX_CONCURRENT_RUNS,
            queue_timeout_ms: DEFAULT_QUEUE_TIMEOUT_MS,
            isolation_tool: default_isolation_tool(),
            isolation_profile: default_isolation_profile(),
            interpreter: default_interpreter(),
            scratch_root: default_scratch_root(),
        }
    }
}

impl Config {
    /// Endpoint the daemon listens on.
    #[must_use]
    pub const fn listen(&self) -> &SocketEndpoint {
        &self.listen
    }

    /// Filter expression for the tracing subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Output format for the tracing subscriber.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Largest accepted script, in bytes.
    #[must_use]
    pub const fn max_script_bytes(&self) -> usize {
        self.max_script_bytes
    }

    /// Largest number of function definitions a script may contain.
    #[must_use]
    pub const fn max_function_definitions(&self) -> usize {
        self.max_function_definitions
    }

    /// Modules scripts may not import.
    #[must_use]
    pub const fn denied_modules(&self) -> &NameList {
        &self.denied_modules
    }

    /// Builtins scripts may not reference.
    #[must_use]
    pub const fn denied_calls(&self) -> &NameList {
        &self.denied_calls
    }

    /// Attributes scripts may not touch.
    #[must_use]
    pub const fn denied_attributes(&self) -> &NameList {
        &self.denied_attributes
    }

    /// Hard CPU time ceiling per run.
    #[must_use]
    pub const fn cpu_time_seconds(&self) -> u64 {
        self.cpu_time_seconds
    }

    /// Hard address-space ceiling per run.
    #[must_use]
    pub const fn memory_bytes(&self) -> u64 {
        self.memory_bytes
    }

    /// Wall-clock limit per run, in milliseconds.
    #[must_use]
    pub const fn wall_timeout_ms(&self) -> u64 {
        self.wall_timeout_ms
    }

    /// Watchdog grace period, in milliseconds.
    #[must_use]
    pub const fn watchdog_grace_ms(&self) -> u64 {
        self.watchdog_grace_ms
    }

    /// Largest file a run may write.
    #[must_use]
    pub const fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_bytes
    }

    /// Open file descriptor ceiling per run.
    #[must_use]
    pub const fn max_open_files(&self) -> u64 {
        self.max_open_files
    }

    /// Process ceiling per run, when configured.
    #[must_use]
    pub const fn max_processes(&self) -> Option<u64> {
        if self.max_processes == 0 {
            None
        } else {
            Some(self.max_processes)
        }
    }

    /// Stdout bytes retained per run.
    #[must_use]
    pub const fn max_output_bytes(&self) -> usize {
        self.max_output_bytes
    }

    /// Largest accepted result-channel payload.
    #[must_use]
    pub const fn max_result_bytes(&self) -> usize {
        self.max_result_bytes
    }

    /// Characters of an exception summary returned to callers.
    #[must_use]
    pub const fn error_summary_chars(&self) -> usize {
        self.error_summary_chars
    }

    /// Concurrent sandbox slots; never less than one.
    #[must_use]
    pub fn max_concurrent_runs(&self) -> usize {
        self.max_concurrent_runs.max(1)
    }

    /// Time a request may wait for a free slot, in milliseconds.
    #[must_use]
    pub const fn queue_timeout_ms(&self) -> u64 {
        self.queue_timeout_ms
    }

    /// Path of the isolation tool binary.
    #[must_use]
    pub fn isolation_tool(&self) -> &Utf8Path {
        &self.isolation_tool
    }

    /// Base profile handed to the isolation tool.
    #[must_use]
    pub fn isolation_profile(&self) -> &Utf8Path {
        &self.isolation_profile
    }

    /// Python interpreter executed inside the sandbox.
    #[must_use]
    pub fn interpreter(&self) -> &Utf8Path {
        &self.interpreter
    }

    /// Root directory for per-run scratch directories.
    #[must_use]
    pub fn scratch_root(&self) -> &Utf8Path {
        &self.scratch_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_limits() {
        let config = Config::default();
        assert_eq!(config.max_script_bytes(), 200_000);
        assert_eq!(config.wall_timeout_ms(), 5_000);
        assert_eq!(config.max_concurrent_runs(), 4);
        assert!(config.denied_modules().contains("subprocess"));
        assert!(config.denied_calls().contains("eval"));
        assert!(config.denied_attributes().contains("os.system"));
    }

    #[test]
    fn process_limit_is_set_unless_zeroed() {
        let mut config = Config::default();
        assert_eq!(config.max_processes(), Some(512));
        config.max_processes = 0;
        assert_eq!(config.max_processes(), None);
    }

    #[test]
    fn slot_capacity_is_never_zero() {
        let mut config = Config::default();
        config.max_concurrent_runs = 0;
        assert_eq!(config.max_concurrent_runs(), 1);
    }
}
