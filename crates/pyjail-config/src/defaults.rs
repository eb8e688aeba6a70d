use std::env;

use camino::Utf8PathBuf;

use crate::logging::LogFormat;
use crate::names::NameList;
use crate::socket::SocketEndpoint;

/// Default TCP port the daemon listens on.
pub const DEFAULT_TCP_PORT: u16 = 8081;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Largest accepted script, in bytes.
pub const DEFAULT_MAX_SCRIPT_BYTES: usize = 200_000;

/// Largest number of function definitions in one script.
pub const DEFAULT_MAX_FUNCTION_DEFINITIONS: usize = 100;

/// CPU seconds granted to each run.
pub const DEFAULT_CPU_TIME_SECONDS: u64 = 5;

/// Address space granted to each run.
pub const DEFAULT_MEMORY_BYTES: u64 = 256 * 1024 * 1024;

/// Wall-clock limit for each run.
pub const DEFAULT_WALL_TIMEOUT_MS: u64 = 5_000;

/// Extra time the watchdog waits for the isolation tool's own timeout.
pub const DEFAULT_WATCHDOG_GRACE_MS: u64 = 500;

/// Largest file a run may write.
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 16 * 1024 * 1024;

/// Open file descriptors per run.
pub const DEFAULT_MAX_OPEN_FILES: u64 = 64;

/// `RLIMIT_NPROC` applied to each run.
///
/// The kernel counts every task owned by the sandbox account, so the value
/// must leave room for the other runs and processes sharing that account.
pub const DEFAULT_MAX_PROCESSES: u64 = 512;

/// Stdout bytes retained per run.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// Largest result-channel payload.
pub const DEFAULT_MAX_RESULT_BYTES: usize = 1024 * 1024;

/// Characters of an exception summary returned to callers.
pub const DEFAULT_ERROR_SUMMARY_CHARS: usize = 500;

/// Concurrent sandbox slots.
pub const DEFAULT_MAX_CONCURRENT_RUNS: usize = 4;

/// Time a request waits for a slot.
pub const DEFAULT_QUEUE_TIMEOUT_MS: u64 = 2_000;

const DENIED_MODULES: &[&str] = &[
    "importlib",
    "ctypes",
    "subprocess",
    "socket",
    "multiprocessing",
    "threading",
    "pty",
    "signal",
    "resource",
    "posix",
    "_posixsubprocess",
];

const DENIED_CALLS: &[&str] = &[
    "eval",
    "exec",
    "compile",
    "__import__",
    "breakpoint",
    "globals",
    "locals",
    "vars",
    "getattr",
    "setattr",
    "delattr",
    "__builtins__",
];

const DENIED_ATTRIBUTES: &[&str] = &[
    "os.system",
    "os.popen",
    "os.fork",
    "os.forkpty",
    "os.kill",
    "os.killpg",
    "os.execl",
    "os.execle",
    "os.execlp",
    "os.execv",
    "os.execve",
    "os.execvp",
    "os.execvpe",
    "os.spawnl",
    "os.spawnle",
    "os.spawnv",
    "os.spawnve",
    "os.spawnlp",
    "os.spawnlpe",
    "os.spawnvp",
    "os.spawnvpe",
    "os.posix_spawn",
    "os.posix_spawnp",
    "os.setsid",
    "os._exit",
    "sys.modules",
    "sys.exec_prefix",
    "__subclasses__",
    "__globals__",
    "__builtins__",
    "__code__",
    "__bases__",
    "__base__",
    "__mro__",
    "__closure__",
];

/// Default log filter expression used by the binaries.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Loopback TCP endpoint the daemon binds by default.
#[must_use]
pub fn default_listen_endpoint() -> SocketEndpoint {
    SocketEndpoint::tcp("127.0.0.1", DEFAULT_TCP_PORT)
}

/// Modules denied by default.
#[must_use]
pub fn default_denied_modules() -> NameList {
    NameList::from_static(DENIED_MODULES)
}

/// Builtins denied by default.
#[must_use]
pub fn default_denied_calls() -> NameList {
    NameList::from_static(DENIED_CALLS)
}

/// Attributes denied by default.
#[must_use]
pub fn default_denied_attributes() -> NameList {
    NameList::from_static(DENIED_ATTRIBUTES)
}

/// Install location of the `pyjail-cage` isolation tool.
#[must_use]
pub fn default_isolation_tool() -> Utf8PathBuf {
    Utf8PathBuf::from("/usr/local/bin/pyjail-cage")
}

/// Install location of the isolation tool's base profile.
#[must_use]
pub fn default_isolation_profile() -> Utf8PathBuf {
    Utf8PathBuf::from("/etc/pyjail/cage-profile.toml")
}

/// System Python interpreter.
#[must_use]
pub fn default_interpreter() -> Utf8PathBuf {
    Utf8PathBuf::from("/usr/bin/python3")
}

/// Temporary directory of the host, falling back to `/tmp`.
#[must_use]
pub fn default_scratch_root() -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(env::temp_dir()).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}
