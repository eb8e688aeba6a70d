//! Contract between the isolation tool and the process that launches it.
//!
//! The launcher renders [`CageArgs`] into an argument vector and reads the
//! [`CageVerdict`] the tool records in the status file. The exit status
//! mirrors the verdict for humans but is not authoritative: a child can exit
//! with any code, including the reserved ones below.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};

/// Exit status when the wall-clock limit expired and the child was killed.
pub const EXIT_TIMED_OUT: i32 = 124;

/// Exit status for any failure before the child started.
pub const EXIT_SETUP_FAILURE: i32 = 125;

/// Added to a signal number when the child was killed by that signal.
pub const SIGNAL_EXIT_BASE: i32 = 128;

/// Environment variable naming the descriptor the command writes one byte
/// to once it is running.
pub const READY_FD_ENV: &str = "PYJAIL_READY_FD";

/// How a run ended, as recorded by the cage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case", deny_unknown_fields)]
pub enum CageVerdict {
    /// The command exited with `code`.
    Exited {
        /// Exit code of the command.
        code: i32,
    },
    /// The command was terminated by `signal`.
    Signalled {
        /// Signal number.
        signal: i32,
    },
    /// The wall-clock limit expired and the command was killed.
    TimedOut,
    /// The sandbox could not be prepared or the command never started.
    SetupFailed {
        /// Operator-facing reason.
        diagnostic: String,
    },
}

impl CageVerdict {
    /// Exit status the cage reports alongside this verdict.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Exited { code } => *code,
            Self::Signalled { signal } => SIGNAL_EXIT_BASE.saturating_add(*signal),
            Self::TimedOut => EXIT_TIMED_OUT,
            Self::SetupFailed { .. } => EXIT_SETUP_FAILURE,
        }
    }

    /// Writes the verdict to `path`, replacing any earlier contents.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be written.
    pub fn record(&self, path: &Path) -> io::Result<()> {
        let encoded = serde_json::to_vec(self).map_err(io::Error::other)?;
        fs::write(path, encoded)
    }

    /// Parses a recorded verdict. Empty or malformed input yields `None`.
    #[must_use]
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice(bytes).ok()
    }
}

/// Command line of `pyjail-cage`.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(
    name = "pyjail-cage",
    version,
    about = "Runs one command inside a resource-limited sandbox"
)]
pub struct CageArgs {
    /// Base profile (TOML) listing extra read-only paths, inherited
    /// environment variables, and the account to run as.
    #[arg(long)]
    pub profile: PathBuf,
    /// Per-run scratch directory; the only writable path.
    #[arg(long)]
    pub scratch: PathBuf,
    /// File the verdict is written to. Must lie outside `scratch`.
    #[arg(long)]
    pub status_file: PathBuf,
    /// `RLIMIT_CPU` in seconds.
    #[arg(long)]
    pub cpu_seconds: u64,
    /// `RLIMIT_AS` in bytes.
    #[arg(long)]
    pub memory_bytes: u64,
    /// `RLIMIT_FSIZE` in bytes.
    #[arg(long)]
    pub file_size_bytes: u64,
    /// `RLIMIT_NOFILE`.
    #[arg(long)]
    pub open_files: u64,
    /// `RLIMIT_NPROC`, when set.
    #[arg(long)]
    pub max_processes: Option<u64>,
    /// Wall-clock limit in milliseconds.
    #[arg(long)]
    pub wall_timeout_ms: u64,
    /// Absolute program path followed by its arguments.
    #[arg(last = true, required = true, num_args = 1..)]
    pub command: Vec<OsString>,
}

impl CageArgs {
    /// Renders the arguments the tool expects, without the program name.
    #[must_use]
    pub fn to_argv(&self) -> Vec<OsString> {
        let mut argv: Vec<OsString> = vec![
            "--profile".into(),
            self.profile.clone().into_os_string(),
            "--scratch".into(),
            self.scratch.clone().into_os_string(),
            "--status-file".into(),
            self.status_file.clone().into_os_string(),
            "--cpu-seconds".into(),
            self.cpu_seconds.to_string().into(),
            "--memory-bytes".into(),
            self.memory_bytes.to_string().into(),
            "--file-size-bytes".into(),
            self.file_size_bytes.to_string().into(),
            "--open-files".into(),
            self.open_files.to_string().into(),
            "--wall-timeout-ms".into(),
            self.wall_timeout_ms.to_string().into(),
        ];
        if let Some(processes) = self.max_processes {
            argv.push("--max-processes".into());
            argv.push(processes.to_string().into());
        }
        argv.push("--".into());
        argv.extend(self.command.iter().cloned());
        argv
    }
}
