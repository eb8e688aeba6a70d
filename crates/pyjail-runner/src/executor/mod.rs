//! Running execution requests under the isolation tool.
//!
//! [`CageExecutor`] prepares a private scratch directory, launches the
//! configured isolation tool in a new process group, and supervises it:
//!
//! 1. A fresh run directory is created under `scratch_root`. Its `sandbox`
//!    subdirectory receives `harness.py`, `script.py`, and an empty
//!    `result.json`; next to it sits the empty `cage-status.json` the tool
//!    records its verdict in, out of the sandbox's reach.
//! 2. The tool is spawned with stdin closed and stdout/stderr piped. Reader
//!    threads drain both pipes with a byte cap.
//! 3. A watchdog polls the tool every 10 ms. It kills the whole process group
//!    when the wall-clock limit plus grace passes or the [`CancelToken`]
//!    fires.
//! 4. After any exit the group is killed again so no descendant survives.
//!    The run is classified from the tool's verdict, never from its exit
//!    status. The run directory is removed when the run returns.

mod cancel;
mod capture;
mod classify;
mod isolation;

use std::fs::{self, Permissions};
use std::io::{self, Read};
use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use pyjail_cage::CageVerdict;
use pyjail_config::Config;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::error::InfrastructureError;
use crate::harness::{HARNESS_FILE, RESULT_FILE, SCRIPT_FILE};
use crate::outcome::ExecutionOutcome;
use crate::request::ExecutionRequest;

pub use self::cancel::CancelToken;
pub use self::isolation::IsolationProfile;

use self::capture::CaptureHandle;
use self::classify::{Termination, classify};

/// Tracing target for executor operations.
const EXECUTOR_TARGET: &str = "pyjail_runner::executor";

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const STDERR_CAPTURE_BYTES: usize = 64 * 1024;
const DRAIN_PATIENCE: Duration = Duration::from_millis(500);

/// Directory inside the run directory that the sandbox may write.
const SANDBOX_DIR: &str = "sandbox";
/// Verdict file written by the isolation tool.
const STATUS_FILE: &str = "cage-status.json";
const STATUS_CAPTURE_BYTES: usize = 4 * 1024;

/// Files of one run. Dropping it removes the run directory.
#[derive(Debug)]
struct RunDirectory {
    root: TempDir,
    sandbox: PathBuf,
    status: PathBuf,
}

/// Seam between the pipeline and process supervision.
///
/// [`CageExecutor`] is the production implementation; tests substitute
/// doubles that return prepared outcomes.
pub trait SandboxRunner: Send + Sync {
    /// Runs `request` to completion, timeout, or cancellation.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureError`] when the run could not be started or
    /// the isolation tool reported a setup failure.
    fn run(
        &self,
        request: &ExecutionRequest,
        cancel: &CancelToken,
    ) -> Result<ExecutionOutcome, InfrastructureError>;
}

/// Static executor configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorSettings {
    /// Isolation tool binary.
    pub isolation_tool: PathBuf,
    /// Base profile passed to the tool.
    pub isolation_profile: PathBuf,
    /// Interpreter run inside the sandbox.
    pub interpreter: PathBuf,
    /// Parent of per-run scratch directories.
    pub scratch_root: PathBuf,
    /// Extra time the watchdog allows beyond the wall-clock limit.
    pub watchdog_grace: Duration,
    /// Stdout bytes kept per run.
    pub max_output_bytes: usize,
    /// Result-channel bytes read per run.
    pub max_result_bytes: usize,
}

impl ExecutorSettings {
    /// Settings from configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            isolation_tool: config.isolation_tool().as_std_path().to_path_buf(),
            isolation_profile: config.isolation_profile().as_std_path().to_path_buf(),
            interpreter: config.interpreter().as_std_path().to_path_buf(),
            scratch_root: config.scratch_root().as_std_path().to_path_buf(),
            watchdog_grace: Duration::from_millis(config.watchdog_grace_ms()),
            max_output_bytes: config.max_output_bytes(),
            max_result_bytes: config.max_result_bytes(),
        }
    }
}

/// Runs requests through the `pyjail-cage` isolation tool.
#[derive(Debug, Clone)]
pub struct CageExecutor {
    settings: ExecutorSettings,
}

impl CageExecutor {
    /// Creates an executor with explicit settings.
    #[must_use]
    pub const fn new(settings: ExecutorSettings) -> Self {
        Self { settings }
    }

    /// Creates an executor from configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(ExecutorSettings::from_config(config))
    }

    /// The executor's settings.
    #[must_use]
    pub const fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    fn prepare_run_directory(
        &self,
        request: &ExecutionRequest,
    ) -> Result<RunDirectory, InfrastructureError> {
        let root = &self.settings.scratch_root;
        let run_dir = tempfile::Builder::new()
            .prefix("pyjail-run-")
            .tempdir_in(root)
            .map_err(|source| InfrastructureError::scratch_io(root, source))?;
        let sandbox = run_dir.path().join(SANDBOX_DIR);
        fs::create_dir(&sandbox)
            .map_err(|source| InfrastructureError::scratch_io(&sandbox, source))?;
        let payload = request.payload();

        write_file(&sandbox.join(HARNESS_FILE), payload.harness(), 0o644)?;
        write_file(&sandbox.join(SCRIPT_FILE), payload.script(), 0o644)?;
        // The sandboxed account may differ from ours.
        write_file(&sandbox.join(RESULT_FILE), "", 0o666)?;
        set_mode(&sandbox, 0o711)?;
        // The tool records its verdict after dropping privileges.
        let status = run_dir.path().join(STATUS_FILE);
        write_file(&status, "", 0o666)?;
        set_mode(run_dir.path(), 0o711)?;
        Ok(RunDirectory {
            root: run_dir,
            sandbox,
            status,
        })
    }

    fn spawn(&self, profile: &IsolationProfile) -> Result<Child, InfrastructureError> {
        let tool = &self.settings.isolation_tool;
        Command::new(tool)
            .args(profile.argv())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .spawn()
            .map_err(|source| InfrastructureError::IsolationUnavailable {
                tool: tool.clone(),
                source: Arc::new(source),
            })
    }

    /// Polls `child` until it exits, the deadline passes, or `cancel` fires.
    fn supervise(
        &self,
        child: &mut Child,
        group: Option<Pid>,
        deadline: Instant,
        cancel: &CancelToken,
        run_id: u64,
    ) -> Result<Termination, InfrastructureError> {
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    return Ok(Termination::Exited {
                        code: status.code(),
                        signal: status.signal(),
                    });
                }
                Ok(None) => {}
                Err(source) => {
                    warn!(target: EXECUTOR_TARGET, run_id, %source, "failed to poll isolation tool");
                    kill_group(group, run_id);
                    reap(child, run_id);
                    return Err(InfrastructureError::IsolationUnavailable {
                        tool: self.settings.isolation_tool.clone(),
                        source: Arc::new(source),
                    });
                }
            }

            let termination = if cancel.is_cancelled() {
                Some(Termination::Cancelled)
            } else if Instant::now() >= deadline {
                Some(Termination::Deadline)
            } else {
                None
            };
            if let Some(stopped) = termination {
                let reason = if stopped == Termination::Cancelled {
                    "cancelled"
                } else {
                    "deadline"
                };
                warn!(
                    target: EXECUTOR_TARGET,
                    run_id,
                    reason,
                    "killing sandbox process group"
                );
                kill_group(group, run_id);
                reap(child, run_id);
                return Ok(stopped);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl SandboxRunner for CageExecutor {
    fn run(
        &self,
        request: &ExecutionRequest,
        cancel: &CancelToken,
    ) -> Result<ExecutionOutcome, InfrastructureError> {
        let run_id = request.run_id();
        let wall_timeout_ms = request.limits().wall_timeout_ms;
        let run_dir = self.prepare_run_directory(request)?;
        let profile = IsolationProfile::for_request(
            &self.settings,
            request,
            &run_dir.sandbox,
            &run_dir.status,
        );

        let started = Instant::now();
        let mut child = self.spawn(&profile)?;
        let group = process_group(&child);
        debug!(
            target: EXECUTOR_TARGET,
            run_id,
            pid = child.id(),
            run_dir = %run_dir.root.path().display(),
            "isolation tool spawned"
        );

        let stdout_capture =
            CaptureHandle::spawn(child.stdout.take(), self.settings.max_output_bytes);
        let stderr_capture = CaptureHandle::spawn(child.stderr.take(), STDERR_CAPTURE_BYTES);

        let deadline =
            started + Duration::from_millis(wall_timeout_ms) + self.settings.watchdog_grace;
        let termination = self.supervise(&mut child, group, deadline, cancel, run_id)?;
        let elapsed = started.elapsed();
        kill_group(group, run_id);

        let stdout = stdout_capture.finish(DRAIN_PATIENCE);
        let stderr = stderr_capture.finish(DRAIN_PATIENCE).into_text();
        if !stderr.is_empty() {
            debug!(target: EXECUTOR_TARGET, run_id, stderr = %stderr, "sandbox stderr");
        }
        if stdout.truncated {
            warn!(
                target: EXECUTOR_TARGET,
                run_id,
                limit = self.settings.max_output_bytes,
                "stdout truncated"
            );
        }

        let verdict = read_verdict(&run_dir.status, run_id)?;
        let classified = classify(termination, verdict, &stderr)?;
        let result_channel = read_result(
            &run_dir.sandbox.join(RESULT_FILE),
            self.settings.max_result_bytes,
            run_id,
        )?;

        info!(
            target: EXECUTOR_TARGET,
            run_id,
            exit_state = %classified.state,
            exit_code = ?classified.exit_code,
            signal = ?classified.signal,
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "run finished"
        );

        Ok(ExecutionOutcome {
            state: classified.state,
            stdout_truncated: stdout.truncated,
            stdout: stdout.into_text(),
            result_channel,
            exit_code: classified.exit_code,
            signal: classified.signal,
            stderr,
            wall_timeout_ms,
            elapsed,
        })
    }
}

fn process_group(child: &Child) -> Option<Pid> {
    i32::try_from(child.id()).ok().map(Pid::from_raw)
}

fn kill_group(group: Option<Pid>, run_id: u64) {
    let Some(pgid) = group else {
        return;
    };
    match killpg(pgid, Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(errno) => {
            warn!(target: EXECUTOR_TARGET, run_id, %errno, "failed to kill process group");
        }
    }
}

fn reap(child: &mut Child, run_id: u64) {
    if let Err(error) = child.wait() {
        warn!(target: EXECUTOR_TARGET, run_id, %error, "failed to reap isolation tool");
    }
}

fn write_file(path: &Path, contents: &str, mode: u32) -> Result<(), InfrastructureError> {
    fs::write(path, contents).map_err(|source| InfrastructureError::scratch_io(path, source))?;
    set_mode(path, mode)
}

fn set_mode(path: &Path, mode: u32) -> Result<(), InfrastructureError> {
    fs::set_permissions(path, Permissions::from_mode(mode))
        .map_err(|source| InfrastructureError::scratch_io(path, source))
}

/// Reads the result channel once every sandboxed process is gone.
///
/// Anything other than a regular file is ignored, so a script cannot point
/// the channel at a file only the service may read.
fn read_result(
    path: &Path,
    limit: usize,
    run_id: u64,
) -> Result<Option<String>, InfrastructureError> {
    let Some(bytes) = read_bounded(path, limit, run_id)? else {
        return Ok(None);
    };
    if bytes.len() > limit {
        warn!(target: EXECUTOR_TARGET, run_id, limit, "result channel exceeds limit");
        return Ok(None);
    }
    if bytes.is_empty() {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}

/// Reads the verdict the isolation tool recorded, if any.
fn read_verdict(path: &Path, run_id: u64) -> Result<Option<CageVerdict>, InfrastructureError> {
    let Some(bytes) = read_bounded(path, STATUS_CAPTURE_BYTES, run_id)? else {
        return Ok(None);
    };
    let verdict = CageVerdict::parse(&bytes);
    if verdict.is_none() && !bytes.is_empty() {
        warn!(target: EXECUTOR_TARGET, run_id, "isolation tool verdict is unreadable");
    }
    Ok(verdict)
}

/// Reads at most `limit + 1` bytes of a regular file. Missing files and
/// anything else at `path` yield `None`.
fn read_bounded(
    path: &Path,
    limit: usize,
    run_id: u64,
) -> Result<Option<Vec<u8>>, InfrastructureError> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(source) if source.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(InfrastructureError::scratch_io(path, source)),
    };
    if !metadata.file_type().is_file() {
        warn!(
            target: EXECUTOR_TARGET,
            run_id,
            path = %path.display(),
            "expected a regular file"
        );
        return Ok(None);
    }

    let file = fs::File::open(path).map_err(|source| InfrastructureError::scratch_io(path, source))?;
    let mut bytes = Vec::new();
    let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    file.take(cap)
        .read_to_end(&mut bytes)
        .map_err(|source| InfrastructureError::scratch_io(path, source))?;
    Ok(Some(bytes))
}
