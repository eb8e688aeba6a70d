//! Profile assembly and child supervision.

use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::thread;
use std::time::{Duration, Instant};

use pyjail_sandbox::{ResourceCeilings, Sandbox, SandboxCommand, SandboxProfile};
use tracing::{debug, warn};

use crate::error::CageError;
use crate::profile::BaseProfile;
use crate::protocol::{CageArgs, CageVerdict, READY_FD_ENV};
use crate::ready::ReadyChannel;

const CAGE_TARGET: &str = "pyjail_cage";
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Status `birdcage` reports when sandbox initialisation fails.
const SANDBOX_INIT_FAILURE: i32 = 1;

/// Combines the command line with the base profile.
///
/// The program is whitelisted as the only executable and the scratch
/// directory as the only writable path. [`READY_FD_ENV`] is always passed
/// through.
///
/// # Errors
///
/// Returns [`CageError`] if the scratch directory is missing, the status
/// file lies inside it, or the program path cannot be resolved.
pub fn build_profile(args: &CageArgs, base: &BaseProfile) -> Result<SandboxProfile, CageError> {
    if !args.scratch.is_dir() {
        return Err(CageError::ScratchMissing(args.scratch.clone()));
    }
    if args.status_file.starts_with(&args.scratch) {
        return Err(CageError::StatusFileInScratch(args.status_file.clone()));
    }
    let executable = resolve_program(args)?;

    let ceilings = ResourceCeilings::new(
        args.cpu_seconds,
        args.memory_bytes,
        args.file_size_bytes,
        args.open_files,
    )
    .with_process_limit(args.max_processes);

    let mut profile = SandboxProfile::new()
        .allow_executable(executable)
        .allow_read_write_path(args.scratch.clone())
        .allow_environment_variable(READY_FD_ENV)
        .with_resource_ceilings(ceilings);
    for path in &base.read_only_paths {
        profile = profile.allow_read_path(path.clone());
    }
    for key in &base.environment {
        profile = profile.allow_environment_variable(key.clone());
    }
    if let Some(run_as) = base.run_as() {
        profile = profile.run_as(run_as);
    }
    Ok(profile)
}

/// Canonical path of the program, so interpreter symlinks resolve to the
/// binary the sandbox whitelists.
fn resolve_program(args: &CageArgs) -> Result<PathBuf, CageError> {
    let program = args
        .command
        .first()
        .map(Path::new)
        .ok_or(CageError::MissingCommand)?;
    program.canonicalize().map_err(|source| CageError::Program {
        path: program.to_path_buf(),
        source,
    })
}

/// Runs the command and returns how it ended.
///
/// Must be called from a single-threaded process.
///
/// # Errors
///
/// Returns [`CageError`] for any failure before the child starts, or if the
/// child cannot be waited on.
pub fn run(args: &CageArgs) -> Result<CageVerdict, CageError> {
    let base = BaseProfile::load(&args.profile)?;
    let profile = build_profile(args, &base)?;

    let resolved = resolve_program(args)?;
    let mut command = SandboxCommand::new(&resolved);
    command.args(args.command.iter().skip(1));

    let ready = ReadyChannel::open()?;
    ready.advertise();

    let started = Instant::now();
    let deadline = started + Duration::from_millis(args.wall_timeout_ms);
    let mut child = Sandbox::new(profile).spawn(command)?;
    let mut ready = ready.into_receiver();
    debug!(
        target: CAGE_TARGET,
        program = %resolved.display(),
        wall_timeout_ms = args.wall_timeout_ms,
        "child spawned"
    );

    loop {
        if let Some(status) = child.try_wait().map_err(CageError::Supervise)? {
            let verdict = verdict_for(status, ready.signalled());
            debug!(
                target: CAGE_TARGET,
                ?verdict,
                elapsed_ms = started.elapsed().as_millis(),
                "child exited"
            );
            return Ok(verdict);
        }
        if Instant::now() >= deadline {
            warn!(
                target: CAGE_TARGET,
                wall_timeout_ms = args.wall_timeout_ms,
                "wall-clock limit reached; killing child"
            );
            if let Err(error) = child.kill() {
                warn!(target: CAGE_TARGET, %error, "failed to kill child");
            }
            child.wait().map_err(CageError::Supervise)?;
            return Ok(CageVerdict::TimedOut);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Maps how the sandbox ended onto a verdict.
///
/// `started` says whether the command used the start-up channel. Without
/// it, the status `birdcage` uses for initialisation failures means the
/// command never ran.
pub(crate) fn verdict_for(status: ExitStatus, started: bool) -> CageVerdict {
    match (status.code(), status.signal()) {
        (Some(SANDBOX_INIT_FAILURE), _) if !started => CageVerdict::SetupFailed {
            diagnostic: "sandbox initialisation failed before the command started".to_owned(),
        },
        (Some(code), _) => CageVerdict::Exited { code },
        (None, Some(signal)) => CageVerdict::Signalled { signal },
        (None, None) => CageVerdict::SetupFailed {
            diagnostic: format!("unrecognised child status: {status}"),
        },
    }
}
