//! Supervises daemon launch sequencing and runtime orchestration.

use std::sync::Arc;

use tracing::info;

use pyjail_config::Config;
use pyjail_runner::{CageExecutor, CancelToken, SandboxRunner};

use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::dispatch::{DispatchConnectionHandler, request_limit};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::transport::SocketListener;

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Collaborators required to launch the daemon runtime.
pub(crate) struct LaunchPlan<L, S, F> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) shutdown: S,
    pub(crate) sandbox: F,
}

/// Runs the daemon in the foreground until a termination signal arrives.
///
/// # Errors
///
/// Returns [`LaunchError`] when bootstrap fails, the endpoint cannot be
/// bound, or signal handlers cannot be installed.
pub fn run_daemon() -> Result<(), LaunchError> {
    run_daemon_with(LaunchPlan {
        loader: SystemConfigLoader,
        reporter: Arc::new(StructuredHealthReporter::new()),
        shutdown: SystemShutdownSignal,
        sandbox: CageExecutor::from_config,
    })
}

/// Runs the daemon with injected collaborators.
pub(crate) fn run_daemon_with<L, S, R, F>(plan: LaunchPlan<L, S, F>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal,
    R: SandboxRunner + 'static,
    F: FnOnce(&Config) -> R,
{
    let LaunchPlan {
        loader,
        reporter,
        shutdown,
        sandbox,
    } = plan;

    info!(target: PROCESS_TARGET, "starting daemon runtime");
    let daemon = bootstrap_with(&loader, Arc::clone(&reporter), sandbox)?;
    let listener = SocketListener::bind(daemon.config().listen())?;
    let endpoint = listener.local_endpoint();

    let runs = CancelToken::new();
    let handler = Arc::new(DispatchConnectionHandler::new(
        Arc::clone(daemon.runner()),
        runs.clone(),
        request_limit(daemon.config()),
    ));
    let listener_handle = listener.start(handler)?;
    reporter.listener_ready(&endpoint);

    let waited = shutdown.wait();
    reporter.shutdown_started();
    listener_handle.shutdown();
    runs.cancel();
    listener_handle.join()?;
    waited?;

    info!(target: PROCESS_TARGET, "shutdown sequence completed");
    Ok(())
}
