//! Waiting for the signal that stops the daemon.

use std::io;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use signal_hook::low_level::signal_name;
use thiserror::Error;
use tracing::info;

use super::PROCESS_TARGET;

/// Signals that begin a graceful stop.
const TERMINATION_SIGNALS: [i32; 4] = [SIGTERM, SIGINT, SIGQUIT, SIGHUP];

/// Something the launch sequence can block on until the daemon should stop.
pub trait ShutdownSignal: Send + Sync {
    /// Blocks until shutdown should proceed.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError`] if the notification source cannot be set up.
    fn wait(&self) -> Result<(), ShutdownError>;
}

/// Why waiting for shutdown failed.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// The process signal handlers could not be registered.
    #[error("cannot register termination signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Blocks until the process receives SIGTERM, SIGINT, SIGQUIT, or SIGHUP.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShutdownSignal;

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        let mut signals =
            Signals::new(TERMINATION_SIGNALS).map_err(|source| ShutdownError::Install { source })?;
        let received = signals.forever().next();
        info!(
            target: PROCESS_TARGET,
            signal = received.and_then(signal_name).unwrap_or("unknown"),
            "stopping: no new connections, cancelling in-flight runs"
        );
        Ok(())
    }
}
