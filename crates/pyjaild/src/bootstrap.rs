//! Daemon bootstrap orchestration.

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use pyjail_config::{Config, SocketPreparationError};
use pyjail_runner::{SandboxRunner, ScriptRunner};
use pyjail_syntax::SyntaxError;

use crate::health::HealthReporter;
use crate::preflight::{self, PreflightError};
use crate::telemetry::{self, TelemetryError};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    ///
    /// # Errors
    ///
    /// Returns the loader's error when no configuration can be produced.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that hands out an already resolved configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// Socket preparation failed.
    #[error("failed to prepare daemon socket: {source}")]
    Socket {
        /// Filesystem error reported while preparing the socket directory.
        #[source]
        source: SocketPreparationError,
    },
    /// The sandbox toolchain is incomplete.
    #[error("sandbox preflight failed: {source}")]
    Preflight {
        /// First failed check.
        #[source]
        source: PreflightError,
    },
    /// The Python grammar could not be loaded.
    #[error("failed to load the Python grammar: {source}")]
    Grammar {
        /// Underlying parser error.
        #[source]
        source: SyntaxError,
    },
}

/// Result of a successful bootstrap invocation.
pub struct Daemon<R> {
    config: Arc<Config>,
    runner: Arc<ScriptRunner<R>>,
}

impl<R> Daemon<R> {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Pipeline shared by every connection.
    #[must_use]
    pub const fn runner(&self) -> &Arc<ScriptRunner<R>> {
        &self.runner
    }
}

/// Bootstraps the daemon using the supplied collaborators.
///
/// `sandbox` builds the [`SandboxRunner`] from the loaded configuration once
/// the preflight checks have passed.
///
/// # Errors
///
/// Returns the first [`BootstrapError`] encountered; the reporter is told
/// about it before returning.
pub fn bootstrap_with<R, F>(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    sandbox: F,
) -> Result<Daemon<R>, BootstrapError>
where
    R: SandboxRunner,
    F: FnOnce(&Config) -> R,
{
    reporter.bootstrap_starting();
    prepare(loader, reporter.as_ref(), sandbox)
        .map(|(config, runner)| {
            reporter.bootstrap_succeeded(&config);
            Daemon {
                config: Arc::new(config),
                runner: Arc::new(runner),
            }
        })
        .inspect_err(|error| reporter.bootstrap_failed(error))
}

fn prepare<R, F>(
    loader: &dyn ConfigLoader,
    reporter: &dyn HealthReporter,
    sandbox: F,
) -> Result<(Config, ScriptRunner<R>), BootstrapError>
where
    R: SandboxRunner,
    F: FnOnce(&Config) -> R,
{
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;
    config
        .listen()
        .prepare_filesystem()
        .map_err(|source| BootstrapError::Socket { source })?;
    preflight::check(&config).map_err(|source| BootstrapError::Preflight { source })?;
    reporter.preflight_passed(&config);

    let runner = ScriptRunner::new(&config, sandbox(&config))
        .map_err(|source| BootstrapError::Grammar { source })?;
    Ok((config, runner))
}
