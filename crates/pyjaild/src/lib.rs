//! The pyjail daemon.
//!
//! `pyjaild` accepts untrusted Python scripts over a JSON-lines socket
//! protocol and answers each with the script's result, its captured stdout,
//! and an error description. The work itself happens in
//! [`pyjail_runner::ScriptRunner`]; this crate supplies everything around it:
//!
//! - bootstrap: configuration via [`pyjail_config`], structured telemetry,
//!   socket preparation, and a preflight check of the sandbox toolchain;
//! - the socket transport, one thread per connection;
//! - request dispatch, including cancellation of a run whose client
//!   disconnects;
//! - shutdown on SIGTERM, SIGINT, SIGQUIT, or SIGHUP, which cancels every
//!   in-flight run.
//!
//! The daemon stays in the foreground; supervision is left to the process
//! manager.

mod bootstrap;
mod dispatch;
mod health;
pub mod preflight;
mod process;
pub mod telemetry;
mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_daemon};
pub use telemetry::TelemetryError;

#[cfg(test)]
mod tests;
