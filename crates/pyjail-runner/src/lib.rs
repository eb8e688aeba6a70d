//! Sandboxed execution of validated Python scripts.
//!
//! `pyjail-runner` turns an [`AcceptedScript`](pyjail_syntax::AcceptedScript)
//! into an [`ExecutionResponse`]. The stages are separate so each can be
//! tested on its own:
//!
//! - [`HarnessPayload`] wraps the script with the fixed `harness.py` driver
//!   that calls `main()` and writes a JSON envelope to a result file.
//! - [`ExecutionRequest`] pairs the payload with [`ResourceLimits`]; it can
//!   only be built from an accepted script.
//! - [`SandboxRunner`] runs a request. [`CageExecutor`] launches the
//!   `pyjail-cage` isolation tool in its own process group and supervises it
//!   with a watchdog and a [`CancelToken`].
//! - [`assemble`] turns the raw [`ExecutionOutcome`] into the public
//!   response, keeping exactly one of `result` and `error`.
//!
//! [`ScriptRunner`] ties validation, slot acquisition from the
//! [`SlotPool`], execution, and assembly together.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use pyjail_config::Config;
//! use pyjail_runner::{CageExecutor, CancelToken, ScriptRunner};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(Config::default());
//! let runner = ScriptRunner::new(&config, CageExecutor::from_config(&config))?;
//! let response = runner.execute(
//!     "def main():\n    return {\"message\": \"success\"}\n",
//!     None,
//!     &CancelToken::new(),
//! )?;
//! println!("{}", serde_json::to_string(&response)?);
//! # Ok(()) }
//! ```

pub mod error;
pub mod executor;
pub mod harness;
pub mod limits;
pub mod outcome;
pub mod pipeline;
pub mod pool;
pub mod request;

#[cfg(test)]
mod tests;

pub use self::error::{ExecutionError, InfrastructureError};
pub use self::executor::{
    CageExecutor, CancelToken, ExecutorSettings, IsolationProfile, SandboxRunner,
};
pub use self::harness::{HarnessPayload, HarnessSettings};
pub use self::limits::{LimitOverrides, ResourceLimits};
pub use self::outcome::{ExecutionOutcome, ExecutionResponse, ExitState, ParserSettings, assemble};
pub use self::pipeline::ScriptRunner;
pub use self::pool::{SlotPermit, SlotPool};
pub use self::request::ExecutionRequest;
