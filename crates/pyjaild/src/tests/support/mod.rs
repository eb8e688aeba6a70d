//! Shared doubles for the daemon behaviour suites.

mod config_loader;
mod reporter;
mod sandbox;
mod toolchain;

pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use sandbox::{MockRunner, SandboxScript, scripted_runner};
pub use toolchain::Toolchain;
