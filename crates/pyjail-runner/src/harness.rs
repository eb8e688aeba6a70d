//! Wrapping accepted scripts with the Python driver.

use std::ffi::OsString;
use std::path::Path;

use pyjail_config::Config;
use pyjail_syntax::AcceptedScript;

/// Driver program executed by the interpreter.
pub const HARNESS_SOURCE: &str = include_str!("harness.py");

/// File name of the driver inside the scratch directory.
pub const HARNESS_FILE: &str = "harness.py";

/// File name of the user script inside the scratch directory.
pub const SCRIPT_FILE: &str = "script.py";

/// File name of the result channel inside the scratch directory.
pub const RESULT_FILE: &str = "result.json";

/// Options baked into the driver's command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarnessSettings {
    /// Characters of an exception summary the driver keeps.
    pub error_summary_chars: usize,
}

impl HarnessSettings {
    /// Settings from configuration.
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self {
            error_summary_chars: config.error_summary_chars(),
        }
    }
}

/// An accepted script together with the driver that runs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessPayload {
    script: String,
    settings: HarnessSettings,
}

impl HarnessPayload {
    /// Wraps an accepted script. The script text is kept verbatim.
    #[must_use]
    pub fn wrap(accepted: AcceptedScript, settings: HarnessSettings) -> Self {
        Self {
            script: accepted.into_source(),
            settings,
        }
    }

    /// The user script.
    #[must_use]
    pub fn script(&self) -> &str {
        &self.script
    }

    /// The driver source.
    #[must_use]
    pub const fn harness(&self) -> &'static str {
        HARNESS_SOURCE
    }

    /// Interpreter arguments for a payload laid out in `scratch`.
    ///
    /// `-I` isolates the interpreter from the environment and user site,
    /// `-B` avoids bytecode writes, `-u` keeps stdout unbuffered.
    #[must_use]
    pub fn interpreter_args(&self, scratch: &Path) -> Vec<OsString> {
        vec![
            "-I".into(),
            "-B".into(),
            "-u".into(),
            scratch.join(HARNESS_FILE).into_os_string(),
            scratch.join(SCRIPT_FILE).into_os_string(),
            scratch.join(RESULT_FILE).into_os_string(),
            self.settings.error_summary_chars.to_string().into(),
        ]
    }
}
