//! Entry point for the pyjail daemon.

use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    match pyjaild::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(target: "pyjaild", %error, "daemon stopped");
            if writeln!(io::stderr(), "pyjaild: {error}").is_err() {
                return ExitCode::from(2);
            }
            ExitCode::FAILURE
        }
    }
}
