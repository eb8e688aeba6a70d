//! Binary entry point for `pyjail-cage`.

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use pyjail_cage::{CageArgs, CageVerdict, EXIT_SETUP_FAILURE, run};
use tracing::error;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    if init_tracing().is_err() {
        return exit_code(EXIT_SETUP_FAILURE);
    }

    let args = match CageArgs::try_parse() {
        Ok(args) => args,
        Err(clap_error) => {
            let informational = matches!(
                clap_error.kind(),
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
            );
            let mut stderr = io::stderr().lock();
            if write!(stderr, "{clap_error}").is_err() {
                return exit_code(EXIT_SETUP_FAILURE);
            }
            return if informational {
                ExitCode::SUCCESS
            } else {
                exit_code(EXIT_SETUP_FAILURE)
            };
        }
    };

    let verdict = run(&args).unwrap_or_else(|cage_error| {
        error!(target: "pyjail_cage", error = %cage_error, "sandbox setup failed");
        CageVerdict::SetupFailed {
            diagnostic: cage_error.to_string(),
        }
    });
    if let Err(write_error) = verdict.record(&args.status_file) {
        error!(
            target: "pyjail_cage",
            error = %write_error,
            path = %args.status_file.display(),
            "failed to record verdict"
        );
        return exit_code(EXIT_SETUP_FAILURE);
    }
    exit_code(verdict.exit_code())
}

fn init_tracing() -> Result<(), SetGlobalDefaultError> {
    let filter = EnvFilter::try_from_env("PYJAIL_CAGE_LOG")
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    // Stdout belongs to the child; diagnostics go to stderr.
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(u8::MAX))
}
