//! Isolation tool used by the execution service.
//!
//! `pyjail-cage` runs exactly one command under a [`pyjail_sandbox`] profile
//! built from its command line and an operator-maintained
//! [`BaseProfile`]. It supervises the child against a wall-clock deadline
//! and records a [`CageVerdict`] in the status file named on its command
//! line:
//!
//! - `exited` with the child's code when it exited normally,
//! - `signalled` with the signal number when it was killed,
//! - `timed_out` when the deadline expired,
//! - `setup_failed` when the sandbox could not be prepared or the command
//!   never started.
//!
//! The status file lives outside the writable scratch directory, so the
//! child cannot forge it. The exit status mirrors the verdict through
//! [`CageVerdict::exit_code`].
//!
//! The launcher renders [`CageArgs::to_argv`] and reads the verdict back, so
//! both sides share this crate.

mod error;
mod profile;
mod protocol;
mod ready;
mod run;

pub use error::CageError;
pub use profile::BaseProfile;
pub use protocol::{
    CageArgs, CageVerdict, EXIT_SETUP_FAILURE, EXIT_TIMED_OUT, READY_FD_ENV, SIGNAL_EXIT_BASE,
};
pub use run::{build_profile, run};
