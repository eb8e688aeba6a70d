//! JSONL request dispatch.
//!
//! Each connection carries exactly one request line and receives exactly one
//! response line:
//!
//! ```json
//! {"kind":"execute","script":"def main():\n    return 1\n","limits":{"wall_timeout_ms":1000}}
//! {"kind":"response","result":1,"stdout":"","error":null}
//! ```
//!
//! `{"kind":"health"}` reports slot capacity. Conditions that prevented a run
//! altogether come back as `unavailable`, and lines that do not parse as a
//! request come back as `bad_request`.
//!
//! While a script runs, a watcher thread reads the idle connection. A client
//! that closes its end cancels the run.

mod errors;
mod handler;
mod request;
mod response;
mod watcher;

pub(crate) use self::handler::DispatchConnectionHandler;
pub(crate) use self::request::request_limit;

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
