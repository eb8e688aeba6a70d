//! Test suites for the pyjail daemon.

mod support;
