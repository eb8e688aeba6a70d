//! Crate-level tests for the validator.

mod unit;
