//! Environment snapshot restored after `birdcage` strips variables.

use std::collections::BTreeMap;
use std::env;
use std::ffi::OsString;

/// Puts the process environment back the way it was when captured.
///
/// `birdcage` clears non-whitelisted variables from the calling process
/// while activating; the guard undoes that on drop.
#[derive(Debug)]
pub(crate) struct EnvGuard {
    snapshot: BTreeMap<OsString, OsString>,
}

impl EnvGuard {
    pub(crate) fn capture() -> Self {
        Self {
            snapshot: env::vars_os().collect(),
        }
    }

    pub(crate) fn restore(&self) {
        let introduced: Vec<OsString> = env::vars_os()
            .map(|(key, _)| key)
            .filter(|key| !self.snapshot.contains_key(key))
            .collect();
        // Environment mutation is `unsafe` in edition 2024.
        for key in introduced {
            unsafe { env::remove_var(key) };
        }
        for (key, value) in &self.snapshot {
            if env::var_os(key).as_ref() != Some(value) {
                unsafe { env::set_var(key, value) };
            }
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        self.restore();
    }
}
