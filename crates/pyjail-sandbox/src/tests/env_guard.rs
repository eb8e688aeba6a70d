//! Environment snapshot and restoration.

use std::env;
use std::sync::{Mutex, MutexGuard, OnceLock};

use crate::env_guard::EnvGuard;

static ENV_MUTEX: OnceLock<Mutex<()>> = OnceLock::new();

fn lock_env() -> MutexGuard<'static, ()> {
    ENV_MUTEX
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[test]
fn restores_changed_and_removed_variables() {
    const CHANGED: &str = "PYJAIL_ENV_GUARD_CHANGED";
    const REMOVED: &str = "PYJAIL_ENV_GUARD_REMOVED";
    let _lock = lock_env();

    unsafe { env::set_var(CHANGED, "original") };
    unsafe { env::set_var(REMOVED, "keep") };
    let guard = EnvGuard::capture();

    unsafe { env::set_var(CHANGED, "mutated") };
    unsafe { env::remove_var(REMOVED) };
    drop(guard);

    assert_eq!(env::var(CHANGED).as_deref(), Ok("original"));
    assert_eq!(env::var(REMOVED).as_deref(), Ok("keep"));

    unsafe { env::remove_var(CHANGED) };
    unsafe { env::remove_var(REMOVED) };
}

#[test]
fn removes_variables_introduced_while_held() {
    const INTRODUCED: &str = "PYJAIL_ENV_GUARD_INTRODUCED";
    let _lock = lock_env();

    let guard = EnvGuard::capture();
    unsafe { env::set_var(INTRODUCED, "temporary") };
    guard.restore();

    assert!(env::var(INTRODUCED).is_err());
}
