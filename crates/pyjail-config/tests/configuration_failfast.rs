//! Startup must stop on configuration the daemon cannot honour.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use once_cell::sync::Lazy;
use ortho_config::{OrthoConfig, OrthoError};
use rstest::{fixture, rstest};
use tempfile::TempDir;

use pyjail_config::Config;

static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Points `PYJAIL_CONFIG_PATH` at a file for the lifetime of the value.
struct ConfigPathVar {
    _lock: MutexGuard<'static, ()>,
}

impl ConfigPathVar {
    fn pointing_at(path: &Path) -> Self {
        let lock = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        // Environment mutation is `unsafe` in edition 2024; `Drop` undoes it.
        unsafe { std::env::set_var("PYJAIL_CONFIG_PATH", path) };
        Self { _lock: lock }
    }
}

impl Drop for ConfigPathVar {
    fn drop(&mut self) {
        unsafe { std::env::remove_var("PYJAIL_CONFIG_PATH") };
    }
}

#[fixture]
fn workdir() -> TempDir {
    TempDir::new().expect("temp dir")
}

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write config file");
    path
}

fn file_errors(error: &OrthoError) -> Vec<PathBuf> {
    match error {
        OrthoError::Aggregate(errors) => errors.iter().flat_map(file_errors).collect(),
        OrthoError::File { path, .. } => vec![path.clone()],
        _ => Vec::new(),
    }
}

#[rstest]
fn broken_files_from_every_layer_are_reported(workdir: TempDir) {
    let from_flag = write(&workdir, "flag.toml", "wall_timeout_ms = = 10");
    let from_env = write(
        &workdir,
        "env.toml",
        r#"listen = { transport = "tcp", port = "eighty" }"#,
    );
    let _var = ConfigPathVar::pointing_at(&from_env);

    let error = Config::load_from_iter([
        OsString::from("pyjaild"),
        OsString::from("--config-path"),
        from_flag.clone().into_os_string(),
    ])
    .expect_err("both files are malformed");

    let reported = file_errors(&error);
    assert!(reported.contains(&from_flag), "{reported:?}");
    assert!(reported.contains(&from_env), "{reported:?}");
}

#[rstest]
#[case::non_numeric_limit(&["--cpu-time-seconds", "lots"])]
#[case::negative_memory(&["--memory-bytes", "-1"])]
#[case::unknown_transport(&["--listen", "http://127.0.0.1:8081"])]
#[case::portless_tcp(&["--listen", "tcp://127.0.0.1"])]
#[case::unknown_log_format(&["--log-format", "yaml"])]
fn unusable_flags_stop_startup(#[case] flags: &[&str]) {
    let args = std::iter::once("pyjaild").chain(flags.iter().copied());
    assert!(Config::load_from_iter(args).is_err(), "{flags:?} was accepted");
}
