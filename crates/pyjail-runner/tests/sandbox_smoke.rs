//! End-to-end run through the real `pyjail-cage` binary and `birdcage`.
//!
//! Needs unprivileged user namespaces, `/usr/bin/python3`, and a built
//! `pyjail-cage` (found next to the test binary, or named by
//! `PYJAIL_CAGE_BIN`). Run with `cargo test -- --ignored`.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use camino::Utf8PathBuf;
use pyjail_config::Config;
use pyjail_runner::{CageExecutor, CancelToken, ScriptRunner};
use serde_json::json;
use tempfile::TempDir;

const PYTHON: &str = "/usr/bin/python3";
const SYSTEM_READ_ONLY: &[&str] = &["/usr", "/lib", "/lib64", "/etc"];

fn cage_binary() -> Option<PathBuf> {
    if let Some(path) = env::var_os("PYJAIL_CAGE_BIN") {
        return Some(PathBuf::from(path));
    }
    let test_binary = env::current_exe().ok()?;
    let candidate = test_binary.parent()?.parent()?.join("pyjail-cage");
    candidate.is_file().then_some(candidate)
}

fn utf8(path: PathBuf) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(path).expect("UTF-8 path")
}

fn write_profile(dir: &Path) -> PathBuf {
    let quoted: Vec<String> = SYSTEM_READ_ONLY
        .iter()
        .filter(|path| Path::new(path).exists())
        .map(|path| format!("\"{path}\""))
        .collect();
    let profile = dir.join("cage-profile.toml");
    fs::write(
        &profile,
        format!("read_only_paths = [{}]\nenvironment = [\"LANG\"]\n", quoted.join(", ")),
    )
    .expect("write profile");
    profile
}

#[test]
#[ignore = "requires user namespaces, python3, and a built pyjail-cage binary"]
fn hello_from_sandbox_runs_under_the_real_cage() {
    let Some(cage) = cage_binary() else {
        return;
    };
    if !Path::new(PYTHON).exists() {
        return;
    }
    let dir = TempDir::new().expect("temp dir");
    let scratch_root = dir.path().join("scratch");
    fs::create_dir(&scratch_root).expect("scratch root");

    let mut config = Config::default();
    config.isolation_tool = utf8(cage);
    config.isolation_profile = utf8(write_profile(dir.path()));
    config.interpreter = Utf8PathBuf::from(PYTHON);
    config.scratch_root = utf8(scratch_root.clone());
    // RLIMIT_NPROC counts every task of the invoking account, not just this run.
    config.max_processes = 0;

    let runner =
        ScriptRunner::new(&config, CageExecutor::from_config(&config)).expect("script runner");
    let script = "def main():\n    print(\"hello from sandbox\")\n    return {\"message\": \"success\"}\n";
    let response = runner
        .execute(script, None, &CancelToken::new())
        .expect("sandbox infrastructure is usable");

    assert_eq!(
        serde_json::to_value(&response).expect("serialise"),
        json!({
            "result": {"message": "success"},
            "stdout": "hello from sandbox\n",
            "error": null
        })
    );
    assert_eq!(
        fs::read_dir(&scratch_root).expect("read scratch root").count(),
        0,
        "run directory removed"
    );
}
