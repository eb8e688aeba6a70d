//! Stand-in sandbox toolchain that passes the preflight checks.

use std::fs;
use std::os::unix::fs::PermissionsExt;

use camino::Utf8PathBuf;
use tempfile::TempDir;

use pyjail_config::{Config, SocketEndpoint};

/// Temporary directory holding a fake isolation tool, profile, and
/// interpreter, plus the scratch root.
pub struct Toolchain {
    dir: TempDir,
}

impl Toolchain {
    /// Creates the files with the permissions preflight expects.
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("toolchain directory");
        for (name, mode) in [
            ("pyjail-cage", 0o755),
            ("cage-profile.toml", 0o644),
            ("python3", 0o755),
        ] {
            let path = dir.path().join(name);
            fs::write(&path, "#!/bin/sh\nexit 0\n").expect("write toolchain file");
            fs::set_permissions(&path, fs::Permissions::from_mode(mode)).expect("chmod");
        }
        fs::create_dir(dir.path().join("scratch")).expect("scratch root");
        Self { dir }
    }

    /// Path of `name` inside the toolchain directory.
    #[must_use]
    pub fn path(&self, name: &str) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.dir.path().join(name)).expect("utf8 toolchain path")
    }

    /// Deletes one of the toolchain files.
    pub fn remove(&self, name: &str) {
        fs::remove_file(self.path(name)).expect("remove toolchain file");
    }

    /// Configuration pointing at this toolchain and listening on `listen`.
    #[must_use]
    pub fn config(&self, listen: SocketEndpoint) -> Config {
        Config {
            listen,
            log_filter: "warn".to_owned(),
            isolation_tool: self.path("pyjail-cage"),
            isolation_profile: self.path("cage-profile.toml"),
            interpreter: self.path("python3"),
            scratch_root: self.path("scratch"),
            ..Config::default()
        }
    }
}

impl Default for Toolchain {
    fn default() -> Self {
        Self::new()
    }
}
