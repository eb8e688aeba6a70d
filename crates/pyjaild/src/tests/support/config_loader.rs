//! Configuration loaders for success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};

use pyjail_config::{Config, SocketEndpoint};

use super::toolchain::Toolchain;
use crate::bootstrap::ConfigLoader;

/// Loader that points the daemon at a [`Toolchain`].
pub struct TestConfigLoader {
    toolchain: Arc<Toolchain>,
    listen: SocketEndpoint,
}

impl TestConfigLoader {
    /// Listens on an ephemeral loopback port.
    #[must_use]
    pub fn new(toolchain: Arc<Toolchain>) -> Self {
        Self {
            toolchain,
            listen: SocketEndpoint::tcp("127.0.0.1", 0),
        }
    }

    /// Listens on a Unix socket inside the toolchain directory.
    #[must_use]
    pub fn on_unix_socket(mut self) -> Self {
        self.listen = SocketEndpoint::unix(self.toolchain.path("run/pyjaild.sock"));
        self
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.toolchain.config(self.listen.clone()))
    }
}

/// Loader that fails by passing an unparsable listen endpoint.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load_from_iter([
            OsString::from("pyjaild"),
            OsString::from("--listen"),
            OsString::from("invalid://socket"),
        ])
    }
}
