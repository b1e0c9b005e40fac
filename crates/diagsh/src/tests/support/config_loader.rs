//! Configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;

use diagsh_config::{Config, SessionMode, SocketEndpoint};

use crate::bootstrap::ConfigLoader;

/// Loader that places the listen socket under a temporary directory.
#[derive(Clone)]
pub struct TestConfigLoader {
    socket_dir: Arc<TempDir>,
    mode: SessionMode,
}

impl TestConfigLoader {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temporary directory for socket");
        Self {
            socket_dir: Arc::new(dir),
            mode: SessionMode::Socket,
        }
    }

    /// Returns a loader serving `mode`.
    pub fn with_mode(mut self, mode: SessionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Path of the Unix socket the shell will listen on.
    pub fn socket_path(&self) -> String {
        let path = self.socket_dir.path().join("diagsh.sock");
        path.to_str()
            .expect("temporary socket path was not valid UTF-8")
            .to_owned()
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            listen_socket: SocketEndpoint::unix(self.socket_path()),
            mode: self.mode,
            ..Config::default()
        })
    }
}

/// Loader that fails by passing an invalid endpoint on the command line.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("diagsh"),
            OsString::from("--target"),
            OsString::from("invalid://target"),
        ];
        Config::load_from_iter(args)
    }
}
