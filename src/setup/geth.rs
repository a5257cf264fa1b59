use std::path::PathBuf;
use std::time::Duration;

use crate::error::Result;
use crate::network::Geth;
use crate::ports;
use crate::setup::{boot, launcher, wait_until_listening, Devnet};
use crate::wait::DEFAULT_PORT_TIMEOUT;

/// Options for starting a standalone geth node
///
/// geth serves HTTP JSON-RPC on the base port and P2P on the next one. Its
/// output goes to `geth.log` in the data directory.
#[derive(Debug, Clone)]
pub struct GethSetup {
    path: PathBuf,
    base_port: u16,
    command: Vec<String>,
    port_timeout: Duration,
}

impl GethSetup {
    pub fn new(path: impl Into<PathBuf>, base_port: u16) -> Self {
        Self {
            path: path.into(),
            base_port,
            command: vec!["start-geth".to_string()],
            port_timeout: DEFAULT_PORT_TIMEOUT,
        }
    }

    /// Replace `start-geth` with another program and leading arguments
    pub fn command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    pub fn port_timeout(mut self, timeout: Duration) -> Self {
        self.port_timeout = timeout;
        self
    }

    pub fn log_path(&self) -> PathBuf {
        self.path.join("geth.log")
    }

    pub fn start(self) -> Result<Devnet<Geth>> {
        let p2p_port = ports::port_at(self.base_port, 1)?;
        let process = launcher(&self.command)?
            .arg(&self.path)
            .arg("--http.port")
            .arg(self.base_port.to_string())
            .arg("--port")
            .arg(p2p_port.to_string())
            .log_file(self.log_path())
            .launch()?;

        boot(process, move |process| {
            wait_until_listening(process, self.base_port, self.port_timeout)?;
            Ok(Geth::connect(self.base_port))
        })
    }
}

/// Start geth in `path` serving JSON-RPC on `base_port`
pub fn setup_geth(path: impl Into<PathBuf>, base_port: u16) -> Result<Devnet<Geth>> {
    GethSetup::new(path, base_port).start()
}
