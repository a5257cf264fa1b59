use std::path::PathBuf;
use std::time::Duration;

use crate::error::Result;
use crate::network::Chainmain;
use crate::setup::{boot, launcher, wait_until_listening, Devnet};
use crate::wait::DEFAULT_PORT_TIMEOUT;

/// Chain directory `start-chainmain` creates
pub const CHAINMAIN_CHAIN_ID: &str = "chainmain-1";

/// Options for booting the chain-main sidecar chain
#[derive(Debug, Clone)]
pub struct ChainmainSetup {
    path: PathBuf,
    base_port: u16,
    chain_id: String,
    command: Vec<String>,
    port_timeout: Duration,
}

impl ChainmainSetup {
    pub fn new(path: impl Into<PathBuf>, base_port: u16) -> Self {
        Self {
            path: path.into(),
            base_port,
            chain_id: CHAINMAIN_CHAIN_ID.to_string(),
            command: vec!["start-chainmain".to_string()],
            port_timeout: DEFAULT_PORT_TIMEOUT,
        }
    }

    pub fn chain_id(mut self, chain_id: impl Into<String>) -> Self {
        self.chain_id = chain_id.into();
        self
    }

    /// Replace `start-chainmain` with another program and leading arguments
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

    pub fn start(self) -> Result<Devnet<Chainmain>> {
        let process = launcher(&self.command)?
            .arg(&self.path)
            .arg("--base_port")
            .arg(self.base_port.to_string())
            .launch()?;

        let chain_dir = self.path.join(&self.chain_id);
        boot(process, move |process| {
            wait_until_listening(process, self.base_port, self.port_timeout)?;
            Ok(Chainmain::open(chain_dir)?)
        })
    }
}

/// Boot chain-main into `path` with ports from `base_port`
pub fn setup_chainmain(path: impl Into<PathBuf>, base_port: u16) -> Result<Devnet<Chainmain>> {
    ChainmainSetup::new(path, base_port).start()
}
