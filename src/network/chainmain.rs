use std::path::{Path, PathBuf};

use crate::config::NetworkConfig;
use crate::error::ConfigError;
use crate::network::{node_home, node_rpc, CHAINMAIN_BINARY};
use crate::rpc::CosmosCli;

/// Handle on a running chain-main sidecar chain
#[derive(Debug, Clone)]
pub struct Chainmain {
    base_dir: PathBuf,
    config: NetworkConfig,
}

impl Chainmain {
    /// Load the chain directory, e.g. `<data>/chainmain-1`
    pub fn open(base_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let base_dir = base_dir.into();
        let config = NetworkConfig::load(&base_dir)?;
        Ok(Self { base_dir, config })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn base_port(&self, index: usize) -> Result<u16, ConfigError> {
        self.config.base_port(index)
    }

    pub fn node_rpc(&self, index: usize) -> Result<String, ConfigError> {
        node_rpc(self.base_port(index)?)
    }

    pub fn cosmos_cli(&self, index: usize) -> Result<CosmosCli, ConfigError> {
        Ok(CosmosCli::new(
            node_home(&self.base_dir, index),
            self.node_rpc(index)?,
            CHAINMAIN_BINARY,
        ))
    }
}
