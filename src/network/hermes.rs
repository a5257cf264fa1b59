use std::path::{Path, PathBuf};

use crate::config::RelayerConfig;
use crate::error::ConfigError;
use crate::network::{node_home, node_rpc, CRONOS_BINARY};
use crate::rpc::CosmosCli;

/// Handle on a running Hermes relayer
#[derive(Debug, Clone)]
pub struct Hermes {
    base_dir: PathBuf,
    config: RelayerConfig,
}

impl Hermes {
    /// Load `config.toml` from the relayer directory
    pub fn open(base_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let base_dir = base_dir.into();
        let config = RelayerConfig::load(&base_dir)?;
        Ok(Self { base_dir, config })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn config(&self) -> &RelayerConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        self.config.path()
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
            CRONOS_BINARY,
        ))
    }

    /// IDs of the chains the relayer connects
    pub fn chain_ids(&self) -> Vec<String> {
        self.config.chains().into_iter().map(|c| c.id).collect()
    }
}
