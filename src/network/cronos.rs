use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

use crate::config::{GenesisParams, NetworkConfig};
use crate::error::ConfigError;
use crate::network::{node_home, node_rpc, CRONOS_BINARY};
use crate::ports;
use crate::rpc::{ClientCache, CosmosCli, EvmClient, Transport};

/// Handle on a running Cronos devnet
///
/// Owns the loaded `config.json` and `genesis.json` plus a cached EVM client
/// for node 0. The cache uses interior mutability, so a handle is not `Sync`;
/// each test owns its own.
#[derive(Debug)]
pub struct Cronos {
    base_dir: PathBuf,
    config: NetworkConfig,
    genesis: GenesisParams,
    transport: Cell<Transport>,
    w3: RefCell<ClientCache>,
}

impl Cronos {
    /// Load the chain directory written by `pystarport init`, e.g. `<data>/cronos_777-1`
    pub fn open(base_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let base_dir = base_dir.into();
        let config = NetworkConfig::load(&base_dir)?;
        let genesis = GenesisParams::load(&base_dir)?;

        Ok(Self {
            base_dir,
            config,
            genesis,
            transport: Cell::new(Transport::Http),
            w3: RefCell::new(ClientCache::new()),
        })
    }

    /// A fresh handle over the same directory, with its own client cache
    pub fn reopen(&self) -> Result<Self, ConfigError> {
        Self::open(self.base_dir.clone())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn enable_auto_deployment(&self) -> bool {
        self.genesis.enable_auto_deployment
    }

    pub fn base_port(&self, index: usize) -> Result<u16, ConfigError> {
        self.config.base_port(index)
    }

    pub fn node_rpc(&self, index: usize) -> Result<String, ConfigError> {
        node_rpc(self.base_port(index)?)
    }

    pub fn w3_http_endpoint(&self, index: usize) -> Result<String, ConfigError> {
        let port = ports::evmrpc_port(self.base_port(index)?)?;
        Ok(format!("http://localhost:{}", port))
    }

    pub fn w3_ws_endpoint(&self, index: usize) -> Result<String, ConfigError> {
        let port = ports::evmrpc_ws_port(self.base_port(index)?)?;
        Ok(format!("ws://localhost:{}", port))
    }

    pub fn transport(&self) -> Transport {
        self.transport.get()
    }

    /// EVM client for node 0 over the current transport, built on first use
    pub fn w3(&self) -> Result<EvmClient, ConfigError> {
        let mode = self.transport.get();
        let endpoint = match mode {
            Transport::Http => self.w3_http_endpoint(0)?,
            Transport::WebSocket => self.w3_ws_endpoint(0)?,
        };

        let mut cache = self.w3.borrow_mut();
        Ok(cache
            .get_or_connect(mode, |mode| EvmClient::new(endpoint, mode))
            .clone())
    }

    /// Switch the EVM transport; the cached client is dropped
    pub fn use_websocket(&self, enabled: bool) {
        self.w3.borrow_mut().invalidate();
        self.transport.set(if enabled {
            Transport::WebSocket
        } else {
            Transport::Http
        });
    }

    pub fn cosmos_cli(&self, index: usize) -> Result<CosmosCli, ConfigError> {
        Ok(CosmosCli::new(
            node_home(&self.base_dir, index),
            self.node_rpc(index)?,
            CRONOS_BINARY,
        ))
    }

    #[cfg(test)]
    fn cached_transport(&self) -> Option<Transport> {
        self.w3.borrow().cached_mode()
    }
}
