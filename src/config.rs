//! Readers for the files written by the devnet init tooling
//!
//! - `NetworkConfig` - `config.json`, validator base ports
//! - `GenesisParams` - the cronos module params in `genesis.json`
//! - `RelayerConfig` - the relayer `config.toml`
//!
//! Only the keys the harness needs are parsed; everything else is ignored.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Read a JSON document into `T`
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = read(path)?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a TOML document into `T`
pub fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = read(path)?;
    toml::from_str(&content).map_err(|source| ConfigError::Toml {
        path: path.to_path_buf(),
        source,
    })
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Validator layout of one chain, as written to `config.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub validators: Vec<ValidatorConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    pub base_port: u16,
}

impl NetworkConfig {
    pub const FILE_NAME: &'static str = "config.json";

    /// Load `config.json` from a chain directory
    pub fn load(chain_dir: &Path) -> Result<Self, ConfigError> {
        read_json(&chain_dir.join(Self::FILE_NAME))
    }

    pub fn base_port(&self, index: usize) -> Result<u16, ConfigError> {
        self.validators
            .get(index)
            .map(|v| v.base_port)
            .ok_or(ConfigError::MissingValidator {
                index,
                count: self.validators.len(),
            })
    }
}

/// The parts of `genesis.json` the harness reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenesisParams {
    /// Whether the chain deploys ERC20 contracts for new IBC denoms on its own
    pub enable_auto_deployment: bool,
}

#[derive(Deserialize)]
struct Genesis {
    app_state: AppState,
}

#[derive(Deserialize)]
struct AppState {
    cronos: CronosState,
}

#[derive(Deserialize)]
struct CronosState {
    params: CronosParams,
}

#[derive(Deserialize)]
struct CronosParams {
    enable_auto_deployment: bool,
}

impl GenesisParams {
    pub const FILE_NAME: &'static str = "genesis.json";

    /// Load `genesis.json` from a chain directory
    pub fn load(chain_dir: &Path) -> Result<Self, ConfigError> {
        let genesis: Genesis = read_json(&chain_dir.join(Self::FILE_NAME))?;
        Ok(Self {
            enable_auto_deployment: genesis.app_state.cronos.params.enable_auto_deployment,
        })
    }
}

/// Relayer `config.toml`, kept as a document so unknown sections survive
#[derive(Debug, Clone)]
pub struct RelayerConfig {
    path: PathBuf,
    document: toml::Table,
}

/// One `[[chains]]` entry of the relayer config
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayerChain {
    pub id: String,
    pub rpc_addr: Option<String>,
}

impl RelayerConfig {
    pub const FILE_NAME: &'static str = "config.toml";

    /// Load `config.toml` from the relayer directory
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(Self::FILE_NAME);
        let document = read_toml(&path)?;
        Ok(Self { path, document })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &toml::Table {
        &self.document
    }

    /// `validators[index].base_port`
    pub fn base_port(&self, index: usize) -> Result<u16, ConfigError> {
        let validators = self
            .document
            .get("validators")
            .and_then(toml::Value::as_array)
            .ok_or_else(|| ConfigError::MissingField("validators".to_string()))?;

        let validator = validators.get(index).ok_or(ConfigError::MissingValidator {
            index,
            count: validators.len(),
        })?;

        validator
            .get("base_port")
            .and_then(toml::Value::as_integer)
            .and_then(|port| u16::try_from(port).ok())
            .ok_or_else(|| ConfigError::MissingField(format!("validators[{}].base_port", index)))
    }

    /// Chains the relayer is configured to connect
    pub fn chains(&self) -> Vec<RelayerChain> {
        self.document
            .get("chains")
            .and_then(toml::Value::as_array)
            .map(|chains| {
                chains
                    .iter()
                    .filter_map(|chain| {
                        let id = chain.get("id")?.as_str()?.to_string();
                        let rpc_addr = chain
                            .get("rpc_addr")
                            .and_then(toml::Value::as_str)
                            .map(str::to_string);
                        Some(RelayerChain { id, rpc_addr })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}
