//! Read-only facades over a running devnet
//!
//! Each handle loads the configuration written by the init tooling once and
//! derives endpoints from the validator base ports.

mod chainmain;
mod cronos;
mod geth;
mod gravity;
mod hermes;

pub use chainmain::Chainmain;
pub use cronos::Cronos;
pub use geth::Geth;
pub use gravity::{Contract, GravityBridge};
pub use hermes::Hermes;

use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::ports;

/// CLI binary of the Cronos chain
pub const CRONOS_BINARY: &str = "cronosd";
/// CLI binary of the chain-main sidecar chain
pub const CHAINMAIN_BINARY: &str = "chain-maind";

/// Tendermint RPC address of the node at `base_port`
pub fn node_rpc(base_port: u16) -> Result<String, ConfigError> {
    Ok(format!("tcp://127.0.0.1:{}", ports::rpc_port(base_port)?))
}

/// Home directory of validator `index` inside a chain directory
pub fn node_home(chain_dir: &Path, index: usize) -> PathBuf {
    chain_dir.join(format!("node{}", index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_rpc() {
        assert_eq!(node_rpc(26650).unwrap(), "tcp://127.0.0.1:26657");
        assert!(matches!(
            node_rpc(65530),
            Err(ConfigError::PortOutOfRange { .. })
        ));
    }

    #[test]
    fn test_node_home() {
        assert_eq!(
            node_home(Path::new("/data/chainmain-1"), 1),
            PathBuf::from("/data/chainmain-1/node1")
        );
    }
}
