//! devnet-harness - local blockchain test network library
//!
//! This library boots Cronos, chain-main, Hermes and geth development
//! networks for integration tests and guarantees their processes are torn
//! down again.
//!
//! - `process` - launching commands in their own process group
//! - `wait` - polling TCP ports until a service accepts connections
//! - `ports` - the base port offsets shared with `pystarport`
//! - `config` - readers for the files the init tooling writes
//! - `rpc` - EVM JSON-RPC client and chain CLI wrapper
//! - `network` - read-only handles on running networks
//! - `setup` - boot flows returning scoped [`Devnet`] guards

pub mod config;
pub mod error;
pub mod network;
pub mod ports;
pub mod process;
pub mod rpc;
pub mod setup;
pub mod wait;

// Re-export commonly used types
pub use error::{
    CleanupError, CliError, ConfigError, Error, LaunchError, Result, RpcError, TimeoutError,
};
pub use network::{Chainmain, Contract, Cronos, Geth, GravityBridge, Hermes};
pub use process::{ProcessLauncher, ScopedProcess};
pub use rpc::{ClientCache, CosmosCli, EvmClient, Transport};
pub use setup::{
    setup_chainmain, setup_cronos, setup_cronos_experimental, setup_custom_cronos, setup_geth,
    setup_hermes, ChainmainSetup, CronosSetup, Devnet, GethSetup, HermesSetup,
};
pub use wait::{wait_for_port, PortWaiter};
