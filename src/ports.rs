//! Port layout shared with `pystarport`.
//!
//! Each validator gets a contiguous block of ports starting at its base port.
//! The offsets below are fixed by the tool that writes the node configs and
//! must not drift from it.

use crate::error::ConfigError;

/// Highest offset used within a validator's port block
pub const MAX_OFFSET: u16 = 7;

/// Highest base port whose whole block fits below 65536
pub const MAX_BASE_PORT: u16 = u16::MAX - MAX_OFFSET;

/// `base_port + offset`, or an error when that runs past 65535
pub fn port_at(base_port: u16, offset: u16) -> Result<u16, ConfigError> {
    base_port
        .checked_add(offset)
        .ok_or(ConfigError::PortOutOfRange { base_port, offset })
}

/// EVM JSON-RPC (HTTP) port
pub fn evmrpc_port(base_port: u16) -> Result<u16, ConfigError> {
    port_at(base_port, 1)
}

/// EVM JSON-RPC websocket port
pub fn evmrpc_ws_port(base_port: u16) -> Result<u16, ConfigError> {
    port_at(base_port, 2)
}

/// Tendermint P2P port
pub fn p2p_port(base_port: u16) -> Result<u16, ConfigError> {
    port_at(base_port, 6)
}

/// Tendermint RPC port
pub fn rpc_port(base_port: u16) -> Result<u16, ConfigError> {
    port_at(base_port, MAX_OFFSET)
}
