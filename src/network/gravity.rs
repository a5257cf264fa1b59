use std::path::Path;

use serde_json::Value;

use crate::config::read_json;
use crate::error::ConfigError;
use crate::network::{Cronos, Geth};

/// A contract deployed on an EVM chain
#[derive(Debug, Clone, PartialEq)]
pub struct Contract {
    pub address: String,
    pub abi: Value,
}

impl Contract {
    pub fn new(address: impl Into<String>, abi: Value) -> Self {
        Self {
            address: address.into(),
            abi,
        }
    }

    /// Take the ABI from a compiled artifact (`{"abi": [...], ...}`)
    pub fn from_artifact(address: impl Into<String>, artifact: &Path) -> Result<Self, ConfigError> {
        let mut artifact: Value = read_json(artifact)?;
        let abi = artifact
            .get_mut("abi")
            .map(Value::take)
            .ok_or_else(|| ConfigError::MissingField("abi".to_string()))?;
        Ok(Self::new(address, abi))
    }
}

/// Cronos and geth joined by the gravity bridge contract deployed on geth
///
/// Only borrows the two handles; each network keeps its own teardown scope.
#[derive(Debug, Clone)]
pub struct GravityBridge<'a> {
    pub cronos: &'a Cronos,
    pub geth: &'a Geth,
    pub contract: Contract,
}

impl<'a> GravityBridge<'a> {
    pub fn new(cronos: &'a Cronos, geth: &'a Geth, contract: Contract) -> Self {
        Self {
            cronos,
            geth,
            contract,
        }
    }
}
