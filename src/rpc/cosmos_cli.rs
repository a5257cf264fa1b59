use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;
use tracing::debug;

use crate::error::CliError;

/// Runs a chain binary (`cronosd`, `chain-maind`) against one node
///
/// `data_dir` is the node's home directory and `node_rpc` its Tendermint RPC
/// address, e.g. `tcp://127.0.0.1:26657`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CosmosCli {
    data_dir: PathBuf,
    node_rpc: String,
    binary: String,
}

impl CosmosCli {
    pub fn new(data_dir: impl Into<PathBuf>, node_rpc: impl Into<String>, binary: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            node_rpc: node_rpc.into(),
            binary: binary.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn node_rpc(&self) -> &str {
        &self.node_rpc
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Run the binary with `args` as given and return trimmed stdout
    pub fn raw<I, S>(&self, args: I) -> Result<String, CliError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
        let (stdout, _) = self.exec(&args)?;
        Ok(stdout)
    }

    /// Run a query against the node and parse its JSON output
    pub fn query<I, S>(&self, args: I) -> Result<Value, CliError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args = self.query_args(args);
        let (stdout, _) = self.exec(&args)?;
        self.parse_json(&stdout)
    }

    /// `status` of the node
    pub fn status(&self) -> Result<Value, CliError> {
        let args = self.node_args(["status"]);
        let (stdout, stderr) = self.exec(&args)?;
        // Older SDK releases print status to stderr
        if stdout.is_empty() {
            self.parse_json(&stderr)
        } else {
            self.parse_json(&stdout)
        }
    }

    pub fn block_height(&self) -> Result<u64, CliError> {
        let status = self.status()?;
        latest_block_height(&status).ok_or_else(|| CliError::Unexpected {
            binary: self.binary.clone(),
            detail: "status has no latest_block_height".to_string(),
        })
    }

    /// Bech32 address of a key in the node's test keyring
    pub fn address(&self, name: &str) -> Result<String, CliError> {
        let home = self.data_dir.as_os_str();
        self.raw([
            OsStr::new("keys"),
            OsStr::new("show"),
            OsStr::new(name),
            OsStr::new("-a"),
            OsStr::new("--home"),
            home,
            OsStr::new("--keyring-backend"),
            OsStr::new("test"),
        ])
    }

    /// Bank balance of `address` in `denom`, zero when the denom is absent
    pub fn balance(&self, address: &str, denom: &str) -> Result<u128, CliError> {
        let balances = self.query(["query", "bank", "balances", address])?;
        coin_amount(&balances, denom).ok_or_else(|| CliError::Unexpected {
            binary: self.binary.clone(),
            detail: format!("invalid balance for {}", denom),
        })
    }

    fn node_args<I, S>(&self, args: I) -> Vec<OsString>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut out: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
        out.push("--node".into());
        out.push(self.node_rpc.clone().into());
        out.push("--home".into());
        out.push(self.data_dir.clone().into_os_string());
        out
    }

    fn query_args<I, S>(&self, args: I) -> Vec<OsString>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut out = self.node_args(args);
        out.push("--output".into());
        out.push("json".into());
        out
    }

    fn exec(&self, args: &[OsString]) -> Result<(String, String), CliError> {
        let rendered = args
            .iter()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");
        debug!("{} {}", self.binary, rendered);

        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .map_err(|source| CliError::Io {
                binary: self.binary.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            return Err(CliError::Failed {
                binary: self.binary.clone(),
                args: rendered,
                status: output.status,
                stderr,
            });
        }

        Ok((stdout, stderr))
    }

    fn parse_json(&self, text: &str) -> Result<Value, CliError> {
        serde_json::from_str(text).map_err(|source| CliError::Json {
            binary: self.binary.clone(),
            source,
        })
    }
}

fn latest_block_height(status: &Value) -> Option<u64> {
    // Key casing differs between Tendermint and CometBFT releases
    let sync_info = status.get("SyncInfo").or_else(|| status.get("sync_info"))?;
    let height = sync_info.get("latest_block_height")?;
    match height {
        Value::String(s) => s.parse().ok(),
        other => other.as_u64(),
    }
}

fn coin_amount(balances: &Value, denom: &str) -> Option<u128> {
    let coins = balances.get("balances")?.as_array()?;
    match coins
        .iter()
        .find(|coin| coin.get("denom").and_then(Value::as_str) == Some(denom))
    {
        Some(coin) => coin.get("amount")?.as_str()?.parse().ok(),
        None => Some(0),
    }
}
