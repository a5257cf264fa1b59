//! Error types for devnet operations
//!
//! This module defines error types for:
//! - `LaunchError` - An external command could not be started or failed
//! - `TimeoutError` - A port never accepted connections before the deadline
//! - `CleanupError` - Signalling or reaping a process group failed
//! - `ConfigError` - A network configuration file could not be loaded
//! - `RpcError` - A JSON-RPC call against an EVM endpoint failed
//! - `CliError` - A chain CLI invocation failed

use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// Errors raised while starting an external command
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The program is neither a path nor found on `PATH`
    #[error("Command not found: {program}")]
    NotFound { program: String },

    /// The OS refused to spawn the program
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program exited right after being spawned
    #[error("{program} exited immediately with {status}")]
    ExitedEarly { program: String, status: ExitStatus },

    /// A one-shot command ran to completion with a non-zero status
    #[error("{program} failed with {status}")]
    Failed { program: String, status: ExitStatus },

    /// The command override has no program
    #[error("Empty command: no program to launch")]
    EmptyCommand,

    /// The log file for the process could not be created
    #[error("Failed to open log file {}: {source}", path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A port did not accept connections before the deadline
#[derive(Debug, Error)]
#[error("Timed out after {timeout:?} waiting for {host}:{port}")]
pub struct TimeoutError {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
}

/// Errors raised while tearing a process group down
#[derive(Debug, Error)]
pub enum CleanupError {
    /// SIGTERM could not be delivered to the process group
    #[error("Failed to signal process group of {name} (PID: {pid}): {source}")]
    Signal {
        name: String,
        pid: u32,
        #[source]
        source: nix::Error,
    },

    /// The process could not be reaped
    #[error("Failed to wait for {name} (PID: {pid}): {source}")]
    Wait {
        name: String,
        pid: u32,
        #[source]
        source: std::io::Error,
    },

    /// The process was already released
    #[error("{name} was already released")]
    AlreadyReleased { name: String },
}

/// Errors raised while loading network configuration files
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse TOML in {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// No validator entry exists at the requested index
    #[error("No validator at index {index} ({count} configured)")]
    MissingValidator { index: usize, count: usize },

    /// A base port leaves no room for its derived ports
    #[error("Port {base_port} + {offset} is out of range")]
    PortOutOfRange { base_port: u16, offset: u16 },

    /// A required key is absent or has the wrong type
    #[error("Missing or invalid field: {0}")]
    MissingField(String),
}

/// Errors raised by the EVM JSON-RPC client
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] minreq::Error),

    #[error("Failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Websocket transport error: {0}")]
    WebSocket(#[from] Box<tungstenite::Error>),

    #[error("Invalid JSON-RPC response: {0}")]
    Json(#[from] serde_json::Error),

    /// The node answered with a JSON-RPC error object
    #[error("JSON-RPC error {code}: {message}")]
    Remote { code: i64, message: String },

    #[error("Unexpected JSON-RPC response: {0}")]
    Unexpected(String),
}

impl From<tungstenite::Error> for RpcError {
    fn from(err: tungstenite::Error) -> Self {
        RpcError::WebSocket(Box::new(err))
    }
}

/// Errors raised by the chain CLI wrapper
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Failed to run {binary}: {source}")]
    Io {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    /// The CLI exited with a non-zero status
    #[error("{binary} {args} failed with {status}: {stderr}")]
    Failed {
        binary: String,
        args: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("Invalid JSON output from {binary}: {source}")]
    Json {
        binary: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unexpected output from {binary}: {detail}")]
    Unexpected { binary: String, detail: String },
}

/// Any error surfaced by the harness
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    #[error(transparent)]
    Cleanup(#[from] CleanupError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Cli(#[from] CliError),

    /// Failure raised by a caller supplied hook
    #[error("Hook failed: {0}")]
    Hook(String),
}

pub type Result<T> = std::result::Result<T, Error>;
