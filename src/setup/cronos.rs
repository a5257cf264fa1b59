use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;

use crate::error::Result;
use crate::network::Cronos;
use crate::ports;
use crate::setup::{boot, launcher, project_root, wait_until_listening, Devnet};
use crate::wait::DEFAULT_PORT_TIMEOUT;

/// Chain directory `pystarport` creates for the Cronos devnet
pub const CRONOS_CHAIN_ID: &str = "cronos_777-1";

type PostInit = Box<dyn FnOnce(&Path, u16, &Path) -> Result<()>>;

/// Which devnet definition to boot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DevnetVariant {
    #[default]
    Default,
    Experimental,
}

/// Devnet definition for `variant`, relative to `root`
///
/// With auto deployment disabled both variants share the same definition.
pub fn devnet_config(root: &Path, variant: DevnetVariant, enable_auto_deployment: bool) -> PathBuf {
    if !enable_auto_deployment {
        return root
            .join("integration_tests")
            .join("configs")
            .join("disable_auto_deployment.yaml");
    }
    match variant {
        DevnetVariant::Default => root.join("scripts").join("cronos-devnet.yaml"),
        DevnetVariant::Experimental => root.join("scripts").join("cronos-experimental-devnet.yaml"),
    }
}

/// Options for booting a Cronos devnet with `pystarport`
pub struct CronosSetup {
    path: PathBuf,
    base_port: u16,
    config: PathBuf,
    chain_binary: Option<String>,
    chain_id: String,
    command: Vec<String>,
    port_timeout: Duration,
    post_init: Option<PostInit>,
}

impl CronosSetup {
    /// Boot the devnet described by `config` into `path`, ports from `base_port`
    pub fn new(path: impl Into<PathBuf>, base_port: u16, config: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            base_port,
            config: config.into(),
            chain_binary: None,
            chain_id: CRONOS_CHAIN_ID.to_string(),
            command: vec!["pystarport".to_string()],
            port_timeout: DEFAULT_PORT_TIMEOUT,
            post_init: None,
        }
    }

    /// Chain binary `pystarport` drives instead of its default (`--cmd`)
    pub fn chain_binary(mut self, binary: impl Into<String>) -> Self {
        self.chain_binary = Some(binary.into());
        self
    }

    pub fn chain_id(mut self, chain_id: impl Into<String>) -> Self {
        self.chain_id = chain_id.into();
        self
    }

    /// Replace `pystarport` with another program and leading arguments
    pub fn command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    pub fn port_timeout(mut self, timeout: Duration) -> Self {
        self.port_timeout = timeout;
        self
    }

    /// Hook run after `init` and before `start`, given the data path, base
    /// port and devnet config
    pub fn post_init<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(&Path, u16, &Path) -> Result<()> + 'static,
    {
        self.post_init = Some(Box::new(hook));
        self
    }

    /// Initialise, start and wait for the devnet
    pub fn start(self) -> Result<Devnet<Cronos>> {
        // The whole validator block must fit before pystarport lays it out
        ports::port_at(self.base_port, ports::MAX_OFFSET)?;
        let evmrpc_port = ports::evmrpc_port(self.base_port)?;
        let evmrpc_ws_port = ports::evmrpc_ws_port(self.base_port)?;

        let mut init = launcher(&self.command)?;
        if let Some(binary) = &self.chain_binary {
            init = init.args(["--cmd", binary.as_str()]);
        }
        init.arg("init")
            .arg("--config")
            .arg(&self.config)
            .arg("--data")
            .arg(&self.path)
            .arg("--base_port")
            .arg(self.base_port.to_string())
            .arg("--no_remove")
            .run()?;

        if let Some(hook) = self.post_init {
            info!("Running post-init hook for {}", self.path.display());
            hook(&self.path, self.base_port, &self.config)?;
        }

        let process = launcher(&self.command)?
            .arg("start")
            .arg("--data")
            .arg(&self.path)
            .arg("--quiet")
            .launch()?;

        let chain_dir = self.path.join(&self.chain_id);
        let timeout = self.port_timeout;
        boot(process, move |process| {
            wait_until_listening(process, evmrpc_port, timeout)?;
            wait_until_listening(process, evmrpc_ws_port, timeout)?;
            Ok(Cronos::open(chain_dir)?)
        })
    }
}

/// Boot a Cronos devnet from a custom devnet config
pub fn setup_custom_cronos(setup: CronosSetup) -> Result<Devnet<Cronos>> {
    setup.start()
}

/// Boot the standard Cronos devnet
pub fn setup_cronos(path: impl Into<PathBuf>, base_port: u16, enable_auto_deployment: bool) -> Result<Devnet<Cronos>> {
    let config = devnet_config(&project_root(), DevnetVariant::Default, enable_auto_deployment);
    CronosSetup::new(path, base_port, config).start()
}

/// Boot the Cronos devnet with experimental features enabled
pub fn setup_cronos_experimental(
    path: impl Into<PathBuf>,
    base_port: u16,
    enable_auto_deployment: bool,
) -> Result<Devnet<Cronos>> {
    let config = devnet_config(&project_root(), DevnetVariant::Experimental, enable_auto_deployment);
    CronosSetup::new(path, base_port, config).start()
}
