use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::error::Result;
use crate::network::Hermes;
use crate::setup::{boot, launcher, Devnet};

/// Options for starting the Hermes relayer
///
/// The relayer exposes no port to probe, so readiness is a fixed delay.
#[derive(Debug, Clone)]
pub struct HermesSetup {
    path: PathBuf,
    command: Vec<String>,
    startup_delay: Duration,
}

impl HermesSetup {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            command: vec!["start-hermes".to_string()],
            startup_delay: Duration::from_secs(4),
        }
    }

    /// Replace `start-hermes` with another program and leading arguments
    pub fn command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    pub fn startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = delay;
        self
    }

    pub fn start(self) -> Result<Devnet<Hermes>> {
        let process = launcher(&self.command)?.arg(&self.path).launch()?;

        boot(process, move |process| {
            debug!("Giving the relayer {:?} to start", self.startup_delay);
            std::thread::sleep(self.startup_delay);
            process.ensure_running()?;
            Ok(Hermes::open(self.path)?)
        })
    }
}

/// Start the relayer configured in `path`
pub fn setup_hermes(path: impl Into<PathBuf>) -> Result<Devnet<Hermes>> {
    HermesSetup::new(path).start()
}
