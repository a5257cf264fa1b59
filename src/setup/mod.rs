//! Boot flows for each devnet
//!
//! Every flow launches its long-running process, waits until it is reachable
//! and hands back a [`Devnet`] guard. The guard owns the process: dropping it,
//! returning early with `?` or panicking tears the process group down.

pub mod chainmain;
pub mod cronos;
pub mod geth;
pub mod hermes;

pub use chainmain::{setup_chainmain, ChainmainSetup};
pub use cronos::{
    devnet_config, setup_cronos, setup_cronos_experimental, setup_custom_cronos, CronosSetup,
    DevnetVariant,
};
pub use geth::{setup_geth, GethSetup};
pub use hermes::{setup_hermes, HermesSetup};

use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use tracing::warn;

use crate::error::{CleanupError, Error, LaunchError, Result};
use crate::process::{ProcessLauncher, ScopedProcess};
use crate::wait::PortWaiter;

/// Host the harness probes when waiting for devnet ports
pub const LOCALHOST: &str = "127.0.0.1";

/// A booted devnet: the handle the test uses plus the process backing it
pub struct Devnet<H> {
    // Declared first so the handle is dropped before the process is torn down
    handle: H,
    process: ScopedProcess,
}

impl<H> Devnet<H> {
    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub fn process(&self) -> &ScopedProcess {
        &self.process
    }

    pub fn pid(&self) -> u32 {
        self.process.pid()
    }

    /// Run `body` against the handle, then tear the devnet down
    ///
    /// Teardown runs whatever the body returns; a teardown failure is logged
    /// and never replaces the body's result.
    pub fn run<T, F>(self, body: F) -> T
    where
        F: FnOnce(&mut H) -> T,
    {
        let Devnet { mut handle, process } = self;
        process.scope(|_| body(&mut handle))
    }

    /// Tear the devnet down now and report how the process ended
    pub fn teardown(self) -> std::result::Result<ExitStatus, CleanupError> {
        self.process.release()
    }
}

impl<H> Deref for Devnet<H> {
    type Target = H;

    fn deref(&self) -> &H {
        &self.handle
    }
}

impl<H> DerefMut for Devnet<H> {
    fn deref_mut(&mut self) -> &mut H {
        &mut self.handle
    }
}

/// Finish booting: run `ready` and pair its handle with the process
///
/// If `ready` fails the process is torn down before the error is returned.
fn boot<H, F>(mut process: ScopedProcess, ready: F) -> Result<Devnet<H>>
where
    F: FnOnce(&mut ScopedProcess) -> Result<H>,
{
    match ready(&mut process) {
        Ok(handle) => Ok(Devnet { handle, process }),
        Err(e) => {
            warn!("{} did not come up: {}", process.name(), e);
            if let Err(cleanup) = process.release() {
                warn!("{}", cleanup);
            }
            Err(e)
        }
    }
}

/// Wait for `port` on [`LOCALHOST`] while `process` keeps running
///
/// Fails with [`LaunchError::ExitedEarly`] as soon as the process exits.
fn wait_until_listening(process: &mut ScopedProcess, port: u16, timeout: Duration) -> Result<()> {
    PortWaiter::default().wait_while(LOCALHOST, port, timeout, || {
        process.ensure_running().map_err(Error::from)
    })
}

/// Launcher for `command`: the program followed by any leading arguments
fn launcher(command: &[String]) -> std::result::Result<ProcessLauncher, LaunchError> {
    let (program, args) = command.split_first().ok_or(LaunchError::EmptyCommand)?;
    Ok(ProcessLauncher::new(program.as_str()).args(args))
}

/// Root the devnet config paths are relative to
///
/// `DEVNET_PROJECT_ROOT` when set, the working directory otherwise.
pub fn project_root() -> PathBuf {
    std::env::var_os("DEVNET_PROJECT_ROOT")
        .map(PathBuf::from)
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launcher_splits_program_and_leading_args() {
        let command = vec!["sh".to_string(), "fake-start.sh".to_string()];
        let launcher = launcher(&command).unwrap().arg("--quiet");
        assert_eq!(launcher.program(), "sh");
        assert_eq!(launcher.command_line(), "sh fake-start.sh --quiet");
    }

    #[test]
    fn test_empty_command() {
        assert!(matches!(launcher(&[]), Err(LaunchError::EmptyCommand)));
    }

    #[test]
    fn test_boot_failure_releases_process() {
        let process = ProcessLauncher::new("sleep").arg("30").launch().unwrap();
        let pid = process.pid();

        let result: Result<Devnet<()>> = boot(process, |_| Err(Error::Hook("not ready".into())));
        assert!(result.is_err());
        assert!(!std::path::Path::new(&format!("/proc/{}", pid)).exists());
    }

    #[test]
    fn test_wait_stops_when_process_exits() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut process = ProcessLauncher::new("sh")
            .args(["-c", "exit 1"])
            .launch()
            .unwrap();

        let start = std::time::Instant::now();
        let err = wait_until_listening(&mut process, port, Duration::from_secs(10)).unwrap_err();
        assert!(matches!(err, Error::Launch(LaunchError::ExitedEarly { .. })));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_run_returns_body_output() {
        let process = ProcessLauncher::new("sleep").arg("30").launch().unwrap();
        let devnet = boot(process, |_| Ok(41)).unwrap();
        assert_eq!(*devnet, 41);

        let answer = devnet.run(|value| {
            *value += 1;
            *value
        });
        assert_eq!(answer, 42);
    }

    #[test]
    fn test_teardown_reports_exit_status() {
        let process = ProcessLauncher::new("sleep").arg("30").launch().unwrap();
        let devnet = boot(process, |_| Ok("handle")).unwrap();
        assert_eq!(devnet.handle(), &"handle");

        let status = devnet.teardown().unwrap();
        assert!(!status.success());
    }
}
