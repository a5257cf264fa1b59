use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};

use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use tracing::{debug, info, warn};

use crate::error::{CleanupError, LaunchError};

/// Builder for an external command started by the harness
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: String,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
    current_dir: Option<PathBuf>,
    log_file: Option<PathBuf>,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            current_dir: None,
            log_file: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_owned()));
        self
    }

    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.envs
            .push((key.as_ref().to_owned(), value.as_ref().to_owned()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Send stdout and stderr to `path` instead of inheriting them
    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// The command line as it would be typed in a shell
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().map(|a| a.to_string_lossy().into_owned()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Start the command as the leader of a new process group
    ///
    /// The returned handle signals the whole group and reaps the leader when
    /// it is released or dropped.
    pub fn launch(&self) -> Result<ScopedProcess, LaunchError> {
        let mut cmd = self.command()?;
        cmd.process_group(0);

        info!("{}", self.command_line());
        let mut child = cmd.spawn().map_err(|source| LaunchError::Spawn {
            program: self.program.clone(),
            source,
        })?;
        let pid = child.id();

        match child.try_wait() {
            Ok(Some(status)) => {
                // The leader is reaped, but anything it forked may still hold the group
                if let Err(e) = signal_group(pid, Signal::SIGTERM) {
                    warn!(
                        "Failed to signal process group of {} (PID: {}): {}",
                        self.program, pid, e
                    );
                }
                return Err(LaunchError::ExitedEarly {
                    program: self.program.clone(),
                    status,
                });
            }
            Ok(None) => {}
            Err(e) => warn!("Could not poll {} (PID: {}): {}", self.program, pid, e),
        }

        match &self.log_file {
            Some(log) => info!(
                "Started {} (PID: {}), logging to: {}",
                self.program,
                pid,
                log.display()
            ),
            None => debug!("Started {} (PID: {})", self.program, pid),
        }

        Ok(ScopedProcess {
            name: self.program.clone(),
            pid,
            child: Some(child),
            log_file: self.log_file.clone(),
        })
    }

    /// Run the command to completion, failing on a non-zero exit status
    pub fn run(&self) -> Result<(), LaunchError> {
        let mut cmd = self.command()?;

        info!("{}", self.command_line());
        let status = cmd.status().map_err(|source| LaunchError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        if status.success() {
            debug!("{} finished", self.program);
            Ok(())
        } else {
            Err(LaunchError::Failed {
                program: self.program.clone(),
                status,
            })
        }
    }

    fn command(&self) -> Result<Command, LaunchError> {
        let resolved = which::which(&self.program).map_err(|_| LaunchError::NotFound {
            program: self.program.clone(),
        })?;

        let mut cmd = Command::new(resolved);
        cmd.args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null());

        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }

        if let Some(path) = &self.log_file {
            let log = File::create(path).map_err(|source| LaunchError::LogFile {
                path: path.clone(),
                source,
            })?;
            let stderr_log = log.try_clone().map_err(|source| LaunchError::LogFile {
                path: path.clone(),
                source,
            })?;
            cmd.stdout(Stdio::from(log)).stderr(Stdio::from(stderr_log));
        }

        Ok(cmd)
    }
}

/// A running process group owned by the current scope
///
/// Released exactly once: either explicitly through [`ScopedProcess::release`]
/// or [`ScopedProcess::scope`], or implicitly on drop (including unwinding).
#[derive(Debug)]
pub struct ScopedProcess {
    name: String,
    pid: u32,
    child: Option<Child>,
    log_file: Option<PathBuf>,
}

impl ScopedProcess {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    /// Whether the group leader is still running. Never sends a signal.
    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Fail with [`LaunchError::ExitedEarly`] once the group leader has exited
    ///
    /// Boot flows call this while waiting for readiness, so a start script
    /// that dies is reported at once instead of at the port deadline.
    pub fn ensure_running(&mut self) -> Result<(), LaunchError> {
        let Some(child) = self.child.as_mut() else {
            return Ok(());
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                warn!("{} (PID: {}) exited with {}", self.name, self.pid, status);
                Err(LaunchError::ExitedEarly {
                    program: self.name.clone(),
                    status,
                })
            }
            Ok(None) => Ok(()),
            Err(e) => {
                debug!("Could not poll {} (PID: {}): {}", self.name, self.pid, e);
                Ok(())
            }
        }
    }

    /// Terminate the process group and reap the leader
    pub fn release(mut self) -> Result<ExitStatus, CleanupError> {
        self.terminate()
    }

    /// Run `body` against the process, then release it whatever the body returned
    ///
    /// A cleanup failure is logged and never replaces the body's result.
    pub fn scope<T, F>(mut self, body: F) -> T
    where
        F: FnOnce(&mut ScopedProcess) -> T,
    {
        let output = body(&mut self);
        if let Err(e) = self.terminate() {
            warn!("Cleanup of {} failed: {}", self.name, e);
        }
        output
    }

    fn terminate(&mut self) -> Result<ExitStatus, CleanupError> {
        let mut child = self.child.take().ok_or_else(|| CleanupError::AlreadyReleased {
            name: self.name.clone(),
        })?;

        debug!("Stopping {} (PID: {})", self.name, self.pid);
        let signalled = signal_group(self.pid, Signal::SIGTERM).map_err(|source| {
            CleanupError::Signal {
                name: self.name.clone(),
                pid: self.pid,
                source,
            }
        });

        if let Err(e) = &signalled {
            // Without the group signal the leader may never exit; kill it directly
            warn!("{}", e);
            if let Err(e) = child.kill() {
                warn!("Error killing {}: {}", self.name, e);
            }
        }

        let status = child.wait().map_err(|source| CleanupError::Wait {
            name: self.name.clone(),
            pid: self.pid,
            source,
        })?;
        info!("{} exited with {}", self.name, status);

        signalled.map(|_| status)
    }
}

impl Drop for ScopedProcess {
    fn drop(&mut self) {
        if self.child.is_none() {
            return;
        }
        if let Err(e) = self.terminate() {
            warn!("Cleanup of {} failed: {}", self.name, e);
        }
    }
}

/// Signal every member of the group led by `pid`. A group that no longer
/// exists is not an error.
fn signal_group(pid: u32, signal: Signal) -> Result<(), nix::Error> {
    match killpg(Pid::from_raw(pid as i32), signal) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(e),
    }
}
