//! TCP readiness polling

use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::TimeoutError;

/// Default deadline when waiting for a devnet service to come up
pub const DEFAULT_PORT_TIMEOUT: Duration = Duration::from_secs(40);

/// Polls a TCP port until it accepts a connection
#[derive(Debug, Clone)]
pub struct PortWaiter {
    /// Upper bound for a single connect attempt
    pub attempt_timeout: Duration,
    /// Pause between failed attempts
    pub poll_interval: Duration,
}

impl Default for PortWaiter {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_millis(500),
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl PortWaiter {
    /// Wait until `host:port` accepts a TCP connection or `timeout` elapses
    pub fn wait(&self, host: &str, port: u16, timeout: Duration) -> Result<(), TimeoutError> {
        self.wait_while(host, port, timeout, || Ok(()))
    }

    /// Like [`PortWaiter::wait`], but runs `check` before every attempt
    ///
    /// The first error `check` returns ends the wait and is returned as is.
    pub fn wait_while<E, F>(
        &self,
        host: &str,
        port: u16,
        timeout: Duration,
        mut check: F,
    ) -> Result<(), E>
    where
        E: From<TimeoutError>,
        F: FnMut() -> Result<(), E>,
    {
        let deadline = Instant::now() + timeout;
        let mut attempts = 0u32;

        loop {
            check()?;

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                debug!("Gave up on {}:{} after {} attempts", host, port, attempts);
                return Err(TimeoutError {
                    host: host.to_string(),
                    port,
                    timeout,
                }
                .into());
            }

            attempts += 1;
            let attempt_timeout = self.attempt_timeout.min(remaining);
            if connect(host, port, attempt_timeout) {
                debug!("{}:{} accepted after {} attempts", host, port, attempts);
                return Ok(());
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            std::thread::sleep(self.poll_interval.min(remaining));
        }
    }
}

/// Wait until `host:port` accepts a TCP connection or `timeout` elapses
pub fn wait_for_port(host: &str, port: u16, timeout: Duration) -> Result<(), TimeoutError> {
    PortWaiter::default().wait(host, port, timeout)
}

/// Wait for a port on the loopback interface with the default deadline
pub fn wait_for_local_port(port: u16) -> Result<(), TimeoutError> {
    wait_for_port("127.0.0.1", port, DEFAULT_PORT_TIMEOUT)
}

/// Try every address `host` resolves to; `localhost` may yield IPv6 first
fn connect(host: &str, port: u16, timeout: Duration) -> bool {
    match (host, port).to_socket_addrs() {
        Ok(addrs) => addrs
            .into_iter()
            .any(|addr| TcpStream::connect_timeout(&addr, timeout).is_ok()),
        Err(_) => false,
    }
}
