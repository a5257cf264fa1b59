//! Thin clients for the endpoints a devnet exposes

mod cosmos_cli;
mod evm;

pub use cosmos_cli::CosmosCli;
pub use evm::{parse_quantity, EvmClient, Transport};

use tracing::debug;

/// Lazily built [`EvmClient`] remembered together with the transport it was built for
///
/// Asking for a different transport than the cached one replaces the client.
#[derive(Debug, Default)]
pub struct ClientCache {
    cached: Option<(Transport, EvmClient)>,
}

impl ClientCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached client for `mode`, building it with `build` if needed
    pub fn get_or_connect<F>(&mut self, mode: Transport, build: F) -> &EvmClient
    where
        F: FnOnce(Transport) -> EvmClient,
    {
        if matches!(&self.cached, Some((cached, _)) if *cached != mode) {
            debug!("Transport switched to {:?}, dropping cached client", mode);
            self.cached = None;
        }

        let (_, client) = self.cached.get_or_insert_with(|| (mode, build(mode)));
        client
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    /// Transport of the cached client, if one is cached
    pub fn cached_mode(&self) -> Option<Transport> {
        self.cached.as_ref().map(|(mode, _)| *mode)
    }
}
