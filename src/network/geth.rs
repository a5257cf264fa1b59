use crate::rpc::EvmClient;

/// Handle on a standalone geth execution client
#[derive(Debug, Clone)]
pub struct Geth {
    w3: EvmClient,
}

impl Geth {
    pub fn new(w3: EvmClient) -> Self {
        Self { w3 }
    }

    /// Client for the HTTP JSON-RPC server geth serves on `base_port`
    pub fn connect(base_port: u16) -> Self {
        Self::new(EvmClient::http(format!("http://127.0.0.1:{}", base_port)))
    }

    pub fn w3(&self) -> &EvmClient {
        &self.w3
    }
}
