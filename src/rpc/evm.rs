use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use serde_json::{json, Value};
use tracing::debug;
use tungstenite::client::IntoClientRequest;
use tungstenite::handshake::HandshakeError;
use tungstenite::Message;

use crate::error::RpcError;

/// How an [`EvmClient`] reaches its node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    #[default]
    Http,
    WebSocket,
}

/// Minimal Ethereum JSON-RPC client bound to one endpoint
///
/// Construction does no I/O. Websocket calls open a fresh connection per
/// request. Both transports give up on a node that stops answering once the
/// client timeout passes.
#[derive(Debug, Clone)]
pub struct EvmClient {
    endpoint: String,
    transport: Transport,
    timeout: Duration,
}

impl EvmClient {
    pub fn http(endpoint: impl Into<String>) -> Self {
        Self::new(endpoint, Transport::Http)
    }

    pub fn websocket(endpoint: impl Into<String>) -> Self {
        Self::new(endpoint, Transport::WebSocket)
    }

    pub fn new(endpoint: impl Into<String>, transport: Transport) -> Self {
        Self {
            endpoint: endpoint.into(),
            transport,
            timeout: Duration::from_secs(30),
        }
    }

    /// Timeout for a single call
    ///
    /// Websocket calls use it as given for connecting, reading and writing.
    /// HTTP calls only take whole seconds, so the value is rounded up there,
    /// with a minimum of one second.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// Send one JSON-RPC call and return its `result`
    pub fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        debug!("{} -> {}", method, self.endpoint);
        let response = match self.transport {
            Transport::Http => self.post(&payload)?,
            Transport::WebSocket => self.exchange(&payload)?,
        };

        into_result(response)
    }

    pub fn chain_id(&self) -> Result<u64, RpcError> {
        parse_quantity(&self.request("eth_chainId", json!([]))?)
    }

    pub fn block_number(&self) -> Result<u64, RpcError> {
        parse_quantity(&self.request("eth_blockNumber", json!([]))?)
    }

    pub fn accounts(&self) -> Result<Vec<String>, RpcError> {
        Ok(serde_json::from_value(self.request("eth_accounts", json!([]))?)?)
    }

    fn post(&self, payload: &Value) -> Result<Value, RpcError> {
        let response = minreq::post(self.endpoint.as_str())
            .with_timeout(http_timeout_secs(self.timeout))
            .with_json(payload)?
            .send()?;

        if response.status_code >= 400 {
            return Err(RpcError::Unexpected(format!(
                "HTTP {} {}",
                response.status_code, response.reason_phrase
            )));
        }

        Ok(response.json()?)
    }

    fn exchange(&self, payload: &Value) -> Result<Value, RpcError> {
        let request = self.endpoint.as_str().into_client_request()?;
        let stream = self.open_stream(
            request.uri().host().unwrap_or_default(),
            request.uri().port_u16().unwrap_or(80),
        )?;

        let (mut socket, _) = tungstenite::client(request, stream).map_err(|e| match e {
            HandshakeError::Failure(e) => RpcError::from(e),
            HandshakeError::Interrupted(_) => {
                RpcError::Unexpected("websocket handshake timed out".to_string())
            }
        })?;
        socket.send(Message::Text(payload.to_string()))?;

        let reply = loop {
            match socket.read()? {
                Message::Text(text) => break serde_json::from_str(&text)?,
                Message::Binary(bytes) => break serde_json::from_slice(&bytes)?,
                Message::Close(_) => {
                    return Err(RpcError::Unexpected(
                        "connection closed before reply".to_string(),
                    ))
                }
                _ => continue,
            }
        };

        socket.close(None).ok();
        Ok(reply)
    }

    /// TCP connection to the websocket endpoint with the client timeout applied
    fn open_stream(&self, host: &str, port: u16) -> Result<TcpStream, RpcError> {
        let connect_error = |source| RpcError::Connect {
            endpoint: self.endpoint.clone(),
            source,
        };

        let mut last_error = None;
        for addr in (host, port).to_socket_addrs().map_err(connect_error)? {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(stream) => {
                    stream
                        .set_read_timeout(Some(self.timeout))
                        .map_err(connect_error)?;
                    stream
                        .set_write_timeout(Some(self.timeout))
                        .map_err(connect_error)?;
                    return Ok(stream);
                }
                Err(e) => last_error = Some(e),
            }
        }

        Err(connect_error(last_error.unwrap_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses resolved")
        })))
    }
}

/// minreq timeouts are whole seconds; round up so short timeouts still apply
fn http_timeout_secs(timeout: Duration) -> u64 {
    let secs = timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0);
    secs.max(1)
}

fn into_result(mut response: Value) -> Result<Value, RpcError> {
    if let Some(error) = response.get("error").filter(|e| !e.is_null()) {
        return Err(RpcError::Remote {
            code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        });
    }

    match response.get_mut("result") {
        Some(result) => Ok(result.take()),
        None => Err(RpcError::Unexpected(response.to_string())),
    }
}

/// Decode a hex `QUANTITY` such as `"0x309"`
pub fn parse_quantity(value: &Value) -> Result<u64, RpcError> {
    let text = value
        .as_str()
        .ok_or_else(|| RpcError::Unexpected(format!("expected hex string, got {}", value)))?;
    let digits = text.strip_prefix("0x").unwrap_or(text);
    u64::from_str_radix(digits, 16)
        .map_err(|_| RpcError::Unexpected(format!("invalid quantity {}", text)))
}
