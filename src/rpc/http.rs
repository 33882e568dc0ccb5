//! HttpTransport - JSON-RPC 2.0 over HTTP (hardhat node, anvil, geth dev)

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use super::{RpcError, RpcResult, Transport};

pub struct HttpTransport {
    url: String,
    client: reqwest::Client,
    next_id: AtomicU64,
}

#[derive(Deserialize)]
struct Response {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), client: reqwest::Client::new(), next_id: AtomicU64::new(1) }
    }

    pub fn url(&self) -> &str { &self.url }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, method: &str, params: Value) -> RpcResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(%method, id, url = %self.url, "rpc request");
        let body = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params});
        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcError::transport(format!("{}: {}", self.url, e)))?;
        let response: Response = response
            .json()
            .await
            .map_err(|e| RpcError::transport(format!("{method}: invalid response: {e}")))?;
        match (response.error, response.result) {
            (Some(err), _) => Err(err),
            (None, Some(result)) => Ok(result),
            (None, None) => Ok(Value::Null),
        }
    }

    async fn pause(&self, duration: Duration) { tokio::time::sleep(duration).await }
}
