//! JSON-RPC transport seam shared by the wallet and the ledger.
//!
//! The same request/response shape serves both a browser wallet
//! (`window.ethereum.request`, EIP-1193) and a plain node endpoint
//! (JSON-RPC 2.0 over HTTP).
//!
//! ```text
//! ProviderWallet<T> ──┐
//!                     ├──▶ Transport ──▶ HttpTransport   (native)
//! ContractLedger<T> ──┘               └─▶ Eip1193Transport (wasm)
//! ```

#[cfg(feature = "native")]
mod http;

#[cfg(feature = "native")]
pub use http::HttpTransport;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// EIP-1193: the user rejected the request.
pub const USER_REJECTED: i64 = 4001;
/// EIP-1193: the provider does not support the method.
pub const UNSUPPORTED_METHOD: i64 = 4200;
/// EIP-3326: the wallet does not know the requested chain.
pub const UNRECOGNIZED_CHAIN: i64 = 4902;
/// Local code for failures below the protocol (connection refused, bad JSON).
pub const TRANSPORT_FAILURE: i64 = -32099;

/// Error object returned by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{message} (code {code})")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), data: None }
    }

    pub fn transport(message: impl Into<String>) -> Self { Self::new(TRANSPORT_FAILURE, message) }

    /// Wallet-side rejection. ethers surfaces the same condition as `ACTION_REJECTED`.
    pub fn is_user_rejection(&self) -> bool {
        self.code == USER_REJECTED || self.message.contains("ACTION_REJECTED")
    }

    pub fn is_unrecognized_chain(&self) -> bool { self.code == UNRECOGNIZED_CHAIN }
}

pub type RpcResult<T> = Result<T, RpcError>;

/// `Send + Sync` on native targets, nothing on wasm where JS handles are
/// single-threaded.
#[cfg(not(target_arch = "wasm32"))]
pub trait MaybeSendSync: Send + Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync + ?Sized> MaybeSendSync for T {}

#[cfg(target_arch = "wasm32")]
pub trait MaybeSendSync {}
#[cfg(target_arch = "wasm32")]
impl<T: ?Sized> MaybeSendSync for T {}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait Transport: MaybeSendSync {
    /// Issue one request and return its `result` member.
    async fn request(&self, method: &str, params: Value) -> RpcResult<Value>;

    /// Suspend the caller; used between receipt polls.
    async fn pause(&self, duration: Duration);
}

/// Decode a `result` into a typed value, reporting malformed payloads as RPC errors.
pub fn from_result<T: serde::de::DeserializeOwned>(method: &str, value: Value) -> RpcResult<T> {
    serde_json::from_value(value)
        .map_err(|e| RpcError::transport(format!("{method}: unexpected result: {e}")))
}
