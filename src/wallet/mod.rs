//! Wallet module - account authorization and chain selection
//!
//! # Architecture
//!
//! ```text
//! SessionManager
//!     │
//!     ├── Wallet (trait): accounts, chain id, switch, add
//!     │       │
//!     │       └── ProviderWallet<T: Transport>
//!     │               ├── eth_requestAccounts
//!     │               ├── eth_chainId
//!     │               ├── wallet_switchEthereumChain
//!     │               └── wallet_addEthereumChain
//!     │
//!     └── WalletEvent ◀── accountsChanged / chainChanged subscriptions
//!                     ◀── EventPoller (transports without subscriptions)
//! ```

mod poller;
mod provider;

pub use poller::EventPoller;
pub use provider::ProviderWallet;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::chain::{Address, ChainId, NetworkParams};
use crate::rpc::{MaybeSendSync, RpcError, RpcResult};

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait Wallet: MaybeSendSync {
    /// Ask the user to authorize accounts. The first one is the active signer.
    async fn request_accounts(&self) -> RpcResult<Vec<Address>>;
    async fn chain_id(&self) -> RpcResult<ChainId>;
    async fn switch_chain(&self, chain: ChainId) -> RpcResult<()>;
    async fn add_chain(&self, params: &NetworkParams) -> RpcResult<()>;
}

/// Notifications raised by the wallet outside the session's control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(ChainId),
}

impl WalletEvent {
    /// Parse a provider notification payload. Unknown events and malformed
    /// payloads are errors, never an empty account list.
    pub fn from_notification(event: &str, payload: Value) -> RpcResult<Self> {
        match event {
            "accountsChanged" => parse_accounts(payload).map(WalletEvent::AccountsChanged),
            "chainChanged" => parse_chain_id(payload).map(WalletEvent::ChainChanged),
            other => Err(RpcError::transport(format!("unknown wallet event: {other}"))),
        }
    }
}

pub(crate) fn parse_accounts(value: Value) -> RpcResult<Vec<Address>> {
    let raw: Vec<String> = crate::rpc::from_result("accounts", value)?;
    raw.iter()
        .map(|a| Address::parse(a).map_err(|e| RpcError::transport(e.to_string())))
        .collect()
}

pub(crate) fn parse_chain_id(value: Value) -> RpcResult<ChainId> {
    match value {
        Value::String(s) => ChainId::parse(&s).map_err(|e| RpcError::transport(e.to_string())),
        Value::Number(n) => n
            .as_u64()
            .map(ChainId)
            .ok_or_else(|| RpcError::transport(format!("invalid chain id: {n}"))),
        other => Err(RpcError::transport(format!("invalid chain id: {other}"))),
    }
}
