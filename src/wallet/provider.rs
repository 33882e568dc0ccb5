//! ProviderWallet - Wallet over any JSON-RPC transport

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use super::{parse_accounts, parse_chain_id, Wallet};
use crate::core::chain::{Address, ChainId, NetworkParams};
use crate::rpc::{RpcResult, Transport};

pub struct ProviderWallet<T> {
    transport: Arc<T>,
}

impl<T: Transport> ProviderWallet<T> {
    pub fn new(transport: Arc<T>) -> Self { Self { transport } }

    pub fn transport(&self) -> Arc<T> { self.transport.clone() }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl<T: Transport> Wallet for ProviderWallet<T> {
    async fn request_accounts(&self) -> RpcResult<Vec<Address>> {
        parse_accounts(self.transport.request("eth_requestAccounts", json!([])).await?)
    }

    async fn chain_id(&self) -> RpcResult<ChainId> {
        parse_chain_id(self.transport.request("eth_chainId", json!([])).await?)
    }

    async fn switch_chain(&self, chain: ChainId) -> RpcResult<()> {
        debug!(chain = %chain, "requesting network switch");
        self.transport
            .request("wallet_switchEthereumChain", json!([{"chainId": chain.to_hex()}]))
            .await?;
        Ok(())
    }

    async fn add_chain(&self, params: &NetworkParams) -> RpcResult<()> {
        debug!(chain = %params.chain_id, name = %params.chain_name, "requesting network registration");
        self.transport
            .request("wallet_addEthereumChain", json!([params.to_wallet_params()]))
            .await?;
        Ok(())
    }
}
