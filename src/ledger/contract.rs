//! ContractLedger - registry contract over JSON-RPC
//!
//! Writes go through `eth_sendTransaction` so the wallet (or an unlocked node
//! account) signs them; reads are `eth_call` against `latest`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{Connector, Ledger, LedgerError, LedgerResult, PendingTx, Receipt};
use crate::core::abi;
use crate::core::chain::Address;
use crate::core::entry::{Entry, RegistryRecord};
use crate::rpc::{from_result, Transport};

pub struct ContractLedger<T> {
    transport: Arc<T>,
    signer: Address,
    contract: Address,
    poll_interval: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: String,
    #[serde(default)]
    block_number: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    logs: Vec<RawLog>,
}

#[derive(Debug, Deserialize)]
struct RawLog {
    address: String,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    data: String,
}

impl<T: Transport> ContractLedger<T> {
    pub fn new(transport: Arc<T>, signer: Address, contract: Address, poll_interval: Duration) -> Self {
        Self { transport, signer, contract, poll_interval }
    }

    pub fn signer(&self) -> &Address { &self.signer }
    pub fn contract(&self) -> &Address { &self.contract }

    async fn call(&self, calldata: Vec<u8>) -> LedgerResult<Vec<u8>> {
        let params = json!([{"to": self.contract, "data": abi::encode_hex(&calldata)}, "latest"]);
        let raw: String = from_result("eth_call", self.transport.request("eth_call", params).await?)?;
        Ok(abi::decode_hex(&raw)?)
    }

    /// The mined transaction stands even when its log is unreadable.
    fn registered_entry(&self, logs: &[RawLog]) -> Option<Entry> {
        for log in logs {
            if Address::parse(&log.address).ok().as_ref() != Some(&self.contract) {
                continue;
            }
            match decode_log(log) {
                Ok(Some(entry)) => return Some(entry),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "undecodable registry log"),
            }
        }
        None
    }
}

fn decode_log(log: &RawLog) -> Result<Option<Entry>, abi::AbiError> {
    let topics = log
        .topics
        .iter()
        .map(|t| abi::decode_hex(t))
        .collect::<Result<Vec<_>, _>>()?;
    abi::decode_car_registered(&topics, &abi::decode_hex(&log.data)?)
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl<T: Transport> Ledger for ContractLedger<T> {
    async fn append(&self, owner_name: &str, car_model: &str) -> LedgerResult<PendingTx> {
        let data = abi::encode_register_car(owner_name, car_model);
        let params = json!([{"from": self.signer, "to": self.contract, "data": abi::encode_hex(&data)}]);
        let hash: String = from_result("eth_sendTransaction", self.transport.request("eth_sendTransaction", params).await?)?;
        info!(%hash, signer = %self.signer.short(), "registration submitted");
        Ok(PendingTx { hash })
    }

    async fn confirm(&self, pending: &PendingTx) -> LedgerResult<Receipt> {
        let raw = loop {
            let value = self
                .transport
                .request("eth_getTransactionReceipt", json!([pending.hash]))
                .await?;
            if !value.is_null() {
                break from_result::<RawReceipt>("eth_getTransactionReceipt", value)?;
            }
            debug!(hash = %pending.hash, "receipt not yet available");
            self.transport.pause(self.poll_interval).await;
        };

        if raw.status.as_deref() == Some("0x0") {
            return Err(LedgerError::Reverted(format!("transaction {} reverted", raw.transaction_hash)));
        }
        let block_number = raw
            .block_number
            .as_deref()
            .and_then(|b| u64::from_str_radix(b.trim_start_matches("0x"), 16).ok());
        let registered = self.registered_entry(&raw.logs);
        info!(hash = %raw.transaction_hash, block = ?block_number, "registration confirmed");
        Ok(Receipt { transaction_hash: raw.transaction_hash, block_number, registered })
    }

    async fn read_all(&self) -> LedgerResult<Vec<RegistryRecord>> {
        Ok(abi::decode_records(&self.call(abi::encode_get_all_cars()).await?)?)
    }

    async fn count(&self) -> LedgerResult<u64> {
        Ok(abi::decode_u64(&self.call(abi::encode_get_car_count()).await?)?)
    }
}

/// Hands out `ContractLedger`s that share one transport.
pub struct ContractConnector<T> {
    transport: Arc<T>,
    poll_interval: Duration,
}

impl<T: Transport> ContractConnector<T> {
    pub fn new(transport: Arc<T>, poll_interval: Duration) -> Self { Self { transport, poll_interval } }
}

impl<T: Transport> Connector for ContractConnector<T> {
    type Ledger = ContractLedger<T>;

    fn connect(&self, signer: &Address, contract: &Address) -> ContractLedger<T> {
        ContractLedger::new(self.transport.clone(), signer.clone(), contract.clone(), self.poll_interval)
    }
}
