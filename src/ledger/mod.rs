//! Ledger module - the on-chain car registry as seen from the session
//!
//! The registry contract is append-only:
//!
//! ```text
//! registerCar(ownerName, carModel)   → emits CarRegistered(carId, ownerName, carModel)
//! getAllCars() → (ownerName, carModel)[]
//! getCarCount() → uint256
//! ```
//!
//! A `Connector` builds a `Ledger` handle bound to one signer and one
//! contract address. The session discards the handle whenever the account or
//! network changes and asks the connector for a fresh one.

mod contract;
mod memory;

pub use contract::{ContractConnector, ContractLedger};
pub use memory::{MemoryConnector, MemoryLedger, MemoryRegistry};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::abi::AbiError;
use crate::core::chain::Address;
use crate::core::entry::{Entry, RegistryRecord};
use crate::rpc::{MaybeSendSync, RpcError};

/// A write accepted into the pending pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTx {
    pub hash: String,
}

/// A confirmed write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub transaction_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    /// Decoded `CarRegistered` notification, when the receipt carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registered: Option<Entry>,
}

impl Receipt {
    /// `0x` plus the first eight hex digits of the hash.
    pub fn short_hash(&self) -> &str {
        self.transaction_hash.get(..10).unwrap_or(&self.transaction_hash)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("rejected by signer: {0}")]
    Rejected(String),
    #[error("{0}")]
    Reverted(String),
    #[error(transparent)]
    Rpc(RpcError),
    #[error("malformed ledger data: {0}")]
    Decode(String),
}

impl From<RpcError> for LedgerError {
    fn from(err: RpcError) -> Self {
        if err.is_user_rejection() { LedgerError::Rejected(err.message) } else { LedgerError::Rpc(err) }
    }
}

impl From<AbiError> for LedgerError {
    fn from(err: AbiError) -> Self { LedgerError::Decode(err.to_string()) }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait Ledger: MaybeSendSync {
    /// Phase one of a write: hand the append to the signer and the pending pool.
    async fn append(&self, owner_name: &str, car_model: &str) -> LedgerResult<PendingTx>;
    /// Phase two: wait, without a deadline, until the write is final.
    async fn confirm(&self, pending: &PendingTx) -> LedgerResult<Receipt>;
    async fn read_all(&self) -> LedgerResult<Vec<RegistryRecord>>;
    async fn count(&self) -> LedgerResult<u64>;
}

/// Builds ledger handles bound to a signer and a contract address.
pub trait Connector: MaybeSendSync {
    type Ledger: Ledger;
    fn connect(&self, signer: &Address, contract: &Address) -> Self::Ledger;
}
