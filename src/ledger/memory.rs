//! MemoryRegistry - in-process registry with the contract's semantics
//!
//! Appends are held as pending until confirmed, confirmation mines them in
//! order and broadcasts the `CarRegistered` entry to subscribers.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

use super::{Connector, Ledger, LedgerError, LedgerResult, PendingTx, Receipt};
use crate::core::abi::{encode_hex, keccak256};
use crate::core::chain::Address;
use crate::core::entry::{Entry, RegistryRecord};
use crate::rpc::RpcError;

#[derive(Default)]
struct RegistryState {
    records: Vec<RegistryRecord>,
    pending: HashMap<String, RegistryRecord>,
    nonce: u64,
    block: u64,
}

#[derive(Clone)]
pub struct MemoryRegistry {
    state: Arc<Mutex<RegistryState>>,
    events: broadcast::Sender<Entry>,
}

impl Default for MemoryRegistry {
    fn default() -> Self { Self::new() }
}

impl MemoryRegistry {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self { state: Arc::new(Mutex::new(RegistryState::default())), events }
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// `CarRegistered` notifications, one per confirmed append.
    pub fn subscribe(&self) -> broadcast::Receiver<Entry> { self.events.subscribe() }

    pub fn records(&self) -> Vec<RegistryRecord> { self.state().records.clone() }
    pub fn len(&self) -> usize { self.state().records.len() }
    pub fn is_empty(&self) -> bool { self.state().records.is_empty() }
    pub fn pending_count(&self) -> usize { self.state().pending.len() }

    fn submit(&self, signer: &Address, record: RegistryRecord) -> PendingTx {
        let mut state = self.state();
        state.nonce += 1;
        let seed = format!("{}:{}", signer, state.nonce);
        let hash = encode_hex(&keccak256(seed.as_bytes()));
        state.pending.insert(hash.clone(), record);
        PendingTx { hash }
    }

    fn mine(&self, hash: &str) -> LedgerResult<Receipt> {
        let (entry, block) = {
            let mut state = self.state();
            let record = state
                .pending
                .remove(hash)
                .ok_or_else(|| LedgerError::Rpc(RpcError::new(-32000, format!("unknown transaction {hash}"))))?;
            let entry = Entry {
                index: state.records.len() as u64,
                owner_name: record.owner_name.clone(),
                car_model: record.car_model.clone(),
            };
            state.records.push(record);
            state.block += 1;
            (entry, state.block)
        };
        let _ = self.events.send(entry.clone());
        Ok(Receipt { transaction_hash: hash.to_string(), block_number: Some(block), registered: Some(entry) })
    }
}

/// Handle onto a `MemoryRegistry` bound to one signer.
pub struct MemoryLedger {
    registry: MemoryRegistry,
    signer: Address,
}

impl MemoryLedger {
    pub fn new(registry: MemoryRegistry, signer: Address) -> Self { Self { registry, signer } }
    pub fn signer(&self) -> &Address { &self.signer }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl Ledger for MemoryLedger {
    async fn append(&self, owner_name: &str, car_model: &str) -> LedgerResult<PendingTx> {
        Ok(self.registry.submit(&self.signer, RegistryRecord::new(owner_name, car_model)))
    }

    async fn confirm(&self, pending: &PendingTx) -> LedgerResult<Receipt> { self.registry.mine(&pending.hash) }

    async fn read_all(&self) -> LedgerResult<Vec<RegistryRecord>> { Ok(self.registry.records()) }

    async fn count(&self) -> LedgerResult<u64> { Ok(self.registry.len() as u64) }
}

#[derive(Clone, Default)]
pub struct MemoryConnector {
    registry: MemoryRegistry,
}

impl MemoryConnector {
    pub fn new(registry: MemoryRegistry) -> Self { Self { registry } }
    pub fn registry(&self) -> &MemoryRegistry { &self.registry }
}

impl Connector for MemoryConnector {
    type Ledger = MemoryLedger;

    fn connect(&self, signer: &Address, _contract: &Address) -> MemoryLedger {
        MemoryLedger::new(self.registry.clone(), signer.clone())
    }
}
