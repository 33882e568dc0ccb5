//! Test doubles shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use vehreg::rpc::{RpcError, RpcResult, Transport, UNRECOGNIZED_CHAIN, USER_REJECTED};
use vehreg::{
    Address, ChainId, Connector, Ledger, LedgerError, MemoryConnector, MemoryLedger, MemoryRegistry, NetworkParams,
    PendingTx, Receipt, RegistryRecord, Wallet,
};

// Hardhat's first two default accounts
pub const ALICE: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
pub const BOB: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";

pub fn addr(raw: &str) -> Address {
    Address::parse(raw).expect("address")
}

// =============================================================================
// Wallet
// =============================================================================

pub struct WalletScript {
    pub accounts: Vec<Address>,
    pub reject_accounts: bool,
    pub chain: ChainId,
    /// Chains the wallet can switch to without registering them first.
    pub known: Vec<ChainId>,
    pub refuse_switch: bool,
    pub refuse_add: bool,
    /// Accept `wallet_addEthereumChain` without learning the chain.
    pub forget_added: bool,
    pub calls: Vec<String>,
}

/// Wallet whose behaviour is set per test and can be changed mid-test.
#[derive(Clone)]
pub struct ScriptedWallet(Arc<Mutex<WalletScript>>);

impl ScriptedWallet {
    pub fn on_chain(chain: u64, accounts: &[&str]) -> Self {
        Self(Arc::new(Mutex::new(WalletScript {
            accounts: accounts.iter().map(|a| addr(a)).collect(),
            reject_accounts: false,
            chain: ChainId(chain),
            known: vec![ChainId(chain)],
            refuse_switch: false,
            refuse_add: false,
            forget_added: false,
            calls: Vec::new(),
        })))
    }

    /// Already on the hardhat chain with ALICE authorized.
    pub fn ready() -> Self {
        Self::on_chain(31337, &[ALICE])
    }

    pub fn script(&self) -> MutexGuard<'_, WalletScript> {
        self.0.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn calls(&self) -> Vec<String> {
        self.script().calls.clone()
    }
}

#[async_trait]
impl Wallet for ScriptedWallet {
    async fn request_accounts(&self) -> RpcResult<Vec<Address>> {
        let mut s = self.script();
        s.calls.push("eth_requestAccounts".into());
        if s.reject_accounts {
            return Err(RpcError::new(USER_REJECTED, "User rejected the request."));
        }
        Ok(s.accounts.clone())
    }

    async fn chain_id(&self) -> RpcResult<ChainId> {
        let mut s = self.script();
        s.calls.push("eth_chainId".into());
        Ok(s.chain)
    }

    async fn switch_chain(&self, chain: ChainId) -> RpcResult<()> {
        let mut s = self.script();
        s.calls.push("wallet_switchEthereumChain".into());
        if s.refuse_switch {
            return Err(RpcError::new(USER_REJECTED, "User rejected the request."));
        }
        if !s.known.contains(&chain) {
            return Err(RpcError::new(UNRECOGNIZED_CHAIN, format!("Unrecognized chain ID \"{}\"", chain.to_hex())));
        }
        s.chain = chain;
        Ok(())
    }

    async fn add_chain(&self, params: &NetworkParams) -> RpcResult<()> {
        let mut s = self.script();
        s.calls.push("wallet_addEthereumChain".into());
        if s.refuse_add {
            return Err(RpcError::new(USER_REJECTED, "User rejected the request."));
        }
        if !s.forget_added {
            s.known.push(params.chain_id);
        }
        Ok(())
    }
}

// =============================================================================
// Ledger
// =============================================================================

/// Switches for injecting ledger faults and holding operations in flight.
#[derive(Default)]
pub struct LedgerControls {
    pub fail_reads: AtomicBool,
    pub reject_appends: AtomicBool,
    pub revert_confirms: AtomicBool,
    pub hold_confirms: AtomicBool,
    pub hold_reads: AtomicBool,
    /// Signalled when an operation reaches a hold.
    pub held: Notify,
    /// Signal to let a held operation continue.
    pub release: Notify,
}

impl LedgerControls {
    fn on(flag: &AtomicBool) -> bool {
        flag.load(Ordering::SeqCst)
    }

    pub fn set(flag: &AtomicBool, value: bool) {
        flag.store(value, Ordering::SeqCst);
    }

    async fn hold(&self) {
        self.held.notify_one();
        self.release.notified().await;
    }
}

/// `MemoryConnector` with fault injection.
#[derive(Clone, Default)]
pub struct FaultyConnector {
    pub inner: MemoryConnector,
    pub controls: Arc<LedgerControls>,
}

impl FaultyConnector {
    pub fn registry(&self) -> &MemoryRegistry {
        self.inner.registry()
    }
}

pub struct FaultyLedger {
    inner: MemoryLedger,
    controls: Arc<LedgerControls>,
}

impl Connector for FaultyConnector {
    type Ledger = FaultyLedger;

    fn connect(&self, signer: &Address, contract: &Address) -> FaultyLedger {
        FaultyLedger { inner: self.inner.connect(signer, contract), controls: self.controls.clone() }
    }
}

#[async_trait]
impl Ledger for FaultyLedger {
    async fn append(&self, owner_name: &str, car_model: &str) -> Result<PendingTx, LedgerError> {
        if LedgerControls::on(&self.controls.reject_appends) {
            return Err(LedgerError::Rejected("User denied transaction signature.".into()));
        }
        self.inner.append(owner_name, car_model).await
    }

    async fn confirm(&self, pending: &PendingTx) -> Result<Receipt, LedgerError> {
        if LedgerControls::on(&self.controls.hold_confirms) {
            self.controls.hold().await;
        }
        if LedgerControls::on(&self.controls.revert_confirms) {
            return Err(LedgerError::Reverted(format!("transaction {} reverted", pending.hash)));
        }
        self.inner.confirm(pending).await
    }

    async fn read_all(&self) -> Result<Vec<RegistryRecord>, LedgerError> {
        if LedgerControls::on(&self.controls.hold_reads) {
            self.controls.hold().await;
        }
        if LedgerControls::on(&self.controls.fail_reads) {
            return Err(LedgerError::Rpc(RpcError::new(-32000, "header not found")));
        }
        self.inner.read_all().await
    }

    async fn count(&self) -> Result<u64, LedgerError> {
        self.inner.count().await
    }
}

/// Put `records` on the registry as if registered earlier by someone else.
pub async fn seed(registry: &MemoryRegistry, records: &[(&str, &str)]) {
    let ledger = MemoryLedger::new(registry.clone(), addr(BOB));
    for (owner, model) in records {
        let pending = ledger.append(owner, model).await.expect("append");
        ledger.confirm(&pending).await.expect("confirm");
    }
}

// =============================================================================
// Transport
// =============================================================================

type Handler = Box<dyn Fn(&str, &Value) -> RpcResult<Value> + Send + Sync>;

/// JSON-RPC endpoint answered by a closure; records every call.
pub struct ScriptedTransport {
    handler: Handler,
    calls: Mutex<Vec<(String, Value)>>,
}

impl ScriptedTransport {
    pub fn new(handler: impl Fn(&str, &Value) -> RpcResult<Value> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self { handler: Box::new(handler), calls: Mutex::new(Vec::new()) })
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.calls().into_iter().map(|(m, _)| m).collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn request(&self, method: &str, params: Value) -> RpcResult<Value> {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).push((method.to_string(), params.clone()));
        (self.handler)(method, &params)
    }

    async fn pause(&self, _duration: Duration) {
        tokio::task::yield_now().await;
    }
}
