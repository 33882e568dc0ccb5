//! Session - wallet binding, registry access, and the view cache
//!
//! # Architecture
//!
//! ```text
//! connect / submit / refresh          accountsChanged / chainChanged
//!            │                                    │
//!            ▼                                    ▼
//!   ┌─────────────────────── SessionManager ───────────────────────┐
//!   │  Binding { account, network, ledger }   epoch   ViewCache     │
//!   └──────────┬──────────────────────┬───────────────────┬────────┘
//!              ▼                      ▼                   ▼
//!           Wallet              Connector → Ledger   watch::Sender<SessionSnapshot>
//! ```
//!
//! The binding exists only while an account is authorized and the wallet is
//! on the required chain. Every wallet notification bumps the epoch, as does
//! binding a different account, and an operation whose epoch moved while it
//! was suspended drops its result.

mod config;
mod state;

pub use config::{ConfigError, SessionConfig};
pub use state::{Connection, SessionSnapshot};

use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::core::chain::{Address, ChainId};
use crate::core::errors::{SessionError, SessionResult, StatusMessage};
use crate::ledger::{Connector, Ledger, LedgerError, Receipt};
use crate::rpc::RpcError;
use crate::wallet::{Wallet, WalletEvent};
use state::{Binding, SessionInner};

pub struct SessionManager<W, C: Connector> {
    wallet: Option<W>,
    connector: C,
    config: SessionConfig,
    inner: Mutex<SessionInner<C::Ledger>>,
    state: watch::Sender<SessionSnapshot>,
}

struct Reconciled {
    account: Address,
    network_id: ChainId,
    switched: bool,
}

impl<W: Wallet, C: Connector> SessionManager<W, C> {
    /// `wallet` is `None` when no wallet provider was detected.
    pub fn new(wallet: Option<W>, connector: C, config: SessionConfig) -> Self {
        let inner = SessionInner::default();
        let (state, _) = watch::channel(inner.snapshot(config.required_chain()));
        Self { wallet, connector, config, inner: Mutex::new(inner), state }
    }

    pub fn config(&self) -> &SessionConfig { &self.config }
    pub fn has_wallet(&self) -> bool { self.wallet.is_some() }

    /// Observe every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> { self.state.subscribe() }

    pub fn snapshot(&self) -> SessionSnapshot { self.state.borrow().clone() }

    pub fn is_bound(&self) -> bool { self.lock().binding.is_some() }

    /// Current ledger handle, if bound.
    pub fn ledger(&self) -> Option<Arc<C::Ledger>> {
        self.lock().binding.as_ref().map(|b| b.ledger.clone())
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner<C::Ledger>> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn publish(&self, inner: &SessionInner<C::Ledger>) {
        self.state.send_replace(inner.snapshot(self.config.required_chain()));
    }

    fn update<R>(&self, f: impl FnOnce(&mut SessionInner<C::Ledger>) -> R) -> R {
        let mut inner = self.lock();
        let result = f(&mut inner);
        self.publish(&inner);
        result
    }

    /// Record `err` as the status line and hand it back to the caller.
    fn fail_locked(&self, inner: &mut SessionInner<C::Ledger>, err: SessionError) -> SessionError {
        warn!(kind = ?err.kind(), error = %err, "session operation failed");
        inner.status = Some(StatusMessage::error(&err));
        self.publish(inner);
        err
    }

    fn fail(&self, err: SessionError) -> SessionError {
        let mut inner = self.lock();
        self.fail_locked(&mut inner, err)
    }

    // =========================================================================
    // Binding
    // =========================================================================

    /// Authorize an account, get the wallet onto the required chain, bind a
    /// ledger handle, then load the registry. Safe to call while bound.
    pub async fn establish_binding(&self) -> SessionResult<Connection> {
        let wallet = match &self.wallet {
            Some(wallet) => wallet,
            None => return Err(self.fail(SessionError::WalletUnavailable)),
        };
        let epoch = {
            let mut inner = self.lock();
            if inner.reload_required {
                return Err(self.fail_locked(&mut inner, SessionError::ReloadRequired));
            }
            inner.connecting = true;
            self.publish(&inner);
            inner.epoch
        };

        let outcome = self.reconcile(wallet).await;

        let connection = {
            let mut inner = self.lock();
            inner.connecting = false;
            if inner.epoch != epoch {
                debug!("discarding superseded connection attempt");
                self.publish(&inner);
                return Err(SessionError::Superseded);
            }
            let reconciled = match outcome {
                Ok(reconciled) => reconciled,
                Err(err) => return Err(self.fail_locked(&mut inner, err)),
            };
            let verb = if reconciled.switched { "Switched to" } else { "Connected to" };
            inner.status = Some(StatusMessage::success(format!(
                "{} {} as {}",
                verb,
                self.config.network.chain_name,
                reconciled.account.short()
            )));
            let unchanged = inner
                .binding
                .as_ref()
                .is_some_and(|b| b.account == reconciled.account && b.network_id == reconciled.network_id);
            // Rebinding the same account on the same chain keeps in-flight work valid.
            if !unchanged {
                let ledger = Arc::new(self.connector.connect(&reconciled.account, &self.config.contract));
                inner.binding = Some(Binding {
                    account: reconciled.account.clone(),
                    network_id: reconciled.network_id,
                    ledger,
                });
                inner.epoch += 1;
            }
            inner.observed_network = Some(reconciled.network_id);
            self.publish(&inner);
            Connection {
                account: reconciled.account,
                network_id: reconciled.network_id,
                switched: reconciled.switched,
            }
        };
        info!(account = %connection.account, chain = %connection.network_id, switched = connection.switched, "session bound");

        // A failed load is already on the status line; the binding stands.
        let _ = self.refresh().await;
        Ok(connection)
    }

    async fn reconcile(&self, wallet: &W) -> SessionResult<Reconciled> {
        let required = self.config.required_chain();
        let mut registered = false;
        loop {
            let accounts = wallet.request_accounts().await.map_err(connect_error)?;
            let account = accounts.into_iter().next().ok_or(SessionError::UserRejected)?;
            let current = wallet.chain_id().await.map_err(connect_error)?;
            if current == required {
                return Ok(Reconciled { account, network_id: current, switched: registered });
            }

            match wallet.switch_chain(required).await {
                Ok(()) => {
                    let now = wallet.chain_id().await.map_err(connect_error)?;
                    if now != required {
                        return Err(SessionError::NetworkMismatch { expected: required, actual: now });
                    }
                    return Ok(Reconciled { account, network_id: now, switched: true });
                }
                Err(err) if err.is_unrecognized_chain() && !registered => {
                    info!(chain = %required, "wallet does not know the required chain, registering it");
                    wallet
                        .add_chain(&self.config.network)
                        .await
                        .map_err(|e| SessionError::NetworkRegistrationFailed(e.message))?;
                    registered = true;
                }
                Err(err) => {
                    debug!(error = %err, "network switch refused");
                    return Err(SessionError::NetworkMismatch { expected: required, actual: current });
                }
            }
        }
    }

    // =========================================================================
    // Registry operations
    // =========================================================================

    /// Register a vehicle. Fields are trimmed only to check they are not
    /// blank; the ledger receives them as given.
    pub async fn submit_entry(&self, owner_name: &str, car_model: &str) -> SessionResult<Receipt> {
        let (ledger, epoch) = {
            let mut inner = self.lock();
            if inner.reload_required {
                return Err(self.fail_locked(&mut inner, SessionError::ReloadRequired));
            }
            let ledger = match inner.binding.as_ref().map(|b| b.ledger.clone()) {
                Some(ledger) => ledger,
                None => return Err(self.fail_locked(&mut inner, SessionError::NotConnected)),
            };
            if owner_name.trim().is_empty() || car_model.trim().is_empty() {
                let err = SessionError::Validation("owner name and car model are both required".into());
                return Err(self.fail_locked(&mut inner, err));
            }
            inner.submitting = true;
            inner.status = Some(StatusMessage::info("Sending transaction, confirm it in your wallet"));
            self.publish(&inner);
            (ledger, inner.epoch)
        };

        let result = self.write(ledger.as_ref(), owner_name, car_model, epoch).await;

        let receipt = {
            let mut inner = self.lock();
            inner.submitting = false;
            if inner.epoch != epoch {
                if let Ok(receipt) = &result {
                    info!(hash = %receipt.transaction_hash, "registration confirmed after the session changed, ignoring");
                }
                self.publish(&inner);
                return Err(SessionError::Superseded);
            }
            match result {
                Ok(receipt) => {
                    inner.status = Some(StatusMessage::success(format!(
                        "Car registered, transaction {}...",
                        receipt.short_hash()
                    )));
                    self.publish(&inner);
                    receipt
                }
                Err(err) => return Err(self.fail_locked(&mut inner, err)),
            }
        };

        let _ = self.refresh().await;
        Ok(receipt)
    }

    async fn write(&self, ledger: &C::Ledger, owner_name: &str, car_model: &str, epoch: u64) -> SessionResult<Receipt> {
        let pending = ledger.append(owner_name, car_model).await.map_err(|e| match e {
            LedgerError::Rejected(_) => SessionError::UserRejected,
            other => SessionError::SubmissionFailed(other.to_string()),
        })?;
        self.update(|inner| {
            if inner.epoch == epoch {
                inner.status = Some(StatusMessage::info("Transaction submitted, waiting for confirmation"));
            }
        });
        ledger.confirm(&pending).await.map_err(|e| match e {
            LedgerError::Reverted(msg) => SessionError::TransactionReverted(msg),
            other => SessionError::SubmissionFailed(other.to_string()),
        })
    }

    /// Replace the view cache with a full read of the ledger. Without a
    /// binding this is a no-op returning the current cache size.
    pub async fn refresh(&self) -> SessionResult<usize> {
        let (ledger, epoch) = {
            let mut inner = self.lock();
            let ledger = match inner.binding.as_ref().map(|b| b.ledger.clone()) {
                Some(ledger) => ledger,
                None => return Ok(inner.cache.len()),
            };
            inner.loading = true;
            self.publish(&inner);
            (ledger, inner.epoch)
        };

        let result = ledger.read_all().await;

        let mut inner = self.lock();
        inner.loading = false;
        if inner.epoch != epoch {
            debug!("discarding superseded registry read");
            self.publish(&inner);
            return Err(SessionError::Superseded);
        }
        match result {
            Ok(records) => {
                inner.cache.replace(records);
                debug!(count = inner.cache.len(), "registry loaded");
                self.publish(&inner);
                Ok(inner.cache.len())
            }
            Err(err) => Err(self.fail_locked(&mut inner, SessionError::ReadFailed(err.to_string()))),
        }
    }

    // =========================================================================
    // Wallet notifications
    // =========================================================================

    /// The wallet's authorized account set changed. An empty set tears the
    /// session down; otherwise the binding is rebuilt for the new first account.
    pub async fn handle_account_change(&self, accounts: Vec<Address>) -> SessionResult<()> {
        let disconnected = self.update(|inner| {
            inner.epoch += 1;
            inner.binding = None;
            if accounts.is_empty() {
                inner.cache.clear();
                inner.status = Some(StatusMessage::info("Wallet disconnected"));
            }
            accounts.is_empty()
        });
        if disconnected {
            info!("wallet disconnected, session cleared");
            return Ok(());
        }
        info!(account = %accounts[0].short(), "active account changed, rebinding");
        self.establish_binding().await.map(|_| ())
    }

    /// The wallet moved to another chain. Handles built for the old chain may
    /// be referenced by in-flight work, so the session refuses further use
    /// and the embedding must reload.
    pub fn handle_network_change(&self, chain: Option<ChainId>) {
        warn!(chain = ?chain, "wallet network changed, reload required");
        self.update(|inner| {
            inner.epoch += 1;
            inner.binding = None;
            inner.reload_required = true;
            if chain.is_some() {
                inner.observed_network = chain;
            }
            inner.status = Some(StatusMessage::error(&SessionError::ReloadRequired));
        });
    }

    pub async fn dispatch(&self, event: WalletEvent) -> SessionResult<()> {
        match event {
            WalletEvent::AccountsChanged(accounts) => self.handle_account_change(accounts).await,
            WalletEvent::ChainChanged(chain) => {
                self.handle_network_change(Some(chain));
                Ok(())
            }
        }
    }
}

fn connect_error(err: RpcError) -> SessionError {
    if err.is_user_rejection() {
        SessionError::UserRejected
    } else {
        SessionError::ConnectionFailed(err.message)
    }
}
