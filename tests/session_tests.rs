//! Session Tests: binding, registration, refresh, and wallet notifications
//!
//! These tests verify:
//! 1. Connecting on, switching to, and registering the required network
//! 2. No binding survives a rejected or failed reconciliation
//! 3. Registration validates, confirms, and refreshes the cache
//! 4. A failed read leaves the cache as it was
//! 5. Account and network notifications rebind, clear, or invalidate
//! 6. Results of operations overtaken by a notification are dropped

mod support;

use std::sync::Arc;
use std::time::Duration;
use support::*;
use vehreg::{
    ChainId, ErrorKind, MemoryConnector, SessionConfig, SessionError, SessionManager, StatusKind, WalletEvent,
};

type Session = SessionManager<ScriptedWallet, MemoryConnector>;
type FaultySession = SessionManager<ScriptedWallet, FaultyConnector>;

fn new_session(wallet: &ScriptedWallet) -> (Session, MemoryConnector) {
    let connector = MemoryConnector::default();
    let session = SessionManager::new(Some(wallet.clone()), connector.clone(), SessionConfig::default());
    (session, connector)
}

fn faulty_session(wallet: &ScriptedWallet) -> (Arc<FaultySession>, FaultyConnector) {
    let connector = FaultyConnector::default();
    let session = SessionManager::new(Some(wallet.clone()), connector.clone(), SessionConfig::default());
    (Arc::new(session), connector)
}

fn status_text(session: &Session) -> String {
    session.snapshot().status.map(|s| s.text).unwrap_or_default()
}

// =============================================================================
// Binding
// =============================================================================

#[tokio::test]
async fn no_wallet_is_reported() {
    let session: Session = SessionManager::new(None, MemoryConnector::default(), SessionConfig::default());
    assert!(!session.has_wallet());

    let err = session.establish_binding().await.unwrap_err();
    assert_eq!(err, SessionError::WalletUnavailable);

    let snapshot = session.snapshot();
    assert!(!snapshot.connected);
    let status = snapshot.status.expect("status");
    assert_eq!(status.kind, StatusKind::Error);
    assert_eq!(status.error, Some(ErrorKind::WalletUnavailable));
}

#[tokio::test]
async fn connect_on_required_network_loads_entries() {
    let wallet = ScriptedWallet::ready();
    let (session, connector) = new_session(&wallet);
    seed(connector.registry(), &[("John Doe", "Tesla Model 3"), ("Jane Roe", "Ford Mustang")]).await;

    let connection = session.establish_binding().await.expect("connect");
    assert_eq!(connection.account, addr(ALICE));
    assert_eq!(connection.network_id, ChainId::HARDHAT);
    assert!(!connection.switched);
    assert!(!wallet.calls().contains(&"wallet_switchEthereumChain".to_string()));

    let snapshot = session.snapshot();
    assert!(snapshot.connected);
    assert!(!snapshot.connecting);
    assert_eq!(snapshot.account, Some(addr(ALICE)));
    assert_eq!(snapshot.network_id, Some(ChainId(31337)));
    assert_eq!(snapshot.entries.len(), 2);
    assert_eq!(snapshot.entries[1].index, 1);
    assert_eq!(snapshot.entries[1].owner_name, "Jane Roe");
    assert_eq!(status_text(&session), "Connected to Hardhat Local as 0xf39f...2266");
}

#[tokio::test]
async fn connect_switches_a_known_network() {
    let wallet = ScriptedWallet::on_chain(1, &[ALICE]);
    wallet.script().known.push(ChainId::HARDHAT);
    let (session, _) = new_session(&wallet);

    let connection = session.establish_binding().await.expect("connect");
    assert!(connection.switched);
    assert_eq!(wallet.script().chain, ChainId::HARDHAT);
    assert!(!wallet.calls().contains(&"wallet_addEthereumChain".to_string()));
    assert_eq!(status_text(&session), "Switched to Hardhat Local as 0xf39f...2266");
}

#[tokio::test]
async fn connect_registers_an_unknown_network_then_switches() {
    let wallet = ScriptedWallet::on_chain(1, &[ALICE]);
    let (session, _) = new_session(&wallet);

    let connection = session.establish_binding().await.expect("connect");
    assert!(connection.switched);
    assert!(session.is_bound());

    let calls = wallet.calls();
    let switches = calls.iter().filter(|c| *c == "wallet_switchEthereumChain").count();
    let adds = calls.iter().filter(|c| *c == "wallet_addEthereumChain").count();
    assert_eq!(switches, 2);
    assert_eq!(adds, 1);
    let add_at = calls.iter().position(|c| c == "wallet_addEthereumChain").unwrap();
    let first_switch = calls.iter().position(|c| c == "wallet_switchEthereumChain").unwrap();
    assert!(first_switch < add_at);
}

#[tokio::test]
async fn refused_registration_leaves_session_unbound() {
    let wallet = ScriptedWallet::on_chain(1, &[ALICE]);
    wallet.script().refuse_add = true;
    let (session, _) = new_session(&wallet);

    let err = session.establish_binding().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NetworkRegistrationFailed);
    assert!(!session.is_bound());
    let snapshot = session.snapshot();
    assert!(!snapshot.connected);
    assert_eq!(snapshot.account, None);
    assert!(!snapshot.connecting);
}

#[tokio::test]
async fn registration_is_retried_only_once() {
    let wallet = ScriptedWallet::on_chain(1, &[ALICE]);
    wallet.script().forget_added = true;
    let (session, _) = new_session(&wallet);

    let err = session.establish_binding().await.unwrap_err();
    assert_eq!(err, SessionError::NetworkMismatch { expected: ChainId::HARDHAT, actual: ChainId(1) });
    assert!(!session.is_bound());
    assert!(!session.snapshot().connected);

    let calls = wallet.calls();
    assert_eq!(calls.iter().filter(|c| *c == "wallet_addEthereumChain").count(), 1);
    assert_eq!(calls.iter().filter(|c| *c == "wallet_switchEthereumChain").count(), 2);
}

#[tokio::test]
async fn refused_switch_is_a_network_mismatch() {
    let wallet = ScriptedWallet::on_chain(1, &[ALICE]);
    wallet.script().refuse_switch = true;
    let (session, _) = new_session(&wallet);

    let err = session.establish_binding().await.unwrap_err();
    assert_eq!(err, SessionError::NetworkMismatch { expected: ChainId::HARDHAT, actual: ChainId(1) });
    assert!(!session.is_bound());
    assert!(!wallet.calls().contains(&"wallet_addEthereumChain".to_string()));
}

#[tokio::test]
async fn rejected_or_empty_accounts_are_user_rejection() {
    let wallet = ScriptedWallet::ready();
    wallet.script().reject_accounts = true;
    let (session, _) = new_session(&wallet);
    assert_eq!(session.establish_binding().await.unwrap_err(), SessionError::UserRejected);
    assert!(!wallet.calls().contains(&"eth_chainId".to_string()));

    let wallet = ScriptedWallet::on_chain(31337, &[]);
    let (session, _) = new_session(&wallet);
    assert_eq!(session.establish_binding().await.unwrap_err(), SessionError::UserRejected);
    assert!(!session.is_bound());
}

#[tokio::test]
async fn snapshots_are_published() {
    let wallet = ScriptedWallet::ready();
    let (session, _) = new_session(&wallet);
    let mut rx = session.subscribe();
    assert!(!rx.borrow_and_update().connected);

    session.establish_binding().await.expect("connect");
    assert!(rx.has_changed().expect("sender alive"));
    assert!(rx.borrow_and_update().connected);
}

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn register_confirms_and_refreshes() {
    let wallet = ScriptedWallet::ready();
    let (session, connector) = new_session(&wallet);
    session.establish_binding().await.expect("connect");

    let receipt = session.submit_entry("Alice", "Tesla Model 3").await.expect("submit");
    let entry = receipt.registered.clone().expect("event");
    assert_eq!(entry.index, 0);
    assert_eq!(entry.owner_name, "Alice");
    assert_eq!(receipt.block_number, Some(1));

    session.submit_entry("Bob", "Honda Civic").await.expect("submit");
    let snapshot = session.snapshot();
    assert!(!snapshot.submitting);
    assert_eq!(snapshot.entries.len(), 2);
    assert_eq!(snapshot.entries[0].car_model, "Tesla Model 3");
    assert_eq!(snapshot.entries[1].owner_name, "Bob");
    assert_eq!(connector.registry().len(), 2);

    let status = snapshot.status.expect("status");
    assert_eq!(status.kind, StatusKind::Success);
    assert!(status.text.starts_with("Car registered, transaction 0x"));
}

#[tokio::test]
async fn each_registration_appends_one_entry_at_the_end() {
    let wallet = ScriptedWallet::ready();
    let (session, connector) = new_session(&wallet);
    seed(connector.registry(), &[("Jane Roe", "Ford Mustang")]).await;
    session.establish_binding().await.expect("connect");

    for (owner, model) in [("John Doe", "Tesla Model 3"), ("Alice", "Fiat 500")] {
        let before = session.snapshot().entries.len();
        session.submit_entry(owner, model).await.expect("submit");
        let entries = session.snapshot().entries;
        assert_eq!(entries.len(), before + 1);
        let last = entries.last().expect("entry");
        assert_eq!(last.index, before as u64);
        assert_eq!((last.owner_name.as_str(), last.car_model.as_str()), (owner, model));
    }
}

#[tokio::test]
async fn register_requires_a_binding() {
    let wallet = ScriptedWallet::ready();
    let (session, connector) = new_session(&wallet);

    let err = session.submit_entry("Alice", "Tesla Model 3").await.unwrap_err();
    assert_eq!(err, SessionError::NotConnected);
    assert_eq!(connector.registry().pending_count(), 0);
    assert!(connector.registry().is_empty());
}

#[tokio::test]
async fn blank_fields_are_rejected_but_values_are_not_trimmed() {
    let wallet = ScriptedWallet::ready();
    let (session, connector) = new_session(&wallet);
    session.establish_binding().await.expect("connect");

    let err = session.submit_entry("   ", "Tesla Model 3").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationError);
    let err = session.submit_entry("Alice", "").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationError);
    assert_eq!(connector.registry().pending_count(), 0);

    session.submit_entry(" Alice ", "Model Y").await.expect("submit");
    assert_eq!(connector.registry().records()[0].owner_name, " Alice ");
}

#[tokio::test]
async fn rejected_signature_is_user_rejection() {
    let wallet = ScriptedWallet::ready();
    let (session, connector) = faulty_session(&wallet);
    session.establish_binding().await.expect("connect");
    LedgerControls::set(&connector.controls.reject_appends, true);

    let err = session.submit_entry("Alice", "Tesla Model 3").await.unwrap_err();
    assert_eq!(err, SessionError::UserRejected);
    assert!(!session.snapshot().submitting);
    assert!(connector.registry().is_empty());
}

#[tokio::test]
async fn reverted_transaction_is_reported() {
    let wallet = ScriptedWallet::ready();
    let (session, connector) = faulty_session(&wallet);
    session.establish_binding().await.expect("connect");
    LedgerControls::set(&connector.controls.revert_confirms, true);

    let err = session.submit_entry("Alice", "Tesla Model 3").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransactionReverted);
    let status = session.snapshot().status.expect("status");
    assert_eq!(status.error, Some(ErrorKind::TransactionReverted));
}

// =============================================================================
// Refresh
// =============================================================================

#[tokio::test]
async fn failed_read_keeps_the_cache() {
    let wallet = ScriptedWallet::ready();
    let (session, connector) = faulty_session(&wallet);
    seed(connector.registry(), &[("John Doe", "Tesla Model 3")]).await;
    session.establish_binding().await.expect("connect");
    assert_eq!(session.snapshot().entries.len(), 1);

    seed(connector.registry(), &[("Jane Roe", "Ford Mustang")]).await;
    LedgerControls::set(&connector.controls.fail_reads, true);
    let err = session.refresh().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReadFailed);

    let snapshot = session.snapshot();
    assert!(!snapshot.loading);
    assert_eq!(snapshot.entries.len(), 1);
    assert_eq!(snapshot.entries[0].owner_name, "John Doe");

    LedgerControls::set(&connector.controls.fail_reads, false);
    assert_eq!(session.refresh().await.expect("refresh"), 2);
}

#[tokio::test]
async fn failed_initial_read_does_not_fail_connect() {
    let wallet = ScriptedWallet::ready();
    let (session, connector) = faulty_session(&wallet);
    LedgerControls::set(&connector.controls.fail_reads, true);

    session.establish_binding().await.expect("connect");
    let snapshot = session.snapshot();
    assert!(snapshot.connected);
    assert_eq!(snapshot.status.and_then(|s| s.error), Some(ErrorKind::ReadFailed));
}

#[tokio::test]
async fn refresh_without_binding_is_a_no_op() {
    let wallet = ScriptedWallet::ready();
    let (session, _) = new_session(&wallet);
    assert_eq!(session.refresh().await.expect("refresh"), 0);
    assert!(!session.snapshot().loading);
}

// =============================================================================
// Wallet notifications
// =============================================================================

#[tokio::test]
async fn account_change_rebinds_to_the_new_account() {
    let wallet = ScriptedWallet::on_chain(31337, &[ALICE, BOB]);
    let (session, _) = new_session(&wallet);
    session.establish_binding().await.expect("connect");
    assert_eq!(session.ledger().expect("ledger").signer(), &addr(ALICE));

    wallet.script().accounts = vec![addr(BOB)];
    session.handle_account_change(vec![addr(BOB)]).await.expect("rebind");

    assert_eq!(session.snapshot().account, Some(addr(BOB)));
    assert_eq!(session.ledger().expect("ledger").signer(), &addr(BOB));
    session.submit_entry("Bob", "Honda Civic").await.expect("submit as bob");
}

#[tokio::test]
async fn empty_account_list_disconnects() {
    let wallet = ScriptedWallet::ready();
    let (session, connector) = new_session(&wallet);
    seed(connector.registry(), &[("John Doe", "Tesla Model 3")]).await;
    session.establish_binding().await.expect("connect");

    session.dispatch(WalletEvent::AccountsChanged(vec![])).await.expect("disconnect");
    let snapshot = session.snapshot();
    assert!(!snapshot.connected);
    assert_eq!(snapshot.account, None);
    assert!(snapshot.entries.is_empty());
    assert_eq!(snapshot.status.map(|s| s.text), Some("Wallet disconnected".to_string()));

    let err = session.submit_entry("Alice", "Tesla Model 3").await.unwrap_err();
    assert_eq!(err, SessionError::NotConnected);
}

#[tokio::test]
async fn network_change_requires_reload() {
    let wallet = ScriptedWallet::ready();
    let (session, connector) = new_session(&wallet);
    session.establish_binding().await.expect("connect");

    session.dispatch(WalletEvent::ChainChanged(ChainId(1))).await.expect("dispatch");
    let snapshot = session.snapshot();
    assert!(snapshot.reload_required);
    assert!(!snapshot.connected);
    assert_eq!(snapshot.network_id, Some(ChainId(1)));
    assert_eq!(snapshot.status.and_then(|s| s.error), Some(ErrorKind::ReloadRequired));

    assert_eq!(session.submit_entry("Alice", "Tesla").await.unwrap_err(), SessionError::ReloadRequired);
    assert_eq!(session.establish_binding().await.unwrap_err(), SessionError::ReloadRequired);
    assert!(connector.registry().is_empty());
}

#[tokio::test]
async fn confirmation_after_account_change_is_discarded() {
    let wallet = ScriptedWallet::on_chain(31337, &[ALICE, BOB]);
    let (session, connector) = faulty_session(&wallet);
    session.establish_binding().await.expect("connect");
    LedgerControls::set(&connector.controls.hold_confirms, true);

    let submit = {
        let session = session.clone();
        tokio::spawn(async move { session.submit_entry("Alice", "Tesla Model 3").await })
    };
    tokio::time::timeout(Duration::from_secs(1), connector.controls.held.notified())
        .await
        .expect("confirmation in flight");

    wallet.script().accounts = vec![addr(BOB)];
    session.handle_account_change(vec![addr(BOB)]).await.expect("rebind");
    connector.controls.release.notify_one();

    let result = tokio::time::timeout(Duration::from_secs(1), submit).await.expect("finished").expect("join");
    assert_eq!(result.unwrap_err(), SessionError::Superseded);

    // The write landed, but the view only learns of it on the next read.
    assert_eq!(connector.registry().len(), 1);
    let snapshot = session.snapshot();
    assert!(!snapshot.submitting);
    assert_eq!(snapshot.account, Some(addr(BOB)));
    assert!(snapshot.entries.is_empty());
    assert_eq!(session.refresh().await.expect("refresh"), 1);
}

#[tokio::test]
async fn reconnecting_the_same_account_keeps_a_pending_registration() {
    let wallet = ScriptedWallet::ready();
    let (session, connector) = faulty_session(&wallet);
    session.establish_binding().await.expect("connect");
    LedgerControls::set(&connector.controls.hold_confirms, true);

    let submit = {
        let session = session.clone();
        tokio::spawn(async move { session.submit_entry("Alice", "Tesla Model 3").await })
    };
    tokio::time::timeout(Duration::from_secs(1), connector.controls.held.notified())
        .await
        .expect("confirmation in flight");

    session.establish_binding().await.expect("reconnect");
    connector.controls.release.notify_one();

    let result = tokio::time::timeout(Duration::from_secs(1), submit).await.expect("finished").expect("join");
    let receipt = result.expect("registration survives the reconnect");
    assert_eq!(receipt.registered.map(|e| e.owner_name), Some("Alice".to_string()));

    let snapshot = session.snapshot();
    assert!(!snapshot.submitting);
    assert_eq!(snapshot.entries.len(), 1);
    assert_eq!(connector.registry().len(), 1);
}

#[tokio::test]
async fn read_after_network_change_is_discarded() {
    let wallet = ScriptedWallet::ready();
    let (session, connector) = faulty_session(&wallet);
    session.establish_binding().await.expect("connect");
    seed(connector.registry(), &[("John Doe", "Tesla Model 3")]).await;
    LedgerControls::set(&connector.controls.hold_reads, true);

    let refresh = {
        let session = session.clone();
        tokio::spawn(async move { session.refresh().await })
    };
    tokio::time::timeout(Duration::from_secs(1), connector.controls.held.notified())
        .await
        .expect("read in flight");

    session.handle_network_change(Some(ChainId(5)));
    connector.controls.release.notify_one();

    let result = tokio::time::timeout(Duration::from_secs(1), refresh).await.expect("finished").expect("join");
    assert_eq!(result.unwrap_err(), SessionError::Superseded);
    let snapshot = session.snapshot();
    assert!(snapshot.entries.is_empty());
    assert!(!snapshot.loading);
    assert!(snapshot.reload_required);
}
