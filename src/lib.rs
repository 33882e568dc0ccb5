//! Vehreg: wallet session and append-only car registry on a local EVM chain.
//!
//! # Architecture
//!
//! ```text
//! SessionManager (entry point)
//!   │
//!   ├── Wallet (ProviderWallet over a Transport)
//!   │     └── accounts, chain id, switch / add chain
//!   │
//!   ├── Connector → Ledger (ContractLedger or MemoryLedger)
//!   │     └── registerCar, getAllCars, getCarCount
//!   │
//!   ├── ViewCache (ordered entries, replaced on every refresh)
//!   │
//!   └── watch::Sender<SessionSnapshot>
//!         └── RegistryNamespace ("/registry" scrolls)
//! ```
//!
//! # Operations
//!
//! | Operation | Method | Description |
//! |-----------|--------|-------------|
//! | connect | `session.establish_binding()` | Authorize, reconcile the network, bind |
//! | register | `session.submit_entry(owner, model)` | Append and wait for confirmation |
//! | refresh | `session.refresh()` | Replace the cache from the ledger |
//! | accounts | `session.handle_account_change(list)` | Rebind or disconnect |
//! | network | `session.handle_network_change(chain)` | Invalidate, require reload |
//!
//! # Features
//!
//! - `native` - HTTP transport, server, CLI, tokio runtime
//! - `wasm` - `window.ethereum` transport and JS bindings
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use vehreg::{ContractConnector, HttpTransport, ProviderWallet, SessionConfig, SessionManager};
//!
//! let config = SessionConfig::from_env()?;
//! let transport = Arc::new(HttpTransport::new(config.rpc_url()));
//! let session = SessionManager::new(
//!     Some(ProviderWallet::new(transport.clone())),
//!     ContractConnector::new(transport, config.poll_interval),
//!     config,
//! );
//!
//! session.establish_binding().await?;
//! session.submit_entry("Alice", "Tesla Model 3").await?;
//! ```

// =============================================================================
// Shared modules (compile everywhere)
// =============================================================================
pub mod core;
pub mod ledger;
pub mod namespaces;
pub mod rpc;
pub mod session;
pub mod wallet;

// =============================================================================
// Native-only modules (server, CLI, tokio)
// =============================================================================
#[cfg(feature = "native")]
pub mod logging;
#[cfg(feature = "native")]
pub mod runtime;
#[cfg(feature = "native")]
pub mod server;

// =============================================================================
// WASM-only modules (browser, wasm-bindgen)
// =============================================================================
#[cfg(feature = "wasm")]
pub mod wasm;

// =============================================================================
// Re-exports: Shared
// =============================================================================
pub use core::chain::{Address, ChainId, NetworkParams};
pub use core::entry::{Entry, RegistryRecord, ViewCache};
pub use core::errors::{ErrorKind, SessionError, SessionResult, StatusKind, StatusMessage};
pub use ledger::{
    Connector, ContractConnector, ContractLedger, Ledger, LedgerError, MemoryConnector, MemoryLedger,
    MemoryRegistry, PendingTx, Receipt,
};
pub use namespaces::RegistryNamespace;
pub use rpc::{RpcError, RpcResult, Transport};
pub use session::{Connection, SessionConfig, SessionManager, SessionSnapshot};
pub use wallet::{EventPoller, ProviderWallet, Wallet, WalletEvent};

// =============================================================================
// Re-exports: Native
// =============================================================================
#[cfg(feature = "native")]
pub use rpc::HttpTransport;
#[cfg(feature = "native")]
pub use runtime::{install_signal_handlers, Shutdown};
#[cfg(feature = "native")]
pub use server::{create_router, create_router_with_name};

/// Session over a JSON-RPC node with unlocked accounts.
#[cfg(feature = "native")]
pub type HttpSession = SessionManager<ProviderWallet<HttpTransport>, ContractConnector<HttpTransport>>;

// =============================================================================
// Re-exports: WASM
// =============================================================================
#[cfg(feature = "wasm")]
pub use wasm::{Eip1193Transport, RegistryApp};
