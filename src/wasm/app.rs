//! RegistryApp: the session exposed to JavaScript
//!
//! ```js
//! const app = new RegistryApp({ contract: "0x5FbD...0aa3" });
//! app.subscribe(state => render(state));
//! await app.connect();
//! await app.submitEntry("Alice", "Tesla Model 3");
//! ```

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use super::ethereum::Eip1193Transport;
use super::log;
use crate::core::chain::{Address, ChainId};
use crate::core::errors::SessionError;
use crate::ledger::ContractConnector;
use crate::session::{SessionConfig, SessionManager};
use crate::wallet::{ProviderWallet, WalletEvent};

type BrowserSession = SessionManager<ProviderWallet<Eip1193Transport>, ContractConnector<Eip1193Transport>>;

/// Optional constructor argument; missing fields keep the hardhat defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct AppOptions {
    contract: Option<String>,
    chain_id: Option<String>,
    chain_name: Option<String>,
    rpc_url: Option<String>,
    poll_ms: Option<u64>,
}

impl AppOptions {
    fn into_config(self) -> Result<SessionConfig, JsValue> {
        let mut config = SessionConfig::default();
        if let Some(raw) = self.contract {
            config = config.with_contract(Address::parse(&raw).map_err(|e| JsValue::from_str(&e.to_string()))?);
        }
        if let Some(raw) = self.chain_id {
            config = config.with_chain_id(ChainId::parse(&raw).map_err(|e| JsValue::from_str(&e.to_string()))?);
        }
        if let Some(name) = self.chain_name {
            config = config.with_chain_name(name);
        }
        if let Some(url) = self.rpc_url {
            config = config.with_rpc_url(url);
        }
        if let Some(ms) = self.poll_ms {
            config = config.with_poll_interval(Duration::from_millis(ms));
        }
        Ok(config)
    }
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Rejections carry `{error, message}` so pages can branch on the kind.
fn session_error(err: SessionError) -> JsValue {
    to_js(&json!({"error": err.kind(), "message": err.to_string()}))
        .unwrap_or_else(|_| JsValue::from_str(&err.to_string()))
}

#[wasm_bindgen]
pub struct RegistryApp {
    session: Rc<BrowserSession>,
}

impl RegistryApp {
    fn listen(provider: &Eip1193Transport, session: &Rc<BrowserSession>) -> Result<(), JsValue> {
        let accounts_session = session.clone();
        provider
            .on("accountsChanged", move |payload: JsValue| {
                let accounts = match notification("accountsChanged", payload) {
                    Ok(WalletEvent::AccountsChanged(accounts)) => accounts,
                    Ok(_) => return,
                    Err(e) => {
                        log!("[RegistryApp] ignoring accountsChanged: {}", e);
                        return;
                    }
                };
                let session = accounts_session.clone();
                spawn_local(async move {
                    if let Err(e) = session.handle_account_change(accounts).await {
                        log!("[RegistryApp] account change: {}", e);
                    }
                });
            })
            .map_err(|e| JsValue::from_str(&e.to_string()))?;

        let chain_session = session.clone();
        provider
            .on("chainChanged", move |payload: JsValue| {
                let chain = match notification("chainChanged", payload) {
                    Ok(WalletEvent::ChainChanged(chain)) => Some(chain),
                    _ => None,
                };
                chain_session.handle_network_change(chain);
                if let Some(window) = web_sys::window() {
                    let _ = window.location().reload();
                }
            })
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

fn notification(event: &str, payload: JsValue) -> Result<WalletEvent, String> {
    let value: serde_json::Value = serde_wasm_bindgen::from_value(payload).map_err(|e| e.to_string())?;
    WalletEvent::from_notification(event, value).map_err(|e| e.to_string())
}

#[wasm_bindgen]
impl RegistryApp {
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> Result<RegistryApp, JsValue> {
        let options: AppOptions = if options.is_undefined() || options.is_null() {
            AppOptions::default()
        } else {
            serde_wasm_bindgen::from_value(options)?
        };
        let config = options.into_config()?;

        let detected = Eip1193Transport::detect().map(Arc::new);
        if detected.is_none() {
            log!("[RegistryApp] no injected wallet found");
        }
        // Without a wallet nothing ever binds, so the connector's transport is never used.
        let transport = detected.clone().unwrap_or_else(|| Arc::new(Eip1193Transport::new(JsValue::UNDEFINED)));
        let connector = ContractConnector::new(transport, config.poll_interval);
        let session = Rc::new(SessionManager::new(detected.clone().map(ProviderWallet::new), connector, config));

        if let Some(provider) = detected {
            Self::listen(&provider, &session)?;
        }
        Ok(RegistryApp { session })
    }

    #[wasm_bindgen(js_name = "hasWallet")]
    pub fn has_wallet(&self) -> bool {
        self.session.has_wallet()
    }

    pub async fn connect(&self) -> Result<JsValue, JsValue> {
        let connection = self.session.establish_binding().await.map_err(session_error)?;
        to_js(&connection)
    }

    #[wasm_bindgen(js_name = "submitEntry")]
    pub async fn submit_entry(&self, owner_name: String, car_model: String) -> Result<JsValue, JsValue> {
        let receipt = self.session.submit_entry(&owner_name, &car_model).await.map_err(session_error)?;
        to_js(&receipt)
    }

    #[wasm_bindgen(js_name = "refreshEntries")]
    pub async fn refresh_entries(&self) -> Result<u32, JsValue> {
        let count = self.session.refresh().await.map_err(session_error)?;
        Ok(count as u32)
    }

    /// Current snapshot as a plain object.
    pub fn state(&self) -> Result<JsValue, JsValue> {
        to_js(&self.session.snapshot())
    }

    /// Call `callback(state)` after every change.
    pub fn subscribe(&self, callback: js_sys::Function) {
        let mut rx = self.session.subscribe();
        spawn_local(async move {
            while rx.changed().await.is_ok() {
                let snapshot = rx.borrow_and_update().clone();
                match to_js(&snapshot) {
                    Ok(value) => {
                        let _ = callback.call1(&JsValue::NULL, &value);
                    }
                    Err(e) => log!("[RegistryApp] snapshot: {:?}", e),
                }
            }
        });
    }
}
