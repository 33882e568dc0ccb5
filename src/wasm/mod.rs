//! WASM module: the registry session inside a browser page
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          RegistryApp (JS API)           │
//! │  connect, submitEntry, refreshEntries   │
//! │  state, subscribe                       │
//! └─────────────────┬───────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────┐
//! │             SessionManager              │
//! └─────────────────┬───────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────┐
//! │   Eip1193Transport (window.ethereum)    │
//! │  request(), on(accountsChanged, ...)    │
//! └─────────────────────────────────────────┘
//! ```

mod app;
mod ethereum;

pub use app::RegistryApp;
pub use ethereum::Eip1193Transport;

use wasm_bindgen::prelude::*;

/// Initialize WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Log to browser console
pub fn console_log(s: &str) {
    web_sys::console::log_1(&JsValue::from_str(s));
}

macro_rules! log {
    ($($t:tt)*) => {
        crate::wasm::console_log(&format!($($t)*))
    }
}

pub(crate) use log;
