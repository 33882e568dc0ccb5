//! `window.ethereum` as a [`Transport`].

use async_trait::async_trait;
use js_sys::{Function, Promise, Reflect};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use crate::rpc::{RpcError, RpcResult, Transport, TRANSPORT_FAILURE, UNSUPPORTED_METHOD};

/// EIP-1193 provider injected by a browser wallet.
pub struct Eip1193Transport {
    provider: JsValue,
}

impl Eip1193Transport {
    pub fn new(provider: JsValue) -> Self { Self { provider } }

    /// The injected `window.ethereum`, if any.
    pub fn detect() -> Option<Self> {
        let window = web_sys::window()?;
        let provider = Reflect::get(&window, &JsValue::from_str("ethereum")).ok()?;
        if provider.is_undefined() || provider.is_null() {
            return None;
        }
        Some(Self::new(provider))
    }

    fn function(&self, name: &str) -> RpcResult<Function> {
        Reflect::get(&self.provider, &JsValue::from_str(name))
            .map_err(js_error)?
            .dyn_into::<Function>()
            .map_err(|_| RpcError::new(UNSUPPORTED_METHOD, format!("provider has no {}()", name)))
    }

    /// Register a listener for a provider event. The closure lives as long as the page.
    pub fn on(&self, event: &str, handler: impl FnMut(JsValue) + 'static) -> RpcResult<()> {
        let on = self.function("on")?;
        let closure = Closure::<dyn FnMut(JsValue)>::new(handler);
        on.call2(&self.provider, &JsValue::from_str(event), closure.as_ref().unchecked_ref())
            .map_err(js_error)?;
        closure.forget();
        Ok(())
    }
}

/// Provider errors are plain objects with `code` and `message`; ethers uses a string code.
fn js_error(value: JsValue) -> RpcError {
    let field = |name: &str| Reflect::get(&value, &JsValue::from_str(name)).ok();
    let message = field("message")
        .and_then(|m| m.as_string())
        .or_else(|| value.as_string())
        .unwrap_or_else(|| "wallet request failed".into());
    let code = field("code").unwrap_or(JsValue::UNDEFINED);
    if let Some(code) = code.as_f64() {
        RpcError::new(code as i64, message)
    } else if let Some(code) = code.as_string() {
        RpcError::new(TRANSPORT_FAILURE, format!("{}: {}", code, message))
    } else {
        RpcError::transport(message)
    }
}

#[async_trait(?Send)]
impl Transport for Eip1193Transport {
    async fn request(&self, method: &str, params: Value) -> RpcResult<Value> {
        let serializer = serde_wasm_bindgen::Serializer::json_compatible();
        let args = json!({"method": method, "params": params})
            .serialize(&serializer)
            .map_err(|e| RpcError::transport(e.to_string()))?;

        let request = self.function("request")?;
        let promise: Promise = request
            .call1(&self.provider, &args)
            .map_err(js_error)?
            .dyn_into()
            .map_err(|_| RpcError::transport("request() did not return a promise"))?;
        let result = JsFuture::from(promise).await.map_err(js_error)?;

        if result.is_undefined() || result.is_null() {
            return Ok(Value::Null);
        }
        serde_wasm_bindgen::from_value(result).map_err(|e| RpcError::transport(e.to_string()))
    }

    async fn pause(&self, duration: Duration) {
        let ms = duration.as_millis().min(i32::MAX as u128) as i32;
        let promise = Promise::new(&mut |resolve, _reject| {
            let scheduled = web_sys::window()
                .map(|w| w.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms).is_ok())
                .unwrap_or(false);
            if !scheduled {
                let _ = resolve.call0(&JsValue::NULL);
            }
        });
        let _ = JsFuture::from(promise).await;
    }
}
