//! Registry namespace - read-only scroll view of the session snapshot.
//!
//! Mounted at `/registry`; writes go through `SessionManager` because they
//! need the wallet.

use nine_s_core::prelude::*;
use serde_json::{json, Value};
use tokio::sync::watch;

use crate::core::paths::{registry as paths, registry_types as types};
use crate::session::SessionSnapshot;

pub struct RegistryNamespace {
    state: watch::Receiver<SessionSnapshot>,
}

impl RegistryNamespace {
    pub fn new(state: watch::Receiver<SessionSnapshot>) -> Self { Self { state } }

    fn key(path: &str) -> String { format!("{}{}", paths::MOUNT, path) }

    fn read_status(snapshot: &SessionSnapshot) -> Scroll {
        Scroll::new(&Self::key(paths::STATUS), json!({
            "connected": snapshot.connected,
            "connecting": snapshot.connecting,
            "submitting": snapshot.submitting,
            "loading": snapshot.loading,
            "reload_required": snapshot.reload_required,
            "count": snapshot.entries.len(),
            "status": snapshot.status,
        }))
        .set_type(types::STATUS)
    }

    fn read_entry(snapshot: &SessionSnapshot, path: &str) -> Option<Scroll> {
        let index: usize = path.strip_prefix(paths::ENTRY_PREFIX)?.parse().ok()?;
        let entry = snapshot.entries.get(index)?;
        Some(Scroll::new(&Self::key(path), json!(entry)).set_type(types::ENTRY))
    }
}

impl Namespace for RegistryNamespace {
    fn read(&self, path: &str) -> NineSResult<Option<Scroll>> {
        let snapshot = self.state.borrow().clone();
        Ok(Some(match path {
            paths::STATUS | "" | "/" => Self::read_status(&snapshot),
            paths::ACCOUNT => Scroll::new(&Self::key(path), json!({
                "account": snapshot.account,
                "short": snapshot.account.as_ref().map(|a| a.short()),
            }))
            .set_type(types::ACCOUNT),
            paths::NETWORK => Scroll::new(&Self::key(path), json!({
                "network_id": snapshot.network_id,
                "required_network_id": snapshot.required_network_id,
                "matches": snapshot.network_id == Some(snapshot.required_network_id),
            }))
            .set_type(types::NETWORK),
            paths::ENTRIES => Scroll::new(&Self::key(path), json!({
                "entries": snapshot.entries,
                "count": snapshot.entries.len(),
            }))
            .set_type(types::ENTRIES),
            _ => return Ok(Self::read_entry(&snapshot, path)),
        }))
    }

    fn write(&self, path: &str, _: Value) -> NineSResult<Scroll> {
        Err(NineSError::Other(format!("read-only: {}{}", paths::MOUNT, path)))
    }

    fn list(&self, _: &str) -> NineSResult<Vec<String>> {
        let count = self.state.borrow().entries.len();
        let mut all: Vec<String> = paths::ALL.iter().map(|s| (*s).into()).collect();
        all.extend((0..count).map(|i| format!("{}{}", paths::ENTRY_PREFIX, i)));
        Ok(all)
    }
}
