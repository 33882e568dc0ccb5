//! Session state: the binding, the view cache, and the published snapshot.

use serde::Serialize;
use std::sync::Arc;

use crate::core::chain::{Address, ChainId};
use crate::core::entry::{Entry, ViewCache};
use crate::core::errors::StatusMessage;

/// Live association of an account, a network, and a ledger handle.
pub(crate) struct Binding<L> {
    pub account: Address,
    pub network_id: ChainId,
    pub ledger: Arc<L>,
}

pub(crate) struct SessionInner<L> {
    pub binding: Option<Binding<L>>,
    /// Last chain reported by the wallet, kept after the binding is dropped.
    pub observed_network: Option<ChainId>,
    pub epoch: u64,
    pub cache: ViewCache,
    pub connecting: bool,
    pub submitting: bool,
    pub loading: bool,
    pub reload_required: bool,
    pub status: Option<StatusMessage>,
}

impl<L> Default for SessionInner<L> {
    fn default() -> Self {
        Self {
            binding: None,
            observed_network: None,
            epoch: 0,
            cache: ViewCache::new(),
            connecting: false,
            submitting: false,
            loading: false,
            reload_required: false,
            status: None,
        }
    }
}

impl<L> SessionInner<L> {
    pub fn snapshot(&self, required: ChainId) -> SessionSnapshot {
        SessionSnapshot {
            account: self.binding.as_ref().map(|b| b.account.clone()),
            network_id: self.binding.as_ref().map(|b| b.network_id).or(self.observed_network),
            required_network_id: required,
            connected: self.binding.is_some(),
            connecting: self.connecting,
            submitting: self.submitting,
            loading: self.loading,
            reload_required: self.reload_required,
            entries: self.cache.entries().to_vec(),
            status: self.status.clone(),
        }
    }
}

/// What the presentation layer sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub account: Option<Address>,
    pub network_id: Option<ChainId>,
    pub required_network_id: ChainId,
    /// A ledger handle is bound.
    pub connected: bool,
    pub connecting: bool,
    pub submitting: bool,
    pub loading: bool,
    pub reload_required: bool,
    pub entries: Vec<Entry>,
    pub status: Option<StatusMessage>,
}

/// Result of a successful `establish_binding`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub account: Address,
    pub network_id: ChainId,
    /// The wallet had to be moved onto the required chain.
    pub switched: bool,
}
