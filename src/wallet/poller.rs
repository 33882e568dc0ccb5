//! EventPoller - wallet events for transports that cannot push them
//!
//! A plain node endpoint has no `accountsChanged` / `chainChanged`
//! subscriptions, so the poller diffs `eth_accounts` and `eth_chainId`
//! between rounds.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use super::{parse_accounts, parse_chain_id, WalletEvent};
use crate::core::chain::{Address, ChainId};
use crate::rpc::{RpcResult, Transport};

pub struct EventPoller<T> {
    transport: Arc<T>,
    interval: Duration,
    accounts: Option<Vec<Address>>,
    chain: Option<ChainId>,
}

impl<T: Transport> EventPoller<T> {
    pub fn new(transport: Arc<T>, interval: Duration) -> Self {
        Self { transport, interval, accounts: None, chain: None }
    }

    /// One round. The first round records a baseline and reports nothing.
    pub async fn poll(&mut self) -> RpcResult<Vec<WalletEvent>> {
        let accounts = parse_accounts(self.transport.request("eth_accounts", json!([])).await?)?;
        let chain = parse_chain_id(self.transport.request("eth_chainId", json!([])).await?)?;

        let mut events = Vec::new();
        if let Some(previous) = self.chain {
            if previous != chain {
                events.push(WalletEvent::ChainChanged(chain));
            }
        }
        if let Some(previous) = &self.accounts {
            if *previous != accounts {
                events.push(WalletEvent::AccountsChanged(accounts.clone()));
            }
        }
        self.chain = Some(chain);
        self.accounts = Some(accounts);
        Ok(events)
    }

    /// Poll until something changes.
    pub async fn next(&mut self) -> RpcResult<Vec<WalletEvent>> {
        loop {
            let events = self.poll().await?;
            if !events.is_empty() {
                return Ok(events);
            }
            self.transport.pause(self.interval).await;
        }
    }
}
