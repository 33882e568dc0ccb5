//! Session configuration - passed from higher layers

use std::time::Duration;

use crate::core::chain::{Address, ChainId, NetworkParams, DEFAULT_CONTRACT_ADDRESS};

pub const ENV_RPC_URL: &str = "VEHREG_RPC_URL";
pub const ENV_CONTRACT: &str = "VEHREG_CONTRACT";
pub const ENV_CHAIN_ID: &str = "VEHREG_CHAIN_ID";
pub const ENV_CHAIN_NAME: &str = "VEHREG_CHAIN_NAME";
pub const ENV_POLL_MS: &str = "VEHREG_POLL_MS";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {var}: {reason}")]
pub struct ConfigError {
    pub var: String,
    pub reason: String,
}

/// Session configuration. Defaults target a local hardhat node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Required network; also what the wallet is asked to add when it lacks it.
    pub network: NetworkParams,
    /// Registry contract address.
    pub contract: Address,
    /// Delay between receipt polls while waiting for confirmation.
    pub poll_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            network: NetworkParams::hardhat(),
            contract: Address::from_normalized(DEFAULT_CONTRACT_ADDRESS),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self { Self::default() }
    pub fn with_network(mut self, network: NetworkParams) -> Self { self.network = network; self }
    pub fn with_chain_id(mut self, chain: ChainId) -> Self { self.network.chain_id = chain; self }
    pub fn with_chain_name(mut self, name: impl Into<String>) -> Self { self.network.chain_name = name.into(); self }
    pub fn with_rpc_url(mut self, url: impl Into<String>) -> Self { self.network.rpc_urls = vec![url.into()]; self }
    pub fn with_contract(mut self, contract: Address) -> Self { self.contract = contract; self }
    pub fn with_poll_interval(mut self, interval: Duration) -> Self { self.poll_interval = interval; self }

    pub fn required_chain(&self) -> ChainId { self.network.chain_id }
    pub fn rpc_url(&self) -> &str { self.network.rpc_url() }

    /// Defaults overlaid with `VEHREG_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_env(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup`; unset or blank keys keep the current value.
    pub fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let invalid = |var: &str, reason: String| ConfigError { var: var.into(), reason };

        if let Some(url) = get(ENV_RPC_URL) {
            self = self.with_rpc_url(url);
        }
        if let Some(raw) = get(ENV_CONTRACT) {
            let contract = Address::parse(&raw).map_err(|e| invalid(ENV_CONTRACT, e.to_string()))?;
            self = self.with_contract(contract);
        }
        if let Some(raw) = get(ENV_CHAIN_ID) {
            let chain = ChainId::parse(&raw).map_err(|e| invalid(ENV_CHAIN_ID, e.to_string()))?;
            self = self.with_chain_id(chain);
        }
        if let Some(name) = get(ENV_CHAIN_NAME) {
            self = self.with_chain_name(name);
        }
        if let Some(raw) = get(ENV_POLL_MS) {
            let ms: u64 = raw.parse().map_err(|_| invalid(ENV_POLL_MS, format!("not a number: {raw}")))?;
            self = self.with_poll_interval(Duration::from_millis(ms));
        }
        Ok(self)
    }
}
