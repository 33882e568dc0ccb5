//! Chain primitives: chain ids, account addresses, and the network parameters
//! handed to a wallet when it has never heard of the required chain.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Hardhat's default local chain id.
pub const HARDHAT_CHAIN_ID: u64 = 31337;
/// Hardhat's default JSON-RPC endpoint.
pub const HARDHAT_RPC_URL: &str = "http://127.0.0.1:8545";
/// Address of the first contract deployed by the first hardhat account.
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("invalid chain id: {0}")]
    InvalidChainId(String),
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// EIP-155 chain identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl ChainId {
    pub const HARDHAT: ChainId = ChainId(HARDHAT_CHAIN_ID);

    /// Quantity encoding used by wallets: `0x7a69` for 31337.
    pub fn to_hex(&self) -> String { format!("{:#x}", self.0) }

    /// Accepts `0x`-prefixed quantities and plain decimals.
    pub fn parse(value: &str) -> Result<Self, ChainError> {
        let value = value.trim();
        let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => value.parse::<u64>(),
        };
        parsed.map(ChainId).map_err(|_| ChainError::InvalidChainId(value.to_string()))
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl FromStr for ChainId {
    type Err = ChainError;
    fn from_str(s: &str) -> Result<Self, Self::Err> { Self::parse(s) }
}

/// 20-byte account or contract address, kept in lowercase `0x` hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn parse(value: &str) -> Result<Self, ChainError> {
        let trimmed = value.trim();
        let body = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| ChainError::InvalidAddress(value.to_string()))?;
        let bytes = hex::decode(body).map_err(|_| ChainError::InvalidAddress(value.to_string()))?;
        if bytes.len() != 20 {
            return Err(ChainError::InvalidAddress(value.to_string()));
        }
        Ok(Self(format!("0x{}", hex::encode(bytes))))
    }

    /// Caller guarantees `value` is already lowercase `0x` + 40 hex digits.
    pub(crate) fn from_normalized(value: &str) -> Self { Self(value.to_string()) }

    pub fn as_str(&self) -> &str { &self.0 }

    /// Abbreviated form for display: `0x5fbd...0aa3`.
    pub fn short(&self) -> String {
        format!("{}...{}", &self.0[..6], &self.0[self.0.len() - 4..])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl FromStr for Address {
    type Err = ChainError;
    fn from_str(s: &str) -> Result<Self, Self::Err> { Self::parse(s) }
}

impl TryFrom<String> for Address {
    type Error = ChainError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::parse(&value) }
}

impl From<Address> for String {
    fn from(address: Address) -> Self { address.0 }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Everything a wallet needs to add the required chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkParams {
    pub chain_id: ChainId,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
}

impl Default for NetworkParams {
    fn default() -> Self { Self::hardhat() }
}

impl NetworkParams {
    pub fn hardhat() -> Self {
        Self {
            chain_id: ChainId::HARDHAT,
            chain_name: "Hardhat Local".into(),
            native_currency: NativeCurrency { name: "ETH".into(), symbol: "ETH".into(), decimals: 18 },
            rpc_urls: vec![HARDHAT_RPC_URL.into()],
        }
    }

    pub fn rpc_url(&self) -> &str {
        self.rpc_urls.first().map(String::as_str).unwrap_or(HARDHAT_RPC_URL)
    }

    /// Parameter object for `wallet_addEthereumChain`.
    pub fn to_wallet_params(&self) -> serde_json::Value {
        serde_json::json!({
            "chainId": self.chain_id.to_hex(),
            "chainName": self.chain_name,
            "nativeCurrency": self.native_currency,
            "rpcUrls": self.rpc_urls,
        })
    }
}
