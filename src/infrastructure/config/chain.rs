//! Chain endpoint and contract addresses.

use std::str::FromStr;

use alloy_primitives::Address;
use serde::Deserialize;

use crate::error::{ConfigError, Result};
use crate::port::ContractSet;

/// Base mainnet.
pub const DEFAULT_CHAIN_ID: u64 = 8453;

/// Ledger network settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    /// JSON-RPC endpoint.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    /// Metered ERC-20 token.
    #[serde(default = "default_token")]
    pub token: String,
    /// Payable contract minting tokens for base currency.
    #[serde(default = "default_deposit_manager")]
    pub deposit_manager: String,
    /// Contract charging tokens per query.
    #[serde(default = "default_query_tool")]
    pub query_tool: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            chain_id: default_chain_id(),
            token: default_token(),
            deposit_manager: default_deposit_manager(),
            query_tool: default_query_tool(),
        }
    }
}

impl ChainConfig {
    /// Parsed RPC endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a malformed URL.
    pub fn rpc_url(&self) -> Result<url::Url> {
        self.rpc_url.parse().map_err(|e: url::ParseError| {
            ConfigError::InvalidValue {
                field: "rpc_url",
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Parsed contract addresses.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first bad address.
    pub fn contracts(&self) -> Result<ContractSet> {
        Ok(ContractSet {
            token: parse_address("token", &self.token)?,
            deposit_manager: parse_address("deposit_manager", &self.deposit_manager)?,
            query_tool: parse_address("query_tool", &self.query_tool)?,
        })
    }
}

fn parse_address(field: &'static str, value: &str) -> Result<Address> {
    Address::from_str(value.trim()).map_err(|e| {
        ConfigError::InvalidValue {
            field,
            reason: e.to_string(),
        }
        .into()
    })
}

fn default_rpc_url() -> String {
    "https://mainnet.base.org".into()
}

const fn default_chain_id() -> u64 {
    DEFAULT_CHAIN_ID
}

fn default_token() -> String {
    "0x121f6CD61DE0839a14823B97d751698013811d6f".into()
}

fn default_deposit_manager() -> String {
    "0xFF000Ac34DC506E10cb4116Ddaab336150aB96e9".into()
}

fn default_query_tool() -> String {
    "0x162857970E8807D706DAF3F0CA5aD2443F5A14f1".into()
}
