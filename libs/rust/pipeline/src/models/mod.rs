pub mod etherscan;
pub mod rpc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::directory::Address;

/// Which upstream produced a canonical record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Etherscan,
    Rpc,
    Fallback,
}

/// A normalized transaction. `value` is a decimal ETH string (already
/// divided by 10^18) and `gas_price` a decimal gwei string; raw integer
/// wei amounts never leave the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub hash: String,
    pub from: Address,
    pub to: Address,
    pub value: String,
    pub gas: u64,
    pub gas_price: String,
    pub gas_used: u64,
    pub block_number: u64,
    pub confirmations: u64,
    pub timestamp: DateTime<Utc>,
    pub is_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_symbol: Option<String>,
    pub token_decimal: u32,
    pub source: DataSource,
    pub transformed_at: DateTime<Utc>,
}

/// A normalized ERC-20/721/1155 transfer. `value` is scaled by the
/// token's own decimals, not a fixed 18.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenTransfer {
    pub hash: String,
    pub from: Address,
    pub to: Address,
    pub value: String,
    pub contract_address: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_symbol: Option<String>,
    pub token_decimal: u32,
    pub block_number: u64,
    pub timestamp: DateTime<Utc>,
    pub source: DataSource,
    pub transformed_at: DateTime<Utc>,
}

/// An ERC-20 position held by a directory wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenHolding {
    pub address: Address,
    pub contract_address: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_symbol: Option<String>,
    pub token_decimal: u32,
    pub balance: String,
    pub source: DataSource,
    pub transformed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSnapshot {
    pub address: Address,
    pub balance: String,
    pub timestamp: DateTime<Utc>,
    pub source: DataSource,
    pub transformed_at: DateTime<Utc>,
}

/// Gas price tiers in integer gwei.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasPriceSnapshot {
    pub safe_low: u64,
    pub standard: u64,
    pub fast: u64,
    pub timestamp: DateTime<Utc>,
    pub source: DataSource,
}
