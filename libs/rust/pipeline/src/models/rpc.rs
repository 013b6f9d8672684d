//! Raw payload shapes for the JSON-RPC provider (Alchemy/Infura style).
//! Quantities arrive as 0x-prefixed hex strings; `alchemy_getAssetTransfers`
//! additionally carries a provider-scaled decimal `value`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct RpcRequest<'a, P: Serialize> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: P,
}

impl<'a, P: Serialize> RpcRequest<'a, P> {
    pub fn new(method: &'a str, params: P) -> Self {
        Self {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RpcEnvelope<T> {
    pub result: Option<T>,
    pub error: Option<RpcErrorObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorObject {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// `alchemy_getAssetTransfers` result.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAssetTransfersResult {
    #[serde(default)]
    pub transfers: Vec<RawAssetTransfer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAssetTransfer {
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    /// Already scaled by the asset's decimals when present.
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub asset: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default, rename = "blockNum")]
    pub block_num: String,
    #[serde(default, rename = "rawContract")]
    pub raw_contract: RawContract,
    #[serde(default)]
    pub metadata: RawTransferMetadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawContract {
    #[serde(default)]
    pub address: Option<String>,
    /// Hex wei amount.
    #[serde(default)]
    pub value: Option<String>,
    /// Hex decimals.
    #[serde(default)]
    pub decimal: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTransferMetadata {
    /// ISO-8601 block timestamp.
    #[serde(default, rename = "blockTimestamp")]
    pub block_timestamp: String,
}

/// `alchemy_getTokenBalances` result.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTokenBalancesResult {
    #[serde(default)]
    pub address: String,
    #[serde(default, rename = "tokenBalances")]
    pub token_balances: Vec<RawTokenBalance>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTokenBalance {
    #[serde(default, rename = "contractAddress")]
    pub contract_address: String,
    /// Hex token amount, unscaled.
    #[serde(default, rename = "tokenBalance")]
    pub token_balance: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}
