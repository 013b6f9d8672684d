//! Raw payload shapes for the Etherscan-compatible REST API. Every field
//! arrives as a string; defaults keep deserialization total so malformed
//! records reach the normalizer instead of failing the whole response.

use serde::{Deserialize, Serialize};

/// The REST envelope: `status` is `"1"` on success, `"0"` otherwise, and
/// `result` is endpoint-specific (string, array, or object).
#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub result: serde_json::Value,
}

/// One record from `module=account&action=txlist`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTransaction {
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub gas: String,
    #[serde(default, rename = "gasPrice")]
    pub gas_price: String,
    #[serde(default, rename = "gasUsed")]
    pub gas_used: String,
    #[serde(default, rename = "blockNumber")]
    pub block_number: String,
    #[serde(default)]
    pub confirmations: String,
    #[serde(default, rename = "timeStamp")]
    pub time_stamp: String,
    #[serde(default, rename = "isError")]
    pub is_error: String,
    #[serde(default, rename = "txreceipt_status")]
    pub txreceipt_status: String,
    #[serde(default, rename = "contractAddress")]
    pub contract_address: String,
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub nonce: String,
}

/// One record from `module=account&action=tokentx`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTokenTransfer {
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, rename = "contractAddress")]
    pub contract_address: String,
    #[serde(default, rename = "tokenName")]
    pub token_name: String,
    #[serde(default, rename = "tokenSymbol")]
    pub token_symbol: String,
    #[serde(default, rename = "tokenDecimal")]
    pub token_decimal: String,
    #[serde(default, rename = "blockNumber")]
    pub block_number: String,
    #[serde(default, rename = "timeStamp")]
    pub time_stamp: String,
    #[serde(default)]
    pub confirmations: String,
}

/// One record from `module=account&action=addresstokenbalance`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTokenBalance {
    #[serde(default, rename = "TokenAddress")]
    pub token_address: String,
    #[serde(default, rename = "TokenName")]
    pub token_name: String,
    #[serde(default, rename = "TokenSymbol")]
    pub token_symbol: String,
    #[serde(default, rename = "TokenQuantity")]
    pub token_quantity: String,
    #[serde(default, rename = "TokenDivisor")]
    pub token_divisor: String,
}

/// The `module=gastracker&action=gasoracle` result object. Tier values
/// are decimal gwei strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawGasOracle {
    #[serde(default, rename = "SafeGasPrice")]
    pub safe_gas_price: String,
    #[serde(default, rename = "ProposeGasPrice")]
    pub propose_gas_price: String,
    #[serde(default, rename = "FastGasPrice")]
    pub fast_gas_price: String,
    #[serde(default, rename = "suggestBaseFee")]
    pub suggest_base_fee: String,
    #[serde(default, rename = "LastBlock")]
    pub last_block: String,
}
