//! Field normalization: every raw provider record is projected into
//! exactly one canonical record. All helpers here are total; malformed
//! input degrades to a defined default instead of failing the pipeline.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

use crate::directory::Address;
use crate::models::{
    etherscan, rpc, BalanceSnapshot, DataSource, GasPriceSnapshot, TokenHolding, TokenTransfer,
    Transaction,
};

pub const ETH_DECIMALS: u32 = 18;
pub const GWEI_DECIMALS: u32 = 9;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
}

/// Converts an integer wei string into a decimal string scaled by
/// `10^decimals`. Absent, empty, zero or unparseable input yields `"0"`.
/// Input that already carries a decimal point is treated as scaled and
/// passed through (re-normalizing a canonical record is a no-op).
pub fn format_wei_value(raw: Option<&str>, decimals: u32) -> String {
    let raw = match raw {
        Some(raw) => raw.trim(),
        None => return "0".to_string(),
    };
    if raw.is_empty() {
        return "0".to_string();
    }
    if raw.contains('.') {
        return raw
            .parse::<f64>()
            .map(format_decimal)
            .unwrap_or_else(|_| "0".to_string());
    }
    match raw.parse::<u128>() {
        Ok(0) => "0".to_string(),
        Ok(wei) => format_decimal(wei as f64 / 10f64.powi(decimals as i32)),
        Err(_) => "0".to_string(),
    }
}

pub(crate) fn format_decimal(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    format!("{value}")
}

/// Parses the three timestamp shapes the upstreams produce: unix seconds
/// (numeric string), RFC 3339, or nothing. Never fails; malformed input
/// falls back to the current time.
pub fn parse_timestamp(raw: Option<&str>) -> DateTime<Utc> {
    let raw = match raw {
        Some(raw) => raw.trim(),
        None => return Utc::now(),
    };
    if raw.is_empty() {
        return Utc::now();
    }
    if raw.chars().all(|c| c.is_ascii_digit()) {
        return raw
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or_else(Utc::now);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

pub fn timestamp_from_unix(secs: u64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs as i64, 0).unwrap_or_else(Utc::now)
}

/// Decodes a 0x-prefixed hex quantity.
pub fn hex_quantity(raw: &str) -> Option<u128> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))?;
    u128::from_str_radix(digits, 16).ok()
}

fn parse_u64(raw: &str) -> u64 {
    raw.trim().parse().unwrap_or(0)
}

fn parse_gwei(raw: &str) -> u64 {
    raw.trim().parse::<f64>().map(|g| g.round() as u64).unwrap_or(0)
}

fn optional_address(raw: &str) -> Option<Address> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(Address::normalized(trimmed))
    }
}

fn optional_string(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn token_decimals(raw: &str) -> u32 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 18;
    }
    trimmed.parse().unwrap_or(0)
}

pub fn transform_transaction(
    raw: &etherscan::RawTransaction,
    source: DataSource,
) -> Result<Transaction, TransformError> {
    if raw.hash.trim().is_empty() {
        return Err(TransformError::MissingField("hash"));
    }
    Ok(Transaction {
        hash: raw.hash.trim().to_string(),
        from: Address::normalized(&raw.from),
        to: Address::normalized(&raw.to),
        value: format_wei_value(Some(&raw.value), ETH_DECIMALS),
        gas: parse_u64(&raw.gas),
        gas_price: format_wei_value(Some(&raw.gas_price), GWEI_DECIMALS),
        gas_used: parse_u64(&raw.gas_used),
        block_number: parse_u64(&raw.block_number),
        confirmations: parse_u64(&raw.confirmations),
        timestamp: parse_timestamp(Some(&raw.time_stamp)),
        is_error: raw.is_error.trim() == "1",
        contract_address: optional_address(&raw.contract_address),
        token_name: None,
        token_symbol: None,
        token_decimal: 0,
        source,
        transformed_at: Utc::now(),
    })
}

pub fn transform_token_transfer(
    raw: &etherscan::RawTokenTransfer,
    source: DataSource,
) -> Result<TokenTransfer, TransformError> {
    if raw.hash.trim().is_empty() {
        return Err(TransformError::MissingField("hash"));
    }
    let token_decimal = token_decimals(&raw.token_decimal);
    Ok(TokenTransfer {
        hash: raw.hash.trim().to_string(),
        from: Address::normalized(&raw.from),
        to: Address::normalized(&raw.to),
        value: format_wei_value(Some(&raw.value), token_decimal),
        contract_address: Address::normalized(&raw.contract_address),
        token_name: optional_string(&raw.token_name),
        token_symbol: optional_string(&raw.token_symbol),
        token_decimal,
        block_number: parse_u64(&raw.block_number),
        timestamp: parse_timestamp(Some(&raw.time_stamp)),
        source,
        transformed_at: Utc::now(),
    })
}

pub fn transform_balance(address: &Address, raw_wei: &str, source: DataSource) -> BalanceSnapshot {
    BalanceSnapshot {
        address: address.clone(),
        balance: format_wei_value(Some(raw_wei), ETH_DECIMALS),
        timestamp: Utc::now(),
        source,
        transformed_at: Utc::now(),
    }
}

pub fn transform_gas_price(raw: &etherscan::RawGasOracle, source: DataSource) -> GasPriceSnapshot {
    GasPriceSnapshot {
        safe_low: parse_gwei(&raw.safe_gas_price),
        standard: parse_gwei(&raw.propose_gas_price),
        fast: parse_gwei(&raw.fast_gas_price),
        timestamp: Utc::now(),
        source,
    }
}

pub fn transform_token_holding(
    owner: &Address,
    raw: &etherscan::RawTokenBalance,
    source: DataSource,
) -> Result<TokenHolding, TransformError> {
    if raw.token_address.trim().is_empty() {
        return Err(TransformError::MissingField("TokenAddress"));
    }
    let token_decimal = token_decimals(&raw.token_divisor);
    Ok(TokenHolding {
        address: owner.clone(),
        contract_address: Address::normalized(&raw.token_address),
        token_name: optional_string(&raw.token_name),
        token_symbol: optional_string(&raw.token_symbol),
        token_decimal,
        balance: format_wei_value(Some(&raw.token_quantity), token_decimal),
        source,
        transformed_at: Utc::now(),
    })
}

/// Maps an `alchemy_getAssetTransfers` record with an ERC-* category into
/// a canonical token transfer.
pub fn transform_asset_transfer(
    raw: &rpc::RawAssetTransfer,
    source: DataSource,
) -> Result<TokenTransfer, TransformError> {
    if raw.hash.trim().is_empty() {
        return Err(TransformError::MissingField("hash"));
    }
    let token_decimal = raw
        .raw_contract
        .decimal
        .as_deref()
        .and_then(hex_quantity)
        .map(|d| d as u32)
        .unwrap_or(18);
    let value = asset_transfer_value(raw, token_decimal);
    Ok(TokenTransfer {
        hash: raw.hash.trim().to_string(),
        from: Address::normalized(&raw.from),
        to: Address::normalized(&raw.to),
        value,
        contract_address: Address::normalized(raw.raw_contract.address.as_deref().unwrap_or("")),
        token_name: None,
        token_symbol: raw.asset.as_deref().and_then(|a| optional_string(a)),
        token_decimal,
        block_number: hex_quantity(&raw.block_num).map(|b| b as u64).unwrap_or(0),
        timestamp: parse_timestamp(Some(&raw.metadata.block_timestamp)),
        source,
        transformed_at: Utc::now(),
    })
}

/// Maps an `alchemy_getAssetTransfers` record with the `external`
/// category into a canonical transaction. Gas data is not part of the
/// transfers payload, so those fields stay zero.
pub fn transform_external_transfer(
    raw: &rpc::RawAssetTransfer,
    source: DataSource,
) -> Result<Transaction, TransformError> {
    if raw.hash.trim().is_empty() {
        return Err(TransformError::MissingField("hash"));
    }
    let value = asset_transfer_value(raw, ETH_DECIMALS);
    Ok(Transaction {
        hash: raw.hash.trim().to_string(),
        from: Address::normalized(&raw.from),
        to: Address::normalized(&raw.to),
        value,
        gas: 0,
        gas_price: "0".to_string(),
        gas_used: 0,
        block_number: hex_quantity(&raw.block_num).map(|b| b as u64).unwrap_or(0),
        confirmations: 0,
        timestamp: parse_timestamp(Some(&raw.metadata.block_timestamp)),
        is_error: false,
        contract_address: None,
        token_name: None,
        token_symbol: raw.asset.as_deref().and_then(|a| optional_string(a)),
        token_decimal: 0,
        source,
        transformed_at: Utc::now(),
    })
}

fn asset_transfer_value(raw: &rpc::RawAssetTransfer, decimals: u32) -> String {
    match raw.value {
        Some(scaled) => format_decimal(scaled),
        None => raw
            .raw_contract
            .value
            .as_deref()
            .and_then(hex_quantity)
            .map(|wei| format_wei_value(Some(&wei.to_string()), decimals))
            .unwrap_or_else(|| "0".to_string()),
    }
}

pub fn transform_rpc_token_balance(
    owner: &Address,
    raw: &rpc::RawTokenBalance,
    source: DataSource,
) -> Result<TokenHolding, TransformError> {
    if raw.contract_address.trim().is_empty() {
        return Err(TransformError::MissingField("contractAddress"));
    }
    let balance = raw
        .token_balance
        .as_deref()
        .and_then(hex_quantity)
        .map(|amount| format_wei_value(Some(&amount.to_string()), 18))
        .unwrap_or_else(|| "0".to_string());
    Ok(TokenHolding {
        address: owner.clone(),
        contract_address: Address::normalized(&raw.contract_address),
        // token metadata is a separate RPC call the adapter does not make
        token_name: None,
        token_symbol: None,
        token_decimal: 18,
        balance,
        source,
        transformed_at: Utc::now(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Address,
    Wei,
    Timestamp,
}

pub type Schema = HashMap<&'static str, FieldType>;

lazy_static! {
    pub static ref TRANSACTION_SCHEMA: Schema = HashMap::from([
        ("hash", FieldType::String),
        ("from", FieldType::Address),
        ("to", FieldType::Address),
        ("value", FieldType::Wei),
        ("gas", FieldType::Number),
        ("gasPrice", FieldType::Wei),
        ("gasUsed", FieldType::Number),
        ("blockNumber", FieldType::Number),
        ("timestamp", FieldType::Timestamp),
        ("isError", FieldType::Boolean),
    ]);
    pub static ref TOKEN_TRANSFER_SCHEMA: Schema = HashMap::from([
        ("hash", FieldType::String),
        ("from", FieldType::Address),
        ("to", FieldType::Address),
        ("value", FieldType::Wei),
        ("contractAddress", FieldType::Address),
        ("blockNumber", FieldType::Number),
        ("timestamp", FieldType::Timestamp),
    ]);
    pub static ref TOKEN_HOLDING_SCHEMA: Schema = HashMap::from([
        ("address", FieldType::Address),
        ("contractAddress", FieldType::Address),
        ("balance", FieldType::Wei),
        ("tokenDecimal", FieldType::Number),
    ]);
    pub static ref BALANCE_SCHEMA: Schema = HashMap::from([
        ("address", FieldType::Address),
        ("balance", FieldType::Wei),
        ("timestamp", FieldType::Timestamp),
    ]);
    pub static ref GAS_PRICE_SCHEMA: Schema = HashMap::from([
        ("safeLow", FieldType::Number),
        ("standard", FieldType::Number),
        ("fast", FieldType::Number),
        ("timestamp", FieldType::Timestamp),
    ]);
    static ref ADDRESS_RE: Regex = Regex::new(r"^0x[0-9a-f]{40}$").unwrap();
    static ref WEI_RE: Regex = Regex::new(r"^[0-9]+(\.[0-9]+)?$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// Walks a flat schema over a serialized record, reporting every missing
/// field and type mismatch. Advisory: callers log the report, they do not
/// reject records over it.
pub fn validate_transformed(value: &Value, schema: &Schema) -> ValidationReport {
    let object = match value.as_object() {
        Some(object) => object,
        None => {
            return ValidationReport {
                is_valid: false,
                errors: vec!["expected a JSON object".to_string()],
            }
        }
    };
    let mut errors = Vec::new();
    for (field, expected) in schema {
        match object.get(*field) {
            None | Some(Value::Null) => errors.push(format!("missing field `{field}`")),
            Some(actual) => {
                if let Some(problem) = check_type(actual, *expected) {
                    errors.push(format!("field `{field}`: {problem}"));
                }
            }
        }
    }
    errors.sort();
    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
    }
}

fn check_type(value: &Value, expected: FieldType) -> Option<String> {
    match expected {
        FieldType::String => {
            if value.is_string() {
                None
            } else {
                Some("expected a string".to_string())
            }
        }
        FieldType::Number => {
            if value.is_number() {
                None
            } else {
                Some("expected a number".to_string())
            }
        }
        FieldType::Boolean => {
            if value.is_boolean() {
                None
            } else {
                Some("expected a boolean".to_string())
            }
        }
        FieldType::Address => match value.as_str() {
            Some(s) if ADDRESS_RE.is_match(s) => None,
            Some(s) => Some(format!("`{s}` is not a lowercase hex address")),
            None => Some("expected an address string".to_string()),
        },
        FieldType::Wei => match value.as_str() {
            Some(s) if WEI_RE.is_match(s) => None,
            Some(s) => Some(format!("`{s}` is not a decimal amount string")),
            None => Some("expected an amount string".to_string()),
        },
        FieldType::Timestamp => match value.as_str() {
            Some(s) if DateTime::parse_from_rfc3339(s).is_ok() => None,
            Some(s) => Some(format!("`{s}` is not an ISO-8601 timestamp")),
            None => Some("expected a timestamp string".to_string()),
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchStats {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchError {
    pub index: usize,
    pub message: String,
}

#[derive(Debug)]
pub struct BatchOutcome<T> {
    pub transformed: Vec<T>,
    pub errors: Vec<BatchError>,
    pub stats: BatchStats,
}

/// Applies `transformer` to each item independently. One malformed record
/// lands in `errors` and is dropped from the output; it never aborts the
/// batch. Schema validation runs on every successful record but only
/// warns.
pub fn transform_batch<R, T, F>(items: &[R], transformer: F, schema: &Schema) -> BatchOutcome<T>
where
    T: Serialize,
    F: Fn(&R) -> Result<T, TransformError>,
{
    let mut transformed = Vec::with_capacity(items.len());
    let mut errors = Vec::new();
    for (index, item) in items.iter().enumerate() {
        match transformer(item) {
            Ok(record) => {
                match serde_json::to_value(&record) {
                    Ok(as_json) => {
                        let report = validate_transformed(&as_json, schema);
                        if !report.is_valid {
                            warn!(index, errors = ?report.errors, "transformed record failed schema validation");
                        }
                    }
                    Err(e) => {
                        warn!(index, error = %e, "could not serialize record for validation")
                    }
                }
                transformed.push(record);
            }
            Err(e) => errors.push(BatchError {
                index,
                message: e.to_string(),
            }),
        }
    }
    let stats = BatchStats {
        total: items.len(),
        successful: transformed.len(),
        failed: errors.len(),
    };
    BatchOutcome {
        transformed,
        errors,
        stats,
    }
}

#[cfg(test)]
mod transform_tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn sample_raw_transaction() -> etherscan::RawTransaction {
        etherscan::RawTransaction {
            hash: "0xabc123".to_string(),
            from: "0xFe89cc7aBB2C4183683ab71653C4cdc9B02D44b7".to_string(),
            to: "0x2686A8919Df194aA7673244549E68D42C1685d03".to_string(),
            value: "1000000000000000000".to_string(),
            gas: "21000".to_string(),
            gas_price: "25000000000".to_string(),
            gas_used: "21000".to_string(),
            block_number: "18570000".to_string(),
            confirmations: "120".to_string(),
            time_stamp: "1700000000".to_string(),
            is_error: "0".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn one_ether_in_wei_normalizes_to_one() {
        let tx = transform_transaction(&sample_raw_transaction(), DataSource::Etherscan).unwrap();
        assert_eq!(tx.value, "1");
        assert_eq!(tx.gas_price, "25");
    }

    #[test]
    fn addresses_are_lowercased() {
        let tx = transform_transaction(&sample_raw_transaction(), DataSource::Etherscan).unwrap();
        assert_eq!(tx.from.as_str(), "0xfe89cc7abb2c4183683ab71653c4cdc9b02d44b7");
        assert_eq!(tx.to.as_str(), "0x2686a8919df194aa7673244549e68d42c1685d03");
    }

    #[test]
    fn unix_seconds_normalize_to_the_exact_instant() {
        let expected = Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap();
        assert_eq!(parse_timestamp(Some("1700000000")), expected);
        assert_eq!(timestamp_from_unix(1_700_000_000), expected);
        let tx = transform_transaction(&sample_raw_transaction(), DataSource::Etherscan).unwrap();
        assert_eq!(tx.timestamp, expected);
    }

    #[test]
    fn rfc3339_timestamps_pass_through() {
        let expected = Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap();
        assert_eq!(parse_timestamp(Some("2023-11-14T22:13:20Z")), expected);
        assert_eq!(parse_timestamp(Some("2023-11-14T22:13:20+00:00")), expected);
    }

    #[test]
    fn malformed_timestamps_fall_back_to_now() {
        let before = Utc::now();
        let parsed = parse_timestamp(Some("not a time"));
        assert!(parsed >= before);
        let parsed = parse_timestamp(None);
        assert!(parsed >= before);
    }

    #[test]
    fn wei_formatting_edge_cases() {
        assert_eq!(format_wei_value(None, 18), "0");
        assert_eq!(format_wei_value(Some(""), 18), "0");
        assert_eq!(format_wei_value(Some("0"), 18), "0");
        assert_eq!(format_wei_value(Some("garbage"), 18), "0");
        assert_eq!(format_wei_value(Some("-5"), 18), "0");
        assert_eq!(format_wei_value(Some("1500000"), 6), "1.5");
        assert_eq!(format_wei_value(Some("1000000000000000000"), 18), "1");
    }

    #[test]
    fn is_error_maps_only_the_literal_one() {
        let mut raw = sample_raw_transaction();
        raw.is_error = "1".to_string();
        assert!(transform_transaction(&raw, DataSource::Etherscan).unwrap().is_error);
        raw.is_error = "0".to_string();
        assert!(!transform_transaction(&raw, DataSource::Etherscan).unwrap().is_error);
        raw.is_error = String::new();
        assert!(!transform_transaction(&raw, DataSource::Etherscan).unwrap().is_error);
    }

    #[test]
    fn unparseable_integers_default_to_zero() {
        let mut raw = sample_raw_transaction();
        raw.gas = "lots".to_string();
        raw.confirmations = String::new();
        let tx = transform_transaction(&raw, DataSource::Etherscan).unwrap();
        assert_eq!(tx.gas, 0);
        assert_eq!(tx.confirmations, 0);
    }

    #[test]
    fn normalization_is_a_projection() {
        // Re-feeding an already-canonical record must not change it.
        let canonical =
            transform_transaction(&sample_raw_transaction(), DataSource::Etherscan).unwrap();
        let reencoded = etherscan::RawTransaction {
            hash: canonical.hash.clone(),
            from: canonical.from.to_string(),
            to: canonical.to.to_string(),
            value: "2.5".to_string(),
            gas: canonical.gas.to_string(),
            gas_price: canonical.gas_price.clone(),
            gas_used: canonical.gas_used.to_string(),
            block_number: canonical.block_number.to_string(),
            confirmations: canonical.confirmations.to_string(),
            time_stamp: canonical.timestamp.to_rfc3339(),
            is_error: if canonical.is_error { "1" } else { "0" }.to_string(),
            ..Default::default()
        };
        let first = transform_transaction(&reencoded, DataSource::Etherscan).unwrap();
        let second = transform_transaction(&reencoded, DataSource::Etherscan).unwrap();
        assert_eq!(first.value, "2.5");
        assert_eq!(first.hash, second.hash);
        assert_eq!(first.from, second.from);
        assert_eq!(first.to, second.to);
        assert_eq!(first.value, second.value);
        assert_eq!(first.gas_price, second.gas_price);
        assert_eq!(first.timestamp, second.timestamp);
        assert_eq!(first.timestamp, canonical.timestamp);
    }

    #[test]
    fn token_transfers_scale_by_their_own_decimals() {
        let raw = etherscan::RawTokenTransfer {
            hash: "0xdef456".to_string(),
            from: "0xAAA0000000000000000000000000000000000aaa".to_string(),
            to: "0xBBB0000000000000000000000000000000000bbb".to_string(),
            value: "2500000".to_string(),
            contract_address: "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48".to_string(),
            token_name: "USD Coin".to_string(),
            token_symbol: "USDC".to_string(),
            token_decimal: "6".to_string(),
            block_number: "18570001".to_string(),
            time_stamp: "1700000060".to_string(),
            confirmations: "12".to_string(),
        };
        let transfer = transform_token_transfer(&raw, DataSource::Etherscan).unwrap();
        assert_eq!(transfer.value, "2.5");
        assert_eq!(transfer.token_decimal, 6);
        assert_eq!(
            transfer.contract_address.as_str(),
            "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"
        );
    }

    #[test]
    fn gas_oracle_tiers_parse_as_integer_gwei() {
        let raw = etherscan::RawGasOracle {
            safe_gas_price: "14.2".to_string(),
            propose_gas_price: "15".to_string(),
            fast_gas_price: "17.8".to_string(),
            ..Default::default()
        };
        let gas = transform_gas_price(&raw, DataSource::Etherscan);
        assert_eq!((gas.safe_low, gas.standard, gas.fast), (14, 15, 18));
    }

    #[test]
    fn hex_quantities_decode() {
        assert_eq!(hex_quantity("0xde0b6b3a7640000"), Some(1_000_000_000_000_000_000));
        assert_eq!(hex_quantity("0x0"), Some(0));
        assert_eq!(hex_quantity("12"), None);
        assert_eq!(hex_quantity("0xzz"), None);
    }

    #[test]
    fn asset_transfers_prefer_the_scaled_value() {
        let raw = rpc::RawAssetTransfer {
            hash: "0x123".to_string(),
            from: "0xAAA0000000000000000000000000000000000aaa".to_string(),
            to: "0xBBB0000000000000000000000000000000000bbb".to_string(),
            value: Some(12.75),
            asset: Some("ENS".to_string()),
            block_num: "0x11b4e50".to_string(),
            metadata: rpc::RawTransferMetadata {
                block_timestamp: "2023-11-14T22:13:20Z".to_string(),
            },
            ..Default::default()
        };
        let transfer = transform_asset_transfer(&raw, DataSource::Rpc).unwrap();
        assert_eq!(transfer.value, "12.75");
        assert_eq!(transfer.token_symbol.as_deref(), Some("ENS"));
        assert_eq!(transfer.block_number, 0x11b4e50);
    }

    #[test]
    fn batch_isolates_malformed_records() {
        let mut items = vec![sample_raw_transaction(); 5];
        items[1].hash = String::new();
        items[3].hash = "   ".to_string();
        let outcome = transform_batch(
            &items,
            |raw| transform_transaction(raw, DataSource::Etherscan),
            &TRANSACTION_SCHEMA,
        );
        assert_eq!(outcome.stats, BatchStats { total: 5, successful: 3, failed: 2 });
        assert_eq!(outcome.transformed.len(), 3);
        let failed_indices: Vec<usize> = outcome.errors.iter().map(|e| e.index).collect();
        assert_eq!(failed_indices, vec![1, 3]);
    }

    #[test]
    fn validator_reports_every_problem() {
        let tx = transform_transaction(&sample_raw_transaction(), DataSource::Etherscan).unwrap();
        let as_json = serde_json::to_value(&tx).unwrap();
        let report = validate_transformed(&as_json, &TRANSACTION_SCHEMA);
        assert!(report.is_valid, "unexpected errors: {:?}", report.errors);

        let broken = serde_json::json!({
            "hash": "0xabc",
            "from": "0xFE89cc7abb2c4183683ab71653c4cdc9b02d44b7",
            "value": "1.0",
            "gas": "21000",
            "isError": false,
        });
        let report = validate_transformed(&broken, &TRANSACTION_SCHEMA);
        assert!(!report.is_valid);
        // mixed-case address, string-typed gas, and five missing fields
        assert!(report.errors.iter().any(|e| e.contains("`from`")));
        assert!(report.errors.iter().any(|e| e.contains("`gas`")));
        assert_eq!(report.errors.iter().filter(|e| e.starts_with("missing")).count(), 5);

        let report = validate_transformed(&serde_json::json!([1, 2]), &TRANSACTION_SCHEMA);
        assert!(!report.is_valid);
    }

    #[test]
    fn balance_and_gas_records_validate_against_their_schemas() {
        let address = Address::normalized("0xFe89cc7aBB2C4183683ab71653C4cdc9B02D44b7");
        let balance = transform_balance(&address, "1000000000000000000", DataSource::Etherscan);
        let report = validate_transformed(&serde_json::to_value(&balance).unwrap(), &BALANCE_SCHEMA);
        assert!(report.is_valid, "unexpected errors: {:?}", report.errors);

        let gas = transform_gas_price(&etherscan::RawGasOracle::default(), DataSource::Etherscan);
        let report = validate_transformed(&serde_json::to_value(&gas).unwrap(), &GAS_PRICE_SCHEMA);
        assert!(report.is_valid, "unexpected errors: {:?}", report.errors);
    }

    proptest! {
        #[test]
        fn wei_scaling_tracks_float_division(wei: u64, decimals in prop_oneof![Just(6u32), Just(18u32)]) {
            let formatted = format_wei_value(Some(&wei.to_string()), decimals);
            let parsed: f64 = formatted.parse().unwrap();
            let expected = wei as f64 / 10f64.powi(decimals as i32);
            let tolerance = (expected.abs() * 1e-12).max(f64::EPSILON);
            prop_assert!((parsed - expected).abs() <= tolerance,
                "{formatted} != {expected}");
        }

        #[test]
        fn timestamp_parsing_is_total(input in ".*") {
            // Never panics, always produces a representable instant.
            let parsed = parse_timestamp(Some(&input));
            prop_assert!(parsed.timestamp() != i64::MIN);
        }

        #[test]
        fn wei_formatting_is_total(input in ".*", decimals in 0u32..=24) {
            let formatted = format_wei_value(Some(&input), decimals);
            prop_assert!(!formatted.is_empty());
        }
    }
}
