//! JSON-RPC adapter: the same `ChainDataProvider` contract spoken over
//! HTTPS POST to an Alchemy/Infura-style node endpoint. Hex quantities are
//! decoded into the same canonical records the REST client produces.

use reqwest_middleware::ClientWithMiddleware;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::instrument;

use super::{
    build_http_client, classify_send_error, degraded, fallback, ChainDataProvider, Fetched,
    FallbackReason, ProviderError,
};
use crate::directory::Address;
use crate::models::{
    rpc::{RawAssetTransfersResult, RawTokenBalancesResult, RpcEnvelope, RpcRequest},
    BalanceSnapshot, DataSource, GasPriceSnapshot, TokenHolding, TokenTransfer, Transaction,
};
use crate::transform::{
    hex_quantity, transform_balance, transform_batch, transform_external_transfer,
    transform_rpc_token_balance, transform_asset_transfer, TOKEN_HOLDING_SCHEMA,
    TOKEN_TRANSFER_SCHEMA, TRANSACTION_SCHEMA,
};
use async_trait::async_trait;
use chrono::Utc;

pub struct RpcClient {
    http: ClientWithMiddleware,
    endpoint: Option<String>,
}

impl RpcClient {
    /// `endpoint` carries the provider key in its path; `None` selects
    /// demo mode.
    pub fn new(endpoint: Option<String>) -> Self {
        let endpoint = endpoint.filter(|url| !url.trim().is_empty());
        Self {
            http: build_http_client(),
            endpoint,
        }
    }

    pub fn from_env() -> Self {
        Self::new(std::env::var("ETHEREUM_NODE_URL").ok())
    }

    pub fn demo() -> Self {
        Self::new(None)
    }

    pub fn is_demo(&self) -> bool {
        self.endpoint.is_none()
    }

    #[instrument(skip(self, params), fields(method = %method))]
    async fn call<P, T>(&self, method: &str, params: P) -> Result<T, ProviderError>
    where
        P: Serialize + Send,
        T: DeserializeOwned,
    {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or_else(|| ProviderError::Provider("no RPC endpoint configured".to_string()))?;
        let request = RpcRequest::new(method, params);
        let response = self
            .http
            .post(endpoint)
            .json(&request)
            .send()
            .await
            .map_err(classify_send_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }
        let envelope: RpcEnvelope<T> = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        if let Some(error) = envelope.error {
            return Err(ProviderError::Provider(format!(
                "{} (code {})",
                error.message, error.code
            )));
        }
        envelope
            .result
            .ok_or_else(|| ProviderError::Decode("response carried no result".to_string()))
    }

    async fn asset_transfers(
        &self,
        address: &Address,
        categories: &[&str],
        limit: usize,
    ) -> Result<RawAssetTransfersResult, ProviderError> {
        self.call(
            "alchemy_getAssetTransfers",
            json!([{
                "fromBlock": "0x0",
                "toBlock": "latest",
                "toAddress": address.as_str(),
                "category": categories,
                "maxCount": format!("0x{limit:x}"),
                "order": "desc",
                "withMetadata": true,
            }]),
        )
        .await
    }
}

#[async_trait]
impl ChainDataProvider for RpcClient {
    async fn balance(&self, address: &Address) -> Fetched<BalanceSnapshot> {
        if self.is_demo() {
            return Fetched::Fallback {
                value: fallback::balance_snapshot(address),
                reason: FallbackReason::MissingApiKey,
            };
        }
        let result: Result<String, ProviderError> = self
            .call("eth_getBalance", json!([address.as_str(), "latest"]))
            .await;
        match result {
            Ok(hex) => match hex_quantity(&hex) {
                Some(wei) => Fetched::Live(transform_balance(
                    address,
                    &wei.to_string(),
                    DataSource::Rpc,
                )),
                None => degraded(
                    fallback::balance_snapshot(address),
                    ProviderError::Decode(format!("`{hex}` is not a hex quantity")),
                    "balance",
                ),
            },
            Err(e) => degraded(fallback::balance_snapshot(address), e, "balance"),
        }
    }

    async fn transactions(&self, address: &Address, limit: usize) -> Fetched<Vec<Transaction>> {
        if self.is_demo() {
            return Fetched::Fallback {
                value: fallback::transactions(address, limit),
                reason: FallbackReason::MissingApiKey,
            };
        }
        match self.asset_transfers(address, &["external"], limit).await {
            Ok(result) => {
                let outcome = transform_batch(
                    &result.transfers,
                    |record| transform_external_transfer(record, DataSource::Rpc),
                    &TRANSACTION_SCHEMA,
                );
                Fetched::Live(outcome.transformed)
            }
            Err(e) => degraded(fallback::transactions(address, limit), e, "transactions"),
        }
    }

    async fn token_transfers(
        &self,
        address: &Address,
        limit: usize,
    ) -> Fetched<Vec<TokenTransfer>> {
        if self.is_demo() {
            return Fetched::Fallback {
                value: fallback::token_transfers(address, limit),
                reason: FallbackReason::MissingApiKey,
            };
        }
        match self
            .asset_transfers(address, &["erc20", "erc721", "erc1155"], limit)
            .await
        {
            Ok(result) => {
                let outcome = transform_batch(
                    &result.transfers,
                    |record| transform_asset_transfer(record, DataSource::Rpc),
                    &TOKEN_TRANSFER_SCHEMA,
                );
                Fetched::Live(outcome.transformed)
            }
            Err(e) => degraded(fallback::token_transfers(address, limit), e, "token_transfers"),
        }
    }

    async fn token_holdings(&self, address: &Address) -> Fetched<Vec<TokenHolding>> {
        if self.is_demo() {
            return Fetched::Fallback {
                value: fallback::token_holdings(address),
                reason: FallbackReason::MissingApiKey,
            };
        }
        let result: Result<RawTokenBalancesResult, ProviderError> = self
            .call("alchemy_getTokenBalances", json!([address.as_str(), "erc20"]))
            .await;
        match result {
            Ok(balances) => {
                let outcome = transform_batch(
                    &balances.token_balances,
                    |record| transform_rpc_token_balance(address, record, DataSource::Rpc),
                    &TOKEN_HOLDING_SCHEMA,
                );
                Fetched::Live(outcome.transformed)
            }
            Err(e) => degraded(fallback::token_holdings(address), e, "token_holdings"),
        }
    }

    async fn gas_price(&self) -> Fetched<GasPriceSnapshot> {
        if self.is_demo() {
            return Fetched::Fallback {
                value: fallback::gas_price_snapshot(),
                reason: FallbackReason::MissingApiKey,
            };
        }
        let result: Result<String, ProviderError> = self.call("eth_gasPrice", json!([])).await;
        match result {
            Ok(hex) => match hex_quantity(&hex) {
                Some(wei) => {
                    // one quantity spread into tiers the dashboard expects
                    let standard = (wei / 1_000_000_000) as u64;
                    Fetched::Live(GasPriceSnapshot {
                        safe_low: standard * 90 / 100,
                        standard,
                        fast: standard * 125 / 100,
                        timestamp: Utc::now(),
                        source: DataSource::Rpc,
                    })
                }
                None => degraded(
                    fallback::gas_price_snapshot(),
                    ProviderError::Decode(format!("`{hex}` is not a hex quantity")),
                    "gas_price",
                ),
            },
            Err(e) => degraded(fallback::gas_price_snapshot(), e, "gas_price"),
        }
    }
}
