//! The authoritative chain data client: an Etherscan-compatible REST API
//! queried over HTTPS GET with the API key as a query parameter. A client
//! without a key runs in permanent demo mode and never touches the
//! network.

use reqwest_middleware::ClientWithMiddleware;
use serde_json::Value;
use tracing::{debug, instrument};

use super::{
    build_http_client, classify_send_error, degraded, fallback, ChainDataProvider, Fetched,
    FallbackReason, ProviderError,
};
use crate::directory::Address;
use crate::models::{
    etherscan::{Envelope, RawGasOracle, RawTokenBalance, RawTokenTransfer, RawTransaction},
    BalanceSnapshot, DataSource, GasPriceSnapshot, TokenHolding, TokenTransfer, Transaction,
};
use crate::transform::{
    transform_balance, transform_batch, transform_gas_price, transform_token_holding,
    transform_token_transfer, transform_transaction, TOKEN_HOLDING_SCHEMA, TOKEN_TRANSFER_SCHEMA,
    TRANSACTION_SCHEMA,
};
use async_trait::async_trait;

pub const DEFAULT_API_URL: &str = "https://api.etherscan.io";

pub struct EtherscanClient {
    http: ClientWithMiddleware,
    base_url: String,
    api_key: Option<String>,
}

impl EtherscanClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let api_key = api_key.filter(|key| !key.trim().is_empty());
        Self {
            http: build_http_client(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Reads `ETHERSCAN_API_URL` / `ETHERSCAN_API_KEY`; a missing key
    /// selects demo mode rather than failing startup.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("ETHERSCAN_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let api_key = std::env::var("ETHERSCAN_API_KEY").ok();
        Self::new(base_url, api_key)
    }

    pub fn demo() -> Self {
        Self::new(DEFAULT_API_URL, None)
    }

    pub fn is_demo(&self) -> bool {
        self.api_key.is_none()
    }

    /// Issues one REST call and unwraps the provider envelope. `status`
    /// other than `"1"` is a provider-level error, except the "No
    /// transactions found" miss which is an empty result set.
    #[instrument(skip(self), fields(query = %query))]
    async fn call(&self, query: &str) -> Result<Value, ProviderError> {
        let url = format!(
            "{}/api?{}&apikey={}",
            self.base_url,
            query,
            self.api_key.as_deref().unwrap_or_default()
        );
        let response = self.http.get(&url).send().await.map_err(classify_send_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        let envelope: Envelope =
            serde_json::from_str(&body).map_err(|e| ProviderError::Decode(e.to_string()))?;
        if envelope.status != "1" {
            if envelope.message.starts_with("No transactions found") {
                debug!("empty result set");
                return Ok(Value::Array(Vec::new()));
            }
            let detail = match envelope.result.as_str() {
                Some(result) if !result.is_empty() => {
                    format!("{}: {}", envelope.message, result)
                }
                _ => envelope.message,
            };
            return Err(ProviderError::Provider(detail));
        }
        Ok(envelope.result)
    }

    async fn fetch_records<R>(&self, query: &str) -> Result<Vec<R>, ProviderError>
    where
        R: serde::de::DeserializeOwned,
    {
        let result = self.call(query).await?;
        serde_json::from_value(result).map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ChainDataProvider for EtherscanClient {
    async fn balance(&self, address: &Address) -> Fetched<BalanceSnapshot> {
        if self.is_demo() {
            return Fetched::Fallback {
                value: fallback::balance_snapshot(address),
                reason: FallbackReason::MissingApiKey,
            };
        }
        let query = format!("module=account&action=balance&address={address}&tag=latest");
        match self.call(&query).await {
            Ok(result) => {
                let wei = result.as_str().unwrap_or("0");
                Fetched::Live(transform_balance(address, wei, DataSource::Etherscan))
            }
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
        let query = format!(
            "module=account&action=txlist&address={address}&startblock=0&endblock=99999999&page=1&offset={limit}&sort=desc"
        );
        match self.fetch_records::<RawTransaction>(&query).await {
            Ok(raw) => {
                let outcome = transform_batch(
                    &raw,
                    |record| transform_transaction(record, DataSource::Etherscan),
                    &TRANSACTION_SCHEMA,
                );
                if outcome.stats.failed > 0 {
                    debug!(dropped = outcome.stats.failed, "dropped malformed transaction records");
                }
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
        let query = format!(
            "module=account&action=tokentx&address={address}&page=1&offset={limit}&sort=desc"
        );
        match self.fetch_records::<RawTokenTransfer>(&query).await {
            Ok(raw) => {
                let outcome = transform_batch(
                    &raw,
                    |record| transform_token_transfer(record, DataSource::Etherscan),
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
        let query = format!(
            "module=account&action=addresstokenbalance&address={address}&page=1&offset=100"
        );
        match self.fetch_records::<RawTokenBalance>(&query).await {
            Ok(raw) => {
                let outcome = transform_batch(
                    &raw,
                    |record| transform_token_holding(address, record, DataSource::Etherscan),
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
        let query = "module=gastracker&action=gasoracle";
        match self.call(query).await {
            Ok(result) => match serde_json::from_value::<RawGasOracle>(result) {
                Ok(raw) => Fetched::Live(transform_gas_price(&raw, DataSource::Etherscan)),
                Err(e) => degraded(
                    fallback::gas_price_snapshot(),
                    ProviderError::Decode(e.to_string()),
                    "gas_price",
                ),
            },
            Err(e) => degraded(fallback::gas_price_snapshot(), e, "gas_price"),
        }
    }
}
