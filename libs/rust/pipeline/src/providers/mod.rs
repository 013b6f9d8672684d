//! Chain data providers. One trait, two implementations: the
//! Etherscan-style REST client is authoritative, the JSON-RPC client is an
//! adapter behind the same interface. Every operation resolves to a
//! `Fetched` value: failures degrade to deterministic fallback data, they
//! never surface as errors to the aggregation layer.

pub mod etherscan;
pub mod fallback;
pub mod rpc;

use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{
    policies::ExponentialBackoff, RetryTransientMiddleware, Retryable, RetryableStrategy,
};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::directory::Address;
use crate::models::{
    BalanceSnapshot, GasPriceSnapshot, TokenHolding, TokenTransfer, Transaction,
};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const MAX_TRANSPORT_RETRIES: u32 = 3;
pub const RETRY_DELAY: Duration = Duration::from_millis(750);

/// Why a fallback value is being served instead of live data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FallbackReason {
    MissingApiKey,
    Timeout,
    Transport { detail: String },
    Status { code: u16 },
    Provider { message: String },
    Decode { detail: String },
    PartialFailure { failed: usize },
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingApiKey => write!(f, "no API key configured"),
            Self::Timeout => write!(f, "request timed out"),
            Self::Transport { detail } => write!(f, "transport error: {detail}"),
            Self::Status { code } => write!(f, "unexpected HTTP status {code}"),
            Self::Provider { message } => write!(f, "provider error: {message}"),
            Self::Decode { detail } => write!(f, "undecodable response: {detail}"),
            Self::PartialFailure { failed } => write!(f, "{failed} sub-fetches fell back"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ProviderError {
    pub fn reason(&self) -> FallbackReason {
        match self {
            Self::Timeout => FallbackReason::Timeout,
            Self::Transport(detail) => FallbackReason::Transport { detail: detail.clone() },
            Self::Status(code) => FallbackReason::Status { code: *code },
            Self::Provider(message) => FallbackReason::Provider { message: message.clone() },
            Self::Decode(detail) => FallbackReason::Decode { detail: detail.clone() },
        }
    }
}

/// A dataset that either came from the live upstream or was substituted
/// by deterministic fallback data. Callers must acknowledge which one
/// they hold; the shapes are otherwise identical so the UI always has
/// something to render.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    Live(T),
    Fallback { value: T, reason: FallbackReason },
}

impl<T> Fetched<T> {
    pub fn value(&self) -> &T {
        match self {
            Self::Live(value) => value,
            Self::Fallback { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Self::Live(value) => value,
            Self::Fallback { value, .. } => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    pub fn reason(&self) -> Option<&FallbackReason> {
        match self {
            Self::Live(_) => None,
            Self::Fallback { reason, .. } => Some(reason),
        }
    }
}

#[async_trait]
pub trait ChainDataProvider: Send + Sync {
    async fn balance(&self, address: &Address) -> Fetched<BalanceSnapshot>;
    async fn transactions(&self, address: &Address, limit: usize) -> Fetched<Vec<Transaction>>;
    async fn token_transfers(&self, address: &Address, limit: usize)
        -> Fetched<Vec<TokenTransfer>>;
    async fn token_holdings(&self, address: &Address) -> Fetched<Vec<TokenHolding>>;
    async fn gas_price(&self) -> Fetched<GasPriceSnapshot>;
}

/// Retries transport-level failures only. Provider-reported errors and
/// unexpected statuses are converted straight to fallback values, so the
/// middleware must not retry them.
struct TransportOnlyRetry;

impl RetryableStrategy for TransportOnlyRetry {
    fn handle(
        &self,
        result: &Result<reqwest::Response, reqwest_middleware::Error>,
    ) -> Option<Retryable> {
        match result {
            Ok(_) => None,
            Err(reqwest_middleware::Error::Reqwest(e)) if e.is_timeout() || e.is_connect() => {
                Some(Retryable::Transient)
            }
            Err(_) => Some(Retryable::Fatal),
        }
    }
}

pub(crate) fn build_http_client() -> ClientWithMiddleware {
    let retry_policy = ExponentialBackoff::builder()
        .retry_bounds(RETRY_DELAY, RETRY_DELAY)
        .build_with_max_retries(MAX_TRANSPORT_RETRIES);
    let inner = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .expect("Failed to build HTTP client");
    ClientBuilder::new(inner)
        .with(RetryTransientMiddleware::new_with_policy_and_strategy(
            retry_policy,
            TransportOnlyRetry,
        ))
        .build()
}

pub(crate) fn classify_send_error(e: reqwest_middleware::Error) -> ProviderError {
    match &e {
        reqwest_middleware::Error::Reqwest(inner) if inner.is_timeout() => ProviderError::Timeout,
        _ => ProviderError::Transport(e.to_string()),
    }
}

/// Logs the failure and wraps the substitute value.
pub(crate) fn degraded<T>(value: T, error: ProviderError, dataset: &str) -> Fetched<T> {
    warn!(error = %error, dataset, "serving fallback data");
    Fetched::Fallback {
        value,
        reason: error.reason(),
    }
}
