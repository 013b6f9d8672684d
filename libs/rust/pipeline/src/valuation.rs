//! Optional treasury valuation. The aggregator consults a source if one
//! was injected and silently falls back to derived ETH totals otherwise,
//! so pricing is a best-effort enhancement rather than a required path.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::models::BalanceSnapshot;

#[derive(Debug, Error)]
pub enum ValuationError {
    #[error("valuation unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreasuryValuation {
    pub total_eth: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_usd: Option<f64>,
    pub priced_at: DateTime<Utc>,
    pub source: String,
}

impl TreasuryValuation {
    pub fn derived(total_eth: f64) -> Self {
        Self {
            total_eth,
            total_usd: None,
            priced_at: Utc::now(),
            source: "derived".to_string(),
        }
    }
}

#[async_trait]
pub trait ValuationSource: Send + Sync {
    async fn valuate(&self, treasury: &[BalanceSnapshot])
        -> Result<TreasuryValuation, ValuationError>;
}

/// Prices ETH positions with a fixed configured rate. Stands in for a
/// richer market-data module; good enough for demo parity.
pub struct StaticValuation {
    pub eth_usd: f64,
}

#[async_trait]
impl ValuationSource for StaticValuation {
    async fn valuate(
        &self,
        treasury: &[BalanceSnapshot],
    ) -> Result<TreasuryValuation, ValuationError> {
        if !self.eth_usd.is_finite() || self.eth_usd <= 0.0 {
            return Err(ValuationError::Unavailable(format!(
                "non-positive ETH/USD rate {}",
                self.eth_usd
            )));
        }
        let total_eth: f64 = treasury
            .iter()
            .filter_map(|snapshot| snapshot.balance.parse::<f64>().ok())
            .sum();
        Ok(TreasuryValuation {
            total_eth,
            total_usd: Some(total_eth * self.eth_usd),
            priced_at: Utc::now(),
            source: "static-rate".to_string(),
        })
    }
}
