//! The aggregation layer: one entry point the presentation layer polls
//! for every dataset plus derived metrics. Refresh cycles are tagged with
//! a monotonically increasing epoch; a cycle's results are applied only if
//! no newer cycle has been issued, so a slow stale refresh can never
//! overwrite fresher data.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::{interval, sleep};
use tracing::{debug, info, instrument, warn};

use crate::cache::{CachedValue, ResponseCache};
use crate::directory::{Address, WalletDirectory, WalletEntry};
use crate::models::{
    BalanceSnapshot, GasPriceSnapshot, TokenHolding, TokenTransfer, Transaction,
};
use crate::providers::{ChainDataProvider, FallbackReason, Fetched};
use crate::valuation::{TreasuryValuation, ValuationSource};
use crate::{DEFAULT_CACHE_TTL_SECS, DEFAULT_TRANSACTION_LIMIT};

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub refresh_interval: Duration,
    /// Delay before the first fetch, so process start-up is not a
    /// thundering herd against the provider.
    pub initial_delay: Duration,
    /// Cap on in-flight balance requests during the directory fan-out.
    pub max_concurrency: usize,
    pub transaction_limit: usize,
    pub cache_ttl: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(10 * 60),
            initial_delay: Duration::from_secs(1),
            max_concurrency: 8,
            transaction_limit: DEFAULT_TRANSACTION_LIMIT,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        }
    }
}

/// Lifecycle of one dataset. `Degraded` carries the same shape as `Ready`
/// plus the reason fallback data is being shown, so callers cannot ignore
/// the distinction by accident.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum DatasetState<T> {
    Idle,
    Loading,
    Ready { data: T },
    Degraded { data: T, reason: FallbackReason },
}

impl<T> DatasetState<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Idle | Self::Loading => None,
            Self::Ready { data } => Some(data),
            Self::Degraded { data, .. } => Some(data),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    fn from_fetched(fetched: Fetched<T>) -> Self {
        match fetched {
            Fetched::Live(data) => Self::Ready { data },
            Fetched::Fallback { value, reason } => Self::Degraded { data: value, reason },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardState {
    pub treasury: DatasetState<Vec<BalanceSnapshot>>,
    pub transactions: DatasetState<Vec<Transaction>>,
    pub token_holdings: DatasetState<Vec<TokenHolding>>,
    pub gas_price: DatasetState<GasPriceSnapshot>,
    pub recent_transfers: DatasetState<Vec<TokenTransfer>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    pub refresh_epoch: u64,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            treasury: DatasetState::Idle,
            transactions: DatasetState::Idle,
            token_holdings: DatasetState::Idle,
            gas_price: DatasetState::Idle,
            recent_transfers: DatasetState::Idle,
            last_updated: None,
            refresh_epoch: 0,
        }
    }
}

/// Pure functions of the current dataset state, recomputed per snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedMetrics {
    pub total_treasury_eth: f64,
    pub transaction_count: usize,
    pub unique_token_count: usize,
    pub average_gas_price: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    #[serde(flatten)]
    pub state: DashboardState,
    pub metrics: DerivedMetrics,
}

/// Balance, transactions, and token transfers for one wallet, merged
/// after all three sub-fetches settle. A failed sub-fetch defaults
/// independently; it never discards the other two.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletOverview {
    pub address: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<WalletEntry>,
    pub balance: BalanceSnapshot,
    pub transactions: Vec<Transaction>,
    pub token_transfers: Vec<TokenTransfer>,
    pub degraded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied { epoch: u64 },
    Superseded { epoch: u64 },
}

pub struct TreasuryAggregator {
    provider: Arc<dyn ChainDataProvider>,
    directory: Arc<WalletDirectory>,
    cache: Arc<ResponseCache>,
    valuation: Option<Arc<dyn ValuationSource>>,
    config: AggregatorConfig,
    state: RwLock<DashboardState>,
    epoch: AtomicU64,
}

impl TreasuryAggregator {
    pub fn new(
        provider: Arc<dyn ChainDataProvider>,
        directory: Arc<WalletDirectory>,
        cache: Arc<ResponseCache>,
        config: AggregatorConfig,
    ) -> Self {
        Self {
            provider,
            directory,
            cache,
            valuation: None,
            config,
            state: RwLock::new(DashboardState::default()),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn with_valuation(mut self, valuation: Arc<dyn ValuationSource>) -> Self {
        self.valuation = Some(valuation);
        self
    }

    pub fn directory(&self) -> &WalletDirectory {
        &self.directory
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Fires all five dataset fetches concurrently and applies the
    /// results if this cycle is still the latest issued. `last_updated`
    /// is set on apply regardless of per-dataset success; degraded
    /// datasets count as an update.
    #[instrument(skip(self))]
    pub async fn refresh_all(&self) -> RefreshOutcome {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(epoch, "starting refresh cycle");
        self.cache.clear_expired();

        {
            let mut state = self.state.write().await;
            mark_loading(&mut state.treasury);
            mark_loading(&mut state.transactions);
            mark_loading(&mut state.token_holdings);
            mark_loading(&mut state.gas_price);
            mark_loading(&mut state.recent_transfers);
        }

        let (treasury, transactions, token_holdings, gas_price, recent_transfers) = tokio::join!(
            self.fetch_treasury(),
            self.fetch_transactions(),
            self.fetch_token_holdings(),
            self.fetch_gas_price(),
            self.fetch_recent_transfers(),
        );

        let mut state = self.state.write().await;
        if self.epoch.load(Ordering::SeqCst) != epoch {
            info!(epoch, "refresh superseded by a newer cycle, discarding results");
            return RefreshOutcome::Superseded { epoch };
        }
        let failed = [
            treasury.is_fallback(),
            transactions.is_fallback(),
            token_holdings.is_fallback(),
            gas_price.is_fallback(),
            recent_transfers.is_fallback(),
        ]
        .iter()
        .filter(|degraded| **degraded)
        .count();
        state.treasury = DatasetState::from_fetched(treasury);
        state.transactions = DatasetState::from_fetched(transactions);
        state.token_holdings = DatasetState::from_fetched(token_holdings);
        state.gas_price = DatasetState::from_fetched(gas_price);
        state.recent_transfers = DatasetState::from_fetched(recent_transfers);
        state.last_updated = Some(Utc::now());
        state.refresh_epoch = epoch;
        if failed > 0 {
            warn!(epoch, degraded_datasets = failed, "refresh cycle applied with fallbacks");
        } else {
            info!(epoch, "refresh cycle applied");
        }
        RefreshOutcome::Applied { epoch }
    }

    /// Balances for the whole directory, capped at
    /// `config.max_concurrency` in-flight requests. Output preserves
    /// directory order.
    async fn fetch_treasury(&self) -> Fetched<Vec<BalanceSnapshot>> {
        let key = format!("treasury-balances-{}", self.directory.len());
        if let Some(CachedValue::Balances(cached)) = self.cache.get(&key) {
            return Fetched::Live(cached);
        }
        let provider = self.provider.clone();
        let entries: Vec<(usize, Address)> = self
            .directory
            .entries()
            .iter()
            .enumerate()
            .map(|(index, entry)| (index, entry.address.clone()))
            .collect();
        let mut indexed: Vec<(usize, Fetched<BalanceSnapshot>)> =
            stream::iter(entries)
                .map(|(index, address)| {
                    let provider = provider.clone();
                    async move { (index, provider.balance(&address).await) }
                })
                .buffer_unordered(self.config.max_concurrency)
                .collect()
                .await;
        indexed.sort_by_key(|(index, _)| *index);

        let mut failed = 0usize;
        let balances: Vec<BalanceSnapshot> = indexed
            .into_iter()
            .map(|(_, fetched)| {
                if fetched.is_fallback() {
                    failed += 1;
                }
                fetched.into_value()
            })
            .collect();
        if failed > 0 {
            // do not cache: the next refresh should retry the live source
            Fetched::Fallback {
                value: balances,
                reason: FallbackReason::PartialFailure { failed },
            }
        } else {
            self.cache
                .set(&key, CachedValue::Balances(balances.clone()), self.config.cache_ttl);
            Fetched::Live(balances)
        }
    }

    async fn fetch_transactions(&self) -> Fetched<Vec<Transaction>> {
        let limit = self.config.transaction_limit;
        let key = format!("ens-transactions-{limit}");
        if let Some(CachedValue::Transactions(cached)) = self.cache.get(&key) {
            return Fetched::Live(cached);
        }
        let Some(primary) = self.directory.primary_treasury() else {
            return Fetched::Fallback {
                value: Vec::new(),
                reason: FallbackReason::Provider {
                    message: "wallet directory has no treasury entry".to_string(),
                },
            };
        };
        let fetched = self.provider.transactions(&primary.address, limit).await;
        if let Fetched::Live(transactions) = &fetched {
            self.cache.set(
                &key,
                CachedValue::Transactions(transactions.clone()),
                self.config.cache_ttl,
            );
        }
        fetched
    }

    async fn fetch_token_holdings(&self) -> Fetched<Vec<TokenHolding>> {
        let Some(primary) = self.directory.primary_treasury() else {
            return Fetched::Fallback {
                value: Vec::new(),
                reason: FallbackReason::Provider {
                    message: "wallet directory has no treasury entry".to_string(),
                },
            };
        };
        let key = format!("token-holdings-{}", primary.address);
        if let Some(CachedValue::Holdings(cached)) = self.cache.get(&key) {
            return Fetched::Live(cached);
        }
        let fetched = self.provider.token_holdings(&primary.address).await;
        if let Fetched::Live(holdings) = &fetched {
            self.cache
                .set(&key, CachedValue::Holdings(holdings.clone()), self.config.cache_ttl);
        }
        fetched
    }

    async fn fetch_gas_price(&self) -> Fetched<GasPriceSnapshot> {
        let key = "gas-price";
        if let Some(CachedValue::Gas(cached)) = self.cache.get(key) {
            return Fetched::Live(cached);
        }
        let fetched = self.provider.gas_price().await;
        if let Fetched::Live(gas) = &fetched {
            self.cache
                .set(key, CachedValue::Gas(gas.clone()), self.config.cache_ttl);
        }
        fetched
    }

    async fn fetch_recent_transfers(&self) -> Fetched<Vec<TokenTransfer>> {
        let limit = self.config.transaction_limit;
        let key = format!("recent-transfers-{limit}");
        if let Some(CachedValue::Transfers(cached)) = self.cache.get(&key) {
            return Fetched::Live(cached);
        }
        let Some(primary) = self.directory.primary_treasury() else {
            return Fetched::Fallback {
                value: Vec::new(),
                reason: FallbackReason::Provider {
                    message: "wallet directory has no treasury entry".to_string(),
                },
            };
        };
        let fetched = self.provider.token_transfers(&primary.address, limit).await;
        if let Fetched::Live(transfers) = &fetched {
            self.cache.set(
                &key,
                CachedValue::Transfers(transfers.clone()),
                self.config.cache_ttl,
            );
        }
        fetched
    }

    /// Comprehensive data for one wallet: three sub-fetches issued
    /// concurrently, merged after all settle.
    #[instrument(skip(self), fields(address = %address))]
    pub async fn wallet_overview(&self, address: &Address) -> WalletOverview {
        let limit = self.config.transaction_limit;
        let (balance, transactions, transfers) = tokio::join!(
            self.provider.balance(address),
            self.provider.transactions(address, limit),
            self.provider.token_transfers(address, limit),
        );
        let degraded =
            balance.is_fallback() || transactions.is_fallback() || transfers.is_fallback();
        WalletOverview {
            address: address.clone(),
            entry: self.directory.lookup(address).cloned(),
            balance: balance.into_value(),
            transactions: transactions.into_value(),
            token_transfers: transfers.into_value(),
            degraded,
        }
    }

    pub async fn snapshot(&self) -> DashboardSnapshot {
        let state = self.state.read().await.clone();
        let metrics = compute_metrics(&state);
        DashboardSnapshot { state, metrics }
    }

    /// Best-effort USD valuation: consults the injected source when one
    /// exists, otherwise (or on failure) answers with the derived ETH
    /// total.
    pub async fn live_treasury_valuation(&self) -> TreasuryValuation {
        let (balances, metrics) = {
            let state = self.state.read().await;
            (
                state.treasury.data().cloned().unwrap_or_default(),
                compute_metrics(&state),
            )
        };
        if let Some(source) = &self.valuation {
            match source.valuate(&balances).await {
                Ok(valuation) => return valuation,
                Err(e) => warn!(error = %e, "valuation source unavailable, using derived totals"),
            }
        }
        TreasuryValuation::derived(metrics.total_treasury_eth)
    }

    /// Auto-refresh loop: short initial delay, then a full refresh every
    /// `refresh_interval` regardless of per-dataset staleness.
    pub async fn run(self: Arc<Self>) {
        sleep(self.config.initial_delay).await;
        let mut ticker = interval(self.config.refresh_interval);
        loop {
            ticker.tick().await;
            let outcome = self.refresh_all().await;
            debug!(?outcome, "scheduled refresh finished");
        }
    }
}

fn mark_loading<T>(dataset: &mut DatasetState<T>) {
    // first load only: later refreshes keep serving the previous data
    // until the new cycle applies
    if matches!(dataset, DatasetState::Idle) {
        *dataset = DatasetState::Loading;
    }
}

fn compute_metrics(state: &DashboardState) -> DerivedMetrics {
    let total_treasury_eth = state
        .treasury
        .data()
        .map(|balances| {
            balances
                .iter()
                .filter_map(|snapshot| snapshot.balance.parse::<f64>().ok())
                .sum()
        })
        .unwrap_or(0.0);
    let transaction_count = state.transactions.data().map(Vec::len).unwrap_or(0);
    let unique_token_count = state
        .token_holdings
        .data()
        .map(|holdings| {
            holdings
                .iter()
                .map(|holding| holding.contract_address.as_str())
                .collect::<HashSet<_>>()
                .len()
        })
        .unwrap_or(0);
    let average_gas_price = state
        .gas_price
        .data()
        .map(|gas| (gas.safe_low + gas.standard + gas.fast) as f64 / 3.0)
        .unwrap_or(0.0);
    DerivedMetrics {
        total_treasury_eth,
        transaction_count,
        unique_token_count,
        average_gas_price,
    }
}
