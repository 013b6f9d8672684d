use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use treasury_pipeline::{
    aggregator::{DashboardSnapshot, TreasuryAggregator, WalletOverview},
    directory::{Address, WalletEntry},
    valuation::TreasuryValuation,
};

pub fn router(aggregator: Arc<TreasuryAggregator>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/snapshot", get(snapshot))
        .route("/api/valuation", get(valuation))
        .route("/api/wallets", get(wallets))
        .route("/api/wallets/{address}", get(wallet_overview))
        .with_state(aggregator)
}

async fn health() -> &'static str {
    "OK"
}

async fn snapshot(State(aggregator): State<Arc<TreasuryAggregator>>) -> Json<DashboardSnapshot> {
    Json(aggregator.snapshot().await)
}

async fn valuation(State(aggregator): State<Arc<TreasuryAggregator>>) -> Json<TreasuryValuation> {
    Json(aggregator.live_treasury_valuation().await)
}

async fn wallets(State(aggregator): State<Arc<TreasuryAggregator>>) -> Json<Vec<WalletEntry>> {
    Json(aggregator.directory().entries().to_vec())
}

async fn wallet_overview(
    State(aggregator): State<Arc<TreasuryAggregator>>,
    Path(address): Path<String>,
) -> Result<Json<WalletOverview>, (StatusCode, String)> {
    let address = Address::parse(&address)
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("invalid address: {e}")))?;
    Ok(Json(aggregator.wallet_overview(&address).await))
}
