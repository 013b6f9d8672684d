#![warn(unused_extern_crates)]
use anyhow::{Context, Result};
use dotenv::dotenv;
use std::sync::Arc;
use tracing::{error, info};
use treasury_pipeline::{
    aggregator::{AggregatorConfig, TreasuryAggregator},
    cache::ResponseCache,
    directory::WalletDirectory,
    providers::{etherscan::EtherscanClient, rpc::RpcClient, ChainDataProvider},
    valuation::StaticValuation,
};
use utils::tracing::setup_tracing;

mod config;
mod routes;

use config::ProviderKind;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    setup_tracing();

    info!("Treasury terminal starting up");
    config::load()?;
    let config = config::get_config();

    let directory = Arc::new(WalletDirectory::ens_dao());
    let aggregator_config = AggregatorConfig {
        refresh_interval: config.refresh_interval,
        transaction_limit: config.transaction_limit,
        ..AggregatorConfig::default()
    };
    let cache = Arc::new(ResponseCache::new(aggregator_config.cache_ttl));
    let provider: Arc<dyn ChainDataProvider> = match config.provider {
        ProviderKind::Etherscan => Arc::new(EtherscanClient::new(
            config.etherscan_api_url.clone(),
            config.etherscan_api_key.clone(),
        )),
        ProviderKind::Rpc => Arc::new(RpcClient::new(config.rpc_url.clone())),
    };

    let mut aggregator =
        TreasuryAggregator::new(provider, directory, cache, aggregator_config);
    if let Some(rate) = config.eth_usd_rate {
        aggregator = aggregator.with_valuation(Arc::new(StaticValuation { eth_usd: rate }));
    }
    let aggregator = Arc::new(aggregator);

    // HTTP surface for the dashboard
    let app = routes::router(aggregator.clone());
    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .context("Failed to bind terminal address")?;
    let addr = listener.local_addr()?;
    let server_handle = tokio::spawn(async move {
        info!(address = %addr, "Starting HTTP server");
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "HTTP server error");
        }
    });

    // Recurring full-refresh cycle
    let refresh_handle = tokio::spawn(aggregator.clone().run());

    info!("All tasks started, terminal running");

    tokio::select! {
        result = server_handle => {
            error!("HTTP server task completed unexpectedly: {:?}", result);
        }
        result = refresh_handle => {
            error!("Refresh task completed unexpectedly: {:?}", result);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully");
        }
    }

    Ok(())
}
