use anyhow::Result;
use once_cell::sync::OnceCell;
use std::{env, time::Duration};
use tracing::{info, warn};
use treasury_pipeline::{providers::etherscan::DEFAULT_API_URL, DEFAULT_TRANSACTION_LIMIT};

pub static CONFIG: OnceCell<TerminalConfig> = OnceCell::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Etherscan,
    Rpc,
}

#[derive(Debug, Clone)]
pub struct TerminalConfig {
    pub bind_address: String,
    pub provider: ProviderKind,
    pub etherscan_api_url: String,
    pub etherscan_api_key: Option<String>,
    pub rpc_url: Option<String>,
    pub refresh_interval: Duration,
    pub transaction_limit: usize,
    pub eth_usd_rate: Option<f64>,
}

pub fn load() -> Result<()> {
    let config = load_config();
    CONFIG
        .set(config)
        .map_err(|_| anyhow::anyhow!("Terminal config already initialized"))?;
    Ok(())
}

pub fn get_config() -> &'static TerminalConfig {
    CONFIG.get().expect("Terminal config not initialized")
}

fn load_config() -> TerminalConfig {
    let bind_address =
        env::var("TERMINAL_BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

    let provider = match env::var("TERMINAL_PROVIDER").as_deref() {
        Ok("rpc") => ProviderKind::Rpc,
        Ok("etherscan") | Err(_) => ProviderKind::Etherscan,
        Ok(other) => {
            warn!(provider = other, "Unknown TERMINAL_PROVIDER, using etherscan");
            ProviderKind::Etherscan
        }
    };

    let etherscan_api_url =
        env::var("ETHERSCAN_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
    let etherscan_api_key = env::var("ETHERSCAN_API_KEY").ok().filter(|k| !k.is_empty());
    let rpc_url = env::var("ETHEREUM_NODE_URL").ok().filter(|u| !u.is_empty());

    let refresh_interval = env::var("TERMINAL_REFRESH_SECS")
        .ok()
        .and_then(|raw| raw.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(10 * 60));

    let transaction_limit = env::var("TERMINAL_TRANSACTION_LIMIT")
        .ok()
        .and_then(|raw| raw.parse::<usize>().ok())
        .unwrap_or(DEFAULT_TRANSACTION_LIMIT);

    let eth_usd_rate = env::var("TERMINAL_ETH_USD_RATE")
        .ok()
        .and_then(|raw| raw.parse::<f64>().ok());

    let demo_mode = match provider {
        ProviderKind::Etherscan => etherscan_api_key.is_none(),
        ProviderKind::Rpc => rpc_url.is_none(),
    };
    if demo_mode {
        warn!("No provider credentials configured, running in demo mode with fallback data");
    }

    let config = TerminalConfig {
        bind_address,
        provider,
        etherscan_api_url,
        etherscan_api_key,
        rpc_url,
        refresh_interval,
        transaction_limit,
        eth_usd_rate,
    };

    info!(
        provider = ?config.provider,
        refresh_secs = config.refresh_interval.as_secs(),
        transaction_limit = config.transaction_limit,
        demo_mode,
        "Terminal config loaded"
    );

    config
}
