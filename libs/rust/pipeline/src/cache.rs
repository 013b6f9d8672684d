//! In-memory TTL cache for normalized datasets. Constructed explicitly
//! and shared via `Arc`; there is no process-wide singleton. Unbounded:
//! keys are the handful of dataset/parameter combinations the aggregator
//! uses.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::models::{BalanceSnapshot, GasPriceSnapshot, TokenHolding, TokenTransfer, Transaction};

/// The dataset payloads the cache can hold. Keys encode the dataset type
/// and its parameters (e.g. `"ens-transactions-50"`), so a key always maps
/// back to one variant.
#[derive(Debug, Clone)]
pub enum CachedValue {
    Balances(Vec<BalanceSnapshot>),
    Transactions(Vec<Transaction>),
    Transfers(Vec<TokenTransfer>),
    Holdings(Vec<TokenHolding>),
    Gas(GasPriceSnapshot),
}

struct CacheEntry {
    value: CachedValue,
    expires_at: Instant,
}

pub struct ResponseCache {
    default_ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ResponseCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            default_ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached value while it is strictly younger than its
    /// TTL. Expired entries behave as misses and are evicted on the spot.
    pub fn get(&self, key: &str) -> Option<CachedValue> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if Instant::now() < entry.expires_at => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn set(&self, key: &str, value: CachedValue, ttl: Duration) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    pub fn set_with_default_ttl(&self, key: &str, value: CachedValue) {
        self.set(key, value, self.default_ttl);
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Sweeps every expired entry. Called opportunistically before a full
    /// refresh cycle.
    pub fn clear_expired(&self) {
        let mut entries = self.entries.lock().unwrap();
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| now < entry.expires_at);
        let swept = before - entries.len();
        if swept > 0 {
            debug!(swept, remaining = entries.len(), "swept expired cache entries");
        }
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

#[cfg(test)]
mod cache_tests {
    use super::*;
    use crate::directory::Address;
    use crate::models::DataSource;
    use chrono::Utc;

    fn snapshot(address: &str, balance: &str) -> CachedValue {
        CachedValue::Balances(vec![BalanceSnapshot {
            address: Address::normalized(address),
            balance: balance.to_string(),
            timestamp: Utc::now(),
            source: DataSource::Etherscan,
            transformed_at: Utc::now(),
        }])
    }

    #[tokio::test(start_paused = true)]
    async fn entry_is_a_hit_before_expiry_and_a_miss_after() {
        let cache = ResponseCache::new(Duration::from_secs(300));
        cache.set("treasury-balances-7", snapshot("0xabc", "42"), Duration::from_millis(1000));

        tokio::time::advance(Duration::from_millis(999)).await;
        assert!(cache.get("treasury-balances-7").is_some());

        tokio::time::advance(Duration::from_millis(2)).await;
        assert!(cache.get("treasury-balances-7").is_none());
        // expired read evicts
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn parameterized_keys_do_not_collide() {
        let cache = ResponseCache::new(Duration::from_secs(300));
        cache.set_with_default_ttl("ens-transactions-50", snapshot("0xaaa", "1"));
        cache.set_with_default_ttl("ens-transactions-100", snapshot("0xbbb", "2"));
        assert_eq!(cache.len(), 2);
        let hit = cache.get("ens-transactions-50").unwrap();
        match hit {
            CachedValue::Balances(balances) => assert_eq!(balances[0].balance, "1"),
            other => panic!("unexpected variant {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn clear_expired_sweeps_only_stale_entries() {
        let cache = ResponseCache::new(Duration::from_secs(300));
        cache.set("short", snapshot("0xaaa", "1"), Duration::from_secs(1));
        cache.set("long", snapshot("0xbbb", "2"), Duration::from_secs(600));

        tokio::time::advance(Duration::from_secs(2)).await;
        cache.clear_expired();

        assert_eq!(cache.len(), 1);
        assert!(cache.get("short").is_none());
        assert!(cache.get("long").is_some());
    }
}
