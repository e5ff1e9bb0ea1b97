//! Market data caching and analysis module

pub mod analysis;

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::backend::{CoinSymbol, PriceHistorySeries, PriceSnapshot, RemoteClient, Timeframe};
use crate::error::DashboardResult;

pub use analysis::{CorrelationMatrix, correlation_matrix, pearson};

/// Session cache of price history, one timeframe at a time.
///
/// History is reused until the timeframe changes or `invalidate` is called. Snapshots are never
/// cached; every call goes to the backend.
pub struct MarketDataCache {
    rest_client: RemoteClient,
    timeframe: Timeframe,
    history: HashMap<CoinSymbol, Arc<PriceHistorySeries>>,
    history_fetches: u64,
}

impl MarketDataCache {
    /// Create a new cache for the given timeframe
    pub fn new(rest_client: RemoteClient, timeframe: Timeframe) -> Self {
        Self {
            rest_client,
            timeframe,
            history: HashMap::new(),
            history_fetches: 0,
        }
    }

    /// Timeframe the cached history belongs to
    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Switch the active timeframe, dropping all cached history if it changed.
    /// Returns whether anything was invalidated.
    pub fn set_timeframe(&mut self, timeframe: Timeframe) -> bool {
        if timeframe == self.timeframe {
            return false;
        }

        info!(
            "Timeframe changed {} -> {}, discarding {} cached series",
            self.timeframe,
            timeframe,
            self.history.len()
        );
        self.timeframe = timeframe;
        self.history.clear();
        true
    }

    /// Get history for a coin, fetching only on a cache miss.
    ///
    /// A timeframe different from the current one switches the cache to it first. A failed
    /// fetch leaves the cache without an entry for that coin.
    pub async fn get_history(
        &mut self,
        coin: CoinSymbol,
        timeframe: Timeframe,
    ) -> DashboardResult<Arc<PriceHistorySeries>> {
        self.set_timeframe(timeframe);

        if let Some(series) = self.history.get(&coin) {
            debug!("History cache hit for {} ({})", coin, timeframe);
            return Ok(Arc::clone(series));
        }

        debug!("History cache miss for {} ({})", coin, timeframe);
        self.history_fetches += 1;
        let series = Arc::new(self.rest_client.get_history(coin, timeframe).await?);
        self.history.insert(coin, Arc::clone(&series));
        Ok(series)
    }

    /// Get history for a coin under the current timeframe
    pub async fn get_current_history(
        &mut self,
        coin: CoinSymbol,
    ) -> DashboardResult<Arc<PriceHistorySeries>> {
        let timeframe = self.timeframe;
        self.get_history(coin, timeframe).await
    }

    /// Always fetch a fresh snapshot
    pub async fn get_snapshot(&self, coin: CoinSymbol) -> DashboardResult<PriceSnapshot> {
        self.rest_client.get_stats(coin).await
    }

    /// Cached series for a coin without touching the network
    pub fn peek_history(&self, coin: CoinSymbol) -> Option<Arc<PriceHistorySeries>> {
        self.history.get(&coin).cloned()
    }

    /// All cached series in coin order
    pub fn cached_history(&self) -> Vec<Arc<PriceHistorySeries>> {
        let mut series: Vec<_> = self.history.values().cloned().collect();
        series.sort_by_key(|s| s.coin());
        series
    }

    /// Drop all cached history (explicit refresh)
    pub fn invalidate(&mut self) {
        debug!("Invalidating {} cached series", self.history.len());
        self.history.clear();
    }

    /// Number of history requests issued to the backend so far
    pub fn history_fetches(&self) -> u64 {
        self.history_fetches
    }

    pub fn cached_count(&self) -> usize {
        self.history.len()
    }
}
