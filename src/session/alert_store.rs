//! Mirror of the price thresholds the backend has confirmed

use tracing::{info, warn};

use crate::backend::{CoinSymbol, RemoteClient};
use crate::error::DashboardResult;

/// Upper/lower price bounds for one coin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertThreshold {
    pub coin: CoinSymbol,
    pub upper: Option<f64>,
    pub lower: Option<f64>,
}

impl AlertThreshold {
    /// Active iff at least one bound is set
    pub fn is_active(&self) -> bool {
        self.upper.is_some() || self.lower.is_some()
    }
}

/// Holds thresholds only after the backend accepted them; never updated optimistically
pub struct AlertThresholdStore {
    rest_client: RemoteClient,
    thresholds: Vec<AlertThreshold>,
}

impl AlertThresholdStore {
    pub fn new(rest_client: RemoteClient) -> Self {
        Self {
            rest_client,
            thresholds: Vec::new(),
        }
    }

    /// Submit thresholds to the backend and mirror them once confirmed.
    ///
    /// On failure the previous local value for `coin` is kept and the error returned.
    /// Passing `None` for both bounds clears the alert.
    pub async fn set_threshold(
        &mut self,
        coin: CoinSymbol,
        upper: Option<f64>,
        lower: Option<f64>,
    ) -> DashboardResult<AlertThreshold> {
        if let Err(e) = self.rest_client.set_alert(coin, upper, lower).await {
            warn!("Alert for {} not confirmed, keeping previous value: {}", coin, e);
            return Err(e);
        }

        let threshold = AlertThreshold { coin, upper, lower };
        match self.thresholds.iter_mut().find(|t| t.coin == coin) {
            Some(existing) => *existing = threshold,
            None => self.thresholds.push(threshold),
        }

        info!("Alert for {} mirrored: upper={:?} lower={:?}", coin, upper, lower);
        Ok(threshold)
    }

    /// Confirmed thresholds with at least one bound, in first-set order
    pub fn active_thresholds(&self) -> Vec<AlertThreshold> {
        self.thresholds
            .iter()
            .filter(|t| t.is_active())
            .copied()
            .collect()
    }

    pub fn get(&self, coin: CoinSymbol) -> Option<&AlertThreshold> {
        self.thresholds.iter().find(|t| t.coin == coin)
    }
}
