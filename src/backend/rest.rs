//! Backend REST API client implementation

use chrono::Utc;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::types::{
    CoinSymbol, DeviationResponse, ErrorBody, HistoryResponse, Notification, PriceHistorySeries,
    PriceSnapshot, SetAlertRequest, StatsResponse, Timeframe, TriggeredAlert,
};
use crate::config::ApiConfig;
use crate::error::{DashboardError, DashboardResult};

const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(2);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Typed client for the statistics backend. One round trip per call, no retries, no caching.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    base_url: String,
    client: reqwest::Client,
    health_timeout: Duration,
    request_timeout: Duration,
}

impl RemoteClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(config.base_url.clone()).with_timeouts(
            Duration::from_millis(config.health_timeout_ms),
            Duration::from_millis(config.request_timeout_ms),
        )
    }

    pub fn with_timeouts(mut self, health_timeout: Duration, request_timeout: Duration) -> Self {
        self.health_timeout = health_timeout;
        self.request_timeout = request_timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Probe `/health`. Transport failures count as offline.
    pub async fn health(&self) -> bool {
        let url = self.url("/health");
        match self
            .client
            .get(&url)
            .timeout(self.health_timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Health check against {} failed: {}", url, e);
                false
            }
        }
    }

    /// Get the latest market snapshot for a coin
    pub async fn get_stats(&self, coin: CoinSymbol) -> DashboardResult<PriceSnapshot> {
        let request = self
            .client
            .get(self.url("/stats"))
            .query(&[("coin", coin.as_str())]);
        let stats: StatsResponse = self.fetch_json(request, "stats").await?;
        Ok(PriceSnapshot::from_response(coin, stats))
    }

    /// Get the price/volume history for a coin over a timeframe
    pub async fn get_history(
        &self,
        coin: CoinSymbol,
        timeframe: Timeframe,
    ) -> DashboardResult<PriceHistorySeries> {
        let request = self
            .client
            .get(self.url("/history"))
            .query(&[("coin", coin.as_str()), ("timeframe", timeframe.as_str())]);
        let history: HistoryResponse = self.fetch_json(request, "history").await?;

        let series = PriceHistorySeries::from_response(coin, timeframe, history)?;
        info!(
            "Fetched {} history for {}: {} points",
            timeframe,
            coin,
            series.len()
        );
        Ok(series)
    }

    /// Get the standard deviation of recent prices for a coin
    pub async fn get_deviation(&self, coin: CoinSymbol) -> DashboardResult<f64> {
        let request = self
            .client
            .get(self.url("/deviation"))
            .query(&[("coin", coin.as_str())]);
        let body: DeviationResponse = self.fetch_json(request, "deviation").await?;
        Ok(body.deviation)
    }

    /// Get market dominance percentages keyed by coin name
    pub async fn get_dominance(&self) -> DashboardResult<BTreeMap<String, f64>> {
        let request = self.client.get(self.url("/market-dominance"));
        self.fetch_json(request, "market dominance").await
    }

    /// Get 24h trading volume in USD keyed by coin name
    pub async fn get_volume(&self) -> DashboardResult<BTreeMap<String, f64>> {
        let request = self.client.get(self.url("/volume"));
        self.fetch_json(request, "trading volume").await
    }

    /// Ask the backend to refresh its stored statistics
    pub async fn trigger_update(&self) -> DashboardResult<()> {
        let request = self.client.post(self.url("/trigger-update"));
        self.send_checked(request, "trigger update").await?;
        info!("Backend accepted stats update");
        Ok(())
    }

    /// Register upper/lower thresholds for a coin; `Ok` means the backend accepted them
    pub async fn set_alert(
        &self,
        coin: CoinSymbol,
        upper: Option<f64>,
        lower: Option<f64>,
    ) -> DashboardResult<()> {
        validate_bound("upper", upper)?;
        validate_bound("lower", lower)?;

        let body = SetAlertRequest {
            coin,
            upper_threshold: upper,
            lower_threshold: lower,
        };
        let request = self.client.post(self.url("/set-alert")).json(&body);
        self.send_checked(request, "set alert").await?;

        info!(
            "Backend accepted alert for {}: upper={:?} lower={:?}",
            coin, upper, lower
        );
        Ok(())
    }

    /// Fetch alerts the backend has triggered since it was last asked
    pub async fn check_alerts(&self) -> DashboardResult<Vec<Notification>> {
        let request = self.client.get(self.url("/check-alerts"));
        let alerts: Vec<TriggeredAlert> = self.fetch_json(request, "check alerts").await?;

        let polled_at = Utc::now();
        let notifications = alerts
            .into_iter()
            .filter_map(|alert| match Notification::from_triggered(alert, polled_at) {
                Ok(notification) => Some(notification),
                Err(e) => {
                    warn!("Skipping triggered alert: {}", e);
                    None
                }
            })
            .collect();

        Ok(notifications)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> DashboardResult<T> {
        let response = self.send_checked(request, what).await?;
        response.json::<T>().await.map_err(|e| {
            DashboardError::InvalidResponse(format!("Failed to parse {} response: {}", what, e))
        })
    }

    async fn send_checked(&self, request: RequestBuilder, what: &str) -> DashboardResult<Response> {
        let request = request.timeout(self.request_timeout);
        debug!("Sending {} request", what);

        let response = request.send().await.map_err(|e| {
            DashboardError::Transport(format!("Failed to send {} request: {}", what, e))
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or(body);
            warn!("{} request failed with HTTP {}: {}", what, status, message);
            return Err(DashboardError::Backend { status, message });
        }

        Ok(response)
    }
}

fn validate_bound(name: &str, value: Option<f64>) -> DashboardResult<()> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(DashboardError::InvalidArgument(format!(
            "{} threshold must be a non-negative, finite number (got {})",
            name, v
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = RemoteClient::new("http://localhost:3000/");
        assert_eq!(client.base_url(), "http://localhost:3000");
        assert_eq!(client.url("/health"), "http://localhost:3000/health");
    }

    #[test]
    fn test_validate_bound() {
        assert!(validate_bound("upper", None).is_ok());
        assert!(validate_bound("upper", Some(0.0)).is_ok());
        assert!(validate_bound("upper", Some(-1.0)).is_err());
        assert!(validate_bound("lower", Some(f64::NAN)).is_err());
        assert!(validate_bound("lower", Some(f64::INFINITY)).is_err());
    }
}
