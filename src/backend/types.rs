//! Backend API data types and structures

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{DashboardError, DashboardResult};

/// Supported cryptocurrency identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CoinSymbol {
    Bitcoin,
    Ethereum,
    MaticNetwork,
    Solana,
    Cardano,
    Ripple,
}

impl CoinSymbol {
    pub const ALL: [CoinSymbol; 6] = [
        CoinSymbol::Bitcoin,
        CoinSymbol::Ethereum,
        CoinSymbol::MaticNetwork,
        CoinSymbol::Solana,
        CoinSymbol::Cardano,
        CoinSymbol::Ripple,
    ];

    /// Identifier used on the wire (`coin` query parameter)
    pub fn as_str(&self) -> &'static str {
        match self {
            CoinSymbol::Bitcoin => "bitcoin",
            CoinSymbol::Ethereum => "ethereum",
            CoinSymbol::MaticNetwork => "matic-network",
            CoinSymbol::Solana => "solana",
            CoinSymbol::Cardano => "cardano",
            CoinSymbol::Ripple => "ripple",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            CoinSymbol::Bitcoin => "Bitcoin",
            CoinSymbol::Ethereum => "Ethereum",
            CoinSymbol::MaticNetwork => "Polygon (Matic)",
            CoinSymbol::Solana => "Solana",
            CoinSymbol::Cardano => "Cardano",
            CoinSymbol::Ripple => "XRP",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            CoinSymbol::Bitcoin => "₿",
            CoinSymbol::Ethereum => "Ξ",
            CoinSymbol::MaticNetwork => "⬡",
            CoinSymbol::Solana => "◎",
            CoinSymbol::Cardano => "₳",
            CoinSymbol::Ripple => "✕",
        }
    }

    /// Brand colour as a hex string
    pub fn color(&self) -> &'static str {
        match self {
            CoinSymbol::Bitcoin => "#F7931A",
            CoinSymbol::Ethereum => "#627EEA",
            CoinSymbol::MaticNetwork => "#8247E5",
            CoinSymbol::Solana => "#00FFA3",
            CoinSymbol::Cardano => "#0033AD",
            CoinSymbol::Ripple => "#23292F",
        }
    }
}

impl fmt::Display for CoinSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CoinSymbol {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        CoinSymbol::ALL
            .into_iter()
            .find(|coin| coin.as_str() == needle)
            .ok_or_else(|| {
                DashboardError::InvalidArgument(format!(
                    "Unsupported coin '{}'. Must be one of: {}",
                    s,
                    CoinSymbol::ALL.map(|c| c.as_str()).join(", ")
                ))
            })
    }
}

/// Bucketed historical window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "24h")]
    OneDay,
    #[serde(rename = "7d")]
    SevenDays,
    #[serde(rename = "30d")]
    ThirtyDays,
    #[serde(rename = "90d")]
    NinetyDays,
}

impl Timeframe {
    pub const ALL: [Timeframe; 5] = [
        Timeframe::OneHour,
        Timeframe::OneDay,
        Timeframe::SevenDays,
        Timeframe::ThirtyDays,
        Timeframe::NinetyDays,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::OneHour => "1h",
            Timeframe::OneDay => "24h",
            Timeframe::SevenDays => "7d",
            Timeframe::ThirtyDays => "30d",
            Timeframe::NinetyDays => "90d",
        }
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Timeframe::OneDay
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Timeframe::ALL
            .into_iter()
            .find(|tf| tf.as_str() == needle)
            .ok_or_else(|| {
                DashboardError::InvalidArgument(format!(
                    "Unsupported timeframe '{}'. Must be one of: {}",
                    s,
                    Timeframe::ALL.map(|t| t.as_str()).join(", ")
                ))
            })
    }
}

/// `/stats` response body
#[derive(Debug, Clone, Deserialize)]
pub struct StatsResponse {
    #[serde(default)]
    pub price: f64,
    #[serde(rename = "marketCap", default)]
    pub market_cap: f64,
    #[serde(rename = "24hChange", default)]
    pub change_24h: f64,
    #[serde(rename = "24hVolume", default)]
    pub volume_24h: f64,
    #[serde(rename = "marketCapRank", default)]
    pub market_cap_rank: Option<u32>,
}

/// Point-in-time market record for one coin, replaced wholesale on each fetch
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSnapshot {
    pub coin: CoinSymbol,
    pub price: f64,
    pub market_cap: f64,
    pub change_24h: f64,
    pub volume_24h: f64,
    pub market_cap_rank: Option<u32>,
    pub fetched_at: DateTime<Utc>,
}

impl PriceSnapshot {
    pub fn from_response(coin: CoinSymbol, stats: StatsResponse) -> Self {
        Self {
            coin,
            price: stats.price,
            market_cap: stats.market_cap,
            change_24h: stats.change_24h,
            volume_24h: stats.volume_24h,
            market_cap_rank: stats.market_cap_rank,
            fetched_at: Utc::now(),
        }
    }
}

/// `/history` response body
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResponse {
    pub timestamps: Vec<i64>,
    pub prices: Vec<f64>,
    pub volumes: Vec<f64>,
}

/// Price and volume series for one (coin, timeframe); the three arrays always share a length
#[derive(Debug, Clone, PartialEq)]
pub struct PriceHistorySeries {
    coin: CoinSymbol,
    timeframe: Timeframe,
    timestamps: Vec<i64>,
    prices: Vec<f64>,
    volumes: Vec<f64>,
}

impl PriceHistorySeries {
    /// Build a series, rejecting arrays of unequal length
    pub fn new(
        coin: CoinSymbol,
        timeframe: Timeframe,
        timestamps: Vec<i64>,
        prices: Vec<f64>,
        volumes: Vec<f64>,
    ) -> DashboardResult<Self> {
        if timestamps.len() != prices.len() || prices.len() != volumes.len() {
            return Err(DashboardError::InvalidResponse(format!(
                "History for {} ({}) has mismatched lengths: {} timestamps, {} prices, {} volumes",
                coin,
                timeframe,
                timestamps.len(),
                prices.len(),
                volumes.len()
            )));
        }

        Ok(Self {
            coin,
            timeframe,
            timestamps,
            prices,
            volumes,
        })
    }

    pub fn from_response(
        coin: CoinSymbol,
        timeframe: Timeframe,
        history: HistoryResponse,
    ) -> DashboardResult<Self> {
        Self::new(
            coin,
            timeframe,
            history.timestamps,
            history.prices,
            history.volumes,
        )
    }

    pub fn coin(&self) -> CoinSymbol {
        self.coin
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Timestamps in epoch milliseconds
    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    pub fn volumes(&self) -> &[f64] {
        &self.volumes
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn latest_price(&self) -> Option<f64> {
        self.prices.last().copied()
    }

    /// Percentage change from the first to the last price of the window
    pub fn change_percent(&self) -> Option<f64> {
        let first = *self.prices.first()?;
        let last = *self.prices.last()?;
        if first == 0.0 || self.prices.len() < 2 {
            return None;
        }
        Some((last - first) / first * 100.0)
    }

    /// Timestamp of the most recent point
    pub fn latest_time(&self) -> Option<DateTime<Utc>> {
        self.timestamps
            .last()
            .and_then(|ms| Utc.timestamp_millis_opt(*ms).single())
    }
}

/// `/deviation` response body
#[derive(Debug, Clone, Deserialize)]
pub struct DeviationResponse {
    pub deviation: f64,
}

/// Which bound a notification crossed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Upper,
    Lower,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKind::Upper => f.write_str("upper"),
            AlertKind::Lower => f.write_str("lower"),
        }
    }
}

/// `/set-alert` request body; absent bounds are sent as `null`
#[derive(Debug, Clone, Serialize)]
pub struct SetAlertRequest {
    pub coin: CoinSymbol,
    #[serde(rename = "upperThreshold")]
    pub upper_threshold: Option<f64>,
    #[serde(rename = "lowerThreshold")]
    pub lower_threshold: Option<f64>,
}

/// One entry of the `/check-alerts` response
#[derive(Debug, Clone, Deserialize)]
pub struct TriggeredAlert {
    pub coin: String,
    pub price: f64,
    pub threshold: f64,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Accepts an RFC 3339 string or epoch milliseconds. Anything else reads as `None` so one odd
/// field does not fail the whole poll.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let parsed = match &value {
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    };
    if parsed.is_none() && !value.is_null() {
        tracing::debug!("Ignoring unreadable alert timestamp: {}", value);
    }
    Ok(parsed)
}

/// Backend-produced threshold crossing
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub coin: CoinSymbol,
    pub price: f64,
    pub threshold: f64,
    pub kind: AlertKind,
    pub observed_at: DateTime<Utc>,
}

impl Notification {
    /// Convert a wire alert, rejecting coins outside the supported set
    pub fn from_triggered(alert: TriggeredAlert, polled_at: DateTime<Utc>) -> DashboardResult<Self> {
        let coin = alert.coin.parse::<CoinSymbol>()?;
        Ok(Self {
            coin,
            price: alert.price,
            threshold: alert.threshold,
            kind: alert.kind,
            observed_at: alert.timestamp.unwrap_or(polled_at),
        })
    }
}

/// Error body returned by the backend on failure
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
