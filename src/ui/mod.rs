//! User Interface module
//!
//! Pure transformations from cached market state into render-ready view records, plus simple
//! terminal renderers for those records.

/// Simple CLI output functions
pub mod cli;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::backend::{AlertKind, CoinSymbol, Notification, PriceSnapshot};
use crate::error::DashboardError;
use crate::session::AlertThreshold;

/// Maximum number of columns in the minimal ticker layout
const TICKER_COLUMNS: usize = 3;

/// Price view layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    Cards,
    Table,
    Minimal,
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayMode::Cards => f.write_str("cards"),
            DisplayMode::Table => f.write_str("table"),
            DisplayMode::Minimal => f.write_str("minimal"),
        }
    }
}

impl FromStr for DisplayMode {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cards" => Ok(DisplayMode::Cards),
            "table" => Ok(DisplayMode::Table),
            "minimal" => Ok(DisplayMode::Minimal),
            other => Err(DashboardError::InvalidArgument(format!(
                "Unknown display mode '{}'. Must be one of: cards, table, minimal",
                other
            ))),
        }
    }
}

/// Direction of the 24h change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
}

impl Trend {
    pub fn of(change: f64) -> Self {
        if change >= 0.0 { Trend::Up } else { Trend::Down }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            Trend::Up => "↑",
            Trend::Down => "↓",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceCard {
    pub coin: CoinSymbol,
    pub name: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
    pub price: f64,
    pub market_cap: f64,
    pub change_24h: f64,
    pub volume_24h: f64,
    pub rank: Option<u32>,
    pub trend: Trend,
}

/// Table row; numeric fields are left unformatted for the renderer
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub coin: CoinSymbol,
    pub name: &'static str,
    pub icon: &'static str,
    pub price: f64,
    pub change_24h: f64,
    pub market_cap: f64,
    pub volume_24h: f64,
    pub rank: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickerRow {
    pub coin: CoinSymbol,
    pub name: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
    pub price: f64,
    pub change_24h: f64,
    pub trend: Trend,
    /// Column index in a layout of at most three columns
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DashboardView {
    Cards(Vec<PriceCard>),
    Table(Vec<TableRow>),
    Minimal(Vec<TickerRow>),
}

impl DashboardView {
    pub fn len(&self) -> usize {
        match self {
            DashboardView::Cards(rows) => rows.len(),
            DashboardView::Table(rows) => rows.len(),
            DashboardView::Minimal(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertRow {
    pub coin: CoinSymbol,
    pub name: &'static str,
    pub upper: Option<f64>,
    pub lower: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRow {
    pub coin: CoinSymbol,
    pub name: &'static str,
    pub price: f64,
    pub threshold: f64,
    pub kind: AlertKind,
    pub observed_at: DateTime<Utc>,
}

pub fn card_list(snapshots: &[PriceSnapshot]) -> Vec<PriceCard> {
    snapshots
        .iter()
        .map(|s| PriceCard {
            coin: s.coin,
            name: s.coin.display_name(),
            icon: s.coin.icon(),
            color: s.coin.color(),
            price: s.price,
            market_cap: s.market_cap,
            change_24h: s.change_24h,
            volume_24h: s.volume_24h,
            rank: s.market_cap_rank,
            trend: Trend::of(s.change_24h),
        })
        .collect()
}

pub fn table_rows(snapshots: &[PriceSnapshot]) -> Vec<TableRow> {
    snapshots
        .iter()
        .map(|s| TableRow {
            coin: s.coin,
            name: s.coin.display_name(),
            icon: s.coin.icon(),
            price: s.price,
            change_24h: s.change_24h,
            market_cap: s.market_cap,
            volume_24h: s.volume_24h,
            rank: s.market_cap_rank,
        })
        .collect()
}

pub fn ticker_rows(snapshots: &[PriceSnapshot]) -> Vec<TickerRow> {
    let columns = snapshots.len().clamp(1, TICKER_COLUMNS);
    snapshots
        .iter()
        .enumerate()
        .map(|(idx, s)| TickerRow {
            coin: s.coin,
            name: s.coin.display_name(),
            icon: s.coin.icon(),
            color: s.coin.color(),
            price: s.price,
            change_24h: s.change_24h,
            trend: Trend::of(s.change_24h),
            column: idx % columns,
        })
        .collect()
}

/// Build the view for the selected display mode, preserving snapshot order
pub fn build_view(mode: DisplayMode, snapshots: &[PriceSnapshot]) -> DashboardView {
    match mode {
        DisplayMode::Cards => DashboardView::Cards(card_list(snapshots)),
        DisplayMode::Table => DashboardView::Table(table_rows(snapshots)),
        DisplayMode::Minimal => DashboardView::Minimal(ticker_rows(snapshots)),
    }
}

pub fn alert_rows(thresholds: &[AlertThreshold]) -> Vec<AlertRow> {
    thresholds
        .iter()
        .filter(|t| t.is_active())
        .map(|t| AlertRow {
            coin: t.coin,
            name: t.coin.display_name(),
            upper: t.upper,
            lower: t.lower,
        })
        .collect()
}

pub fn notification_rows(log: &[Notification]) -> Vec<NotificationRow> {
    log.iter()
        .map(|n| NotificationRow {
            coin: n.coin,
            name: n.coin.display_name(),
            price: n.price,
            threshold: n.threshold,
            kind: n.kind,
            observed_at: n.observed_at,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(coin: CoinSymbol, price: f64, change: f64) -> PriceSnapshot {
        PriceSnapshot {
            coin,
            price,
            market_cap: price * 1000.0,
            change_24h: change,
            volume_24h: price * 10.0,
            market_cap_rank: Some(1),
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_cards_follow_input_order_and_trend() {
        let snapshots = vec![
            snapshot(CoinSymbol::Ethereum, 3000.0, -2.5),
            snapshot(CoinSymbol::Bitcoin, 60000.0, 0.0),
        ];
        let cards = card_list(&snapshots);
        assert_eq!(cards[0].coin, CoinSymbol::Ethereum);
        assert_eq!(cards[0].trend, Trend::Down);
        assert_eq!(cards[1].trend, Trend::Up);
        assert_eq!(cards[1].name, "Bitcoin");
    }

    #[test]
    fn test_table_rows_keep_raw_numbers() {
        let rows = table_rows(&[snapshot(CoinSymbol::Solana, 150.123456, 1.0)]);
        assert_eq!(rows[0].price, 150.123456);
        assert_eq!(rows[0].market_cap, 150.123456 * 1000.0);
    }

    #[test]
    fn test_ticker_columns_wrap_at_three() {
        let snapshots: Vec<_> = CoinSymbol::ALL
            .iter()
            .map(|c| snapshot(*c, 1.0, 0.0))
            .collect();
        let rows = ticker_rows(&snapshots);
        let columns: Vec<usize> = rows.iter().map(|r| r.column).collect();
        assert_eq!(columns, vec![0, 1, 2, 0, 1, 2]);

        let two = ticker_rows(&snapshots[..2]);
        assert_eq!(two.iter().map(|r| r.column).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_build_view_is_deterministic() {
        let snapshots = vec![snapshot(CoinSymbol::Cardano, 0.5, 3.0)];
        assert_eq!(
            build_view(DisplayMode::Minimal, &snapshots),
            build_view(DisplayMode::Minimal, &snapshots)
        );
        assert!(build_view(DisplayMode::Table, &[]).is_empty());
    }

    #[test]
    fn test_alert_rows_skip_inactive() {
        let thresholds = vec![
            AlertThreshold {
                coin: CoinSymbol::Bitcoin,
                upper: None,
                lower: None,
            },
            AlertThreshold {
                coin: CoinSymbol::Ripple,
                upper: Some(1.0),
                lower: None,
            },
        ];
        let rows = alert_rows(&thresholds);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "XRP");
    }

    #[test]
    fn test_display_mode_parsing() {
        assert_eq!("Table".parse::<DisplayMode>().unwrap(), DisplayMode::Table);
        assert!("grid".parse::<DisplayMode>().is_err());
    }
}
