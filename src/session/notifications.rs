//! Deduplicated log of backend-triggered price alerts

use ordered_float::OrderedFloat;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::backend::{AlertKind, CoinSymbol, Notification, RemoteClient};
use crate::error::DashboardResult;

/// Identity of a notification for deduplication; observation time and price are ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub coin: CoinSymbol,
    pub kind: AlertKind,
    pub threshold: OrderedFloat<f64>,
}

impl DedupKey {
    pub fn of(notification: &Notification) -> Self {
        Self {
            coin: notification.coin,
            kind: notification.kind,
            threshold: OrderedFloat(notification.threshold),
        }
    }
}

/// Ordered notification log with at most one entry per dedup key
pub struct NotificationDeduplicator {
    rest_client: RemoteClient,
    log: Vec<Notification>,
    seen: HashSet<DedupKey>,
}

impl NotificationDeduplicator {
    pub fn new(rest_client: RemoteClient) -> Self {
        Self {
            rest_client,
            log: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Poll the backend and append unseen notifications. Returns only the newly appended ones.
    pub async fn poll(&mut self) -> DashboardResult<Vec<Notification>> {
        let incoming = self.rest_client.check_alerts().await?;
        let appended = self.ingest(incoming);

        if !appended.is_empty() {
            info!("{} new price alert notification(s)", appended.len());
        }
        Ok(appended)
    }

    /// Append each notification whose key has not been recorded yet
    pub fn ingest(&mut self, incoming: Vec<Notification>) -> Vec<Notification> {
        let mut appended = Vec::new();
        for notification in incoming {
            if self.seen.insert(DedupKey::of(&notification)) {
                self.log.push(notification.clone());
                appended.push(notification);
            } else {
                debug!(
                    "Duplicate {} alert for {} at {} suppressed",
                    notification.kind, notification.coin, notification.threshold
                );
            }
        }
        appended
    }

    /// Full log, most recent last
    pub fn log(&self) -> &[Notification] {
        &self.log
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn notification(coin: CoinSymbol, kind: AlertKind, threshold: f64) -> Notification {
        Notification {
            coin,
            price: threshold + 1.0,
            threshold,
            kind,
            observed_at: Utc::now(),
        }
    }

    fn deduplicator() -> NotificationDeduplicator {
        NotificationDeduplicator::new(RemoteClient::new("http://127.0.0.1:1"))
    }

    #[test]
    fn test_ingest_suppresses_same_key_with_different_timestamp() {
        let mut dedup = deduplicator();
        let first = notification(CoinSymbol::Bitcoin, AlertKind::Upper, 100.0);
        let mut later = first.clone();
        later.observed_at = first.observed_at + Duration::seconds(30);
        later.price = 105.0;

        assert_eq!(dedup.ingest(vec![first.clone()]), vec![first]);
        assert!(dedup.ingest(vec![later]).is_empty());
        assert_eq!(dedup.len(), 1);
    }

    #[test]
    fn test_ingest_keeps_distinct_keys_in_order() {
        let mut dedup = deduplicator();
        let batch = vec![
            notification(CoinSymbol::Bitcoin, AlertKind::Upper, 100.0),
            notification(CoinSymbol::Bitcoin, AlertKind::Lower, 100.0),
            notification(CoinSymbol::Bitcoin, AlertKind::Upper, 110.0),
            notification(CoinSymbol::Ethereum, AlertKind::Upper, 100.0),
            notification(CoinSymbol::Bitcoin, AlertKind::Upper, 100.0),
        ];

        let appended = dedup.ingest(batch);
        assert_eq!(appended.len(), 4);
        assert_eq!(dedup.log().len(), 4);
        assert_eq!(dedup.log()[3].coin, CoinSymbol::Ethereum);
    }

    #[tokio::test]
    async fn test_poll_failure_leaves_log_untouched() {
        let mut dedup = deduplicator();
        dedup.ingest(vec![notification(CoinSymbol::Solana, AlertKind::Lower, 20.0)]);

        assert!(dedup.poll().await.is_err());
        assert_eq!(dedup.len(), 1);
    }
}
