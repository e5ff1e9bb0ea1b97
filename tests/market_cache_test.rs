//! History cache behaviour against a mock backend

use std::sync::Arc;

use cryptodash::backend::{CoinSymbol, RemoteClient, Timeframe};
use cryptodash::market_data::MarketDataCache;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_history(server: &MockServer, coin: &str, timeframe: &str, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/history"))
        .and(query_param("coin", coin))
        .and(query_param("timeframe", timeframe))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "timestamps": [1_709_251_200_000i64, 1_709_254_800_000i64],
            "prices": [100.0, 101.0],
            "volumes": [10.0, 12.0]
        })))
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_repeated_history_is_served_from_cache() {
    let server = MockServer::start().await;
    for coin in CoinSymbol::ALL {
        mount_history(&server, coin.as_str(), "24h", 1).await;
    }

    let mut cache = MarketDataCache::new(RemoteClient::new(server.uri()), Timeframe::OneDay);
    for coin in CoinSymbol::ALL {
        let first = cache.get_history(coin, Timeframe::OneDay).await.unwrap();
        let second = cache.get_history(coin, Timeframe::OneDay).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
    assert_eq!(cache.history_fetches(), CoinSymbol::ALL.len() as u64);
    assert_eq!(cache.cached_count(), CoinSymbol::ALL.len());
}

#[tokio::test]
async fn test_timeframe_change_refetches_and_discards_old_entries() {
    let server = MockServer::start().await;
    mount_history(&server, "bitcoin", "24h", 1).await;
    mount_history(&server, "bitcoin", "7d", 1).await;
    mount_history(&server, "ethereum", "24h", 1).await;

    let mut cache = MarketDataCache::new(RemoteClient::new(server.uri()), Timeframe::OneDay);

    let day = cache
        .get_history(CoinSymbol::Bitcoin, Timeframe::OneDay)
        .await
        .unwrap();
    assert_eq!(day.prices(), &[100.0, 101.0]);
    assert_eq!(day.volumes(), &[10.0, 12.0]);
    assert_eq!(day.timestamps().len(), 2);
    cache
        .get_history(CoinSymbol::Ethereum, Timeframe::OneDay)
        .await
        .unwrap();

    let again = cache
        .get_history(CoinSymbol::Bitcoin, Timeframe::OneDay)
        .await
        .unwrap();
    assert!(Arc::ptr_eq(&day, &again));
    assert_eq!(cache.history_fetches(), 2);

    let week = cache
        .get_history(CoinSymbol::Bitcoin, Timeframe::SevenDays)
        .await
        .unwrap();
    assert_eq!(week.timeframe(), Timeframe::SevenDays);
    assert_eq!(cache.timeframe(), Timeframe::SevenDays);
    assert_eq!(cache.history_fetches(), 3);

    // The 24h ethereum entry was dropped along with bitcoin's
    assert!(cache.peek_history(CoinSymbol::Ethereum).is_none());
    assert_eq!(cache.cached_count(), 1);
    assert!(
        cache
            .cached_history()
            .iter()
            .all(|s| s.timeframe() == Timeframe::SevenDays)
    );
}

#[tokio::test]
async fn test_failed_fetch_leaves_no_entry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/history"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "boom"})))
        .expect(2)
        .mount(&server)
        .await;

    let mut cache = MarketDataCache::new(RemoteClient::new(server.uri()), Timeframe::OneHour);
    assert!(cache.get_current_history(CoinSymbol::Solana).await.is_err());
    assert!(cache.peek_history(CoinSymbol::Solana).is_none());
    // A later call retries instead of serving a cached failure
    assert!(cache.get_current_history(CoinSymbol::Solana).await.is_err());
}

#[tokio::test]
async fn test_invalidate_forces_refetch_and_snapshots_are_never_cached() {
    let server = MockServer::start().await;
    mount_history(&server, "cardano", "90d", 2).await;
    Mock::given(method("GET"))
        .and(path("/stats"))
        .and(query_param("coin", "cardano"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "price": 0.45,
            "marketCap": 16_000_000_000.0,
            "24hChange": 2.0,
            "24hVolume": 400_000_000.0,
            "marketCapRank": 9
        })))
        .expect(2)
        .mount(&server)
        .await;

    let mut cache = MarketDataCache::new(RemoteClient::new(server.uri()), Timeframe::NinetyDays);
    let before = cache
        .get_current_history(CoinSymbol::Cardano)
        .await
        .unwrap();
    cache.invalidate();
    assert_eq!(cache.cached_count(), 0);
    let after = cache
        .get_current_history(CoinSymbol::Cardano)
        .await
        .unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(*before, *after);

    cache.get_snapshot(CoinSymbol::Cardano).await.unwrap();
    let snapshot = cache.get_snapshot(CoinSymbol::Cardano).await.unwrap();
    assert_eq!(snapshot.market_cap_rank, Some(9));
}
