//! Alert threshold mirroring and notification de-duplication

use cryptodash::backend::{AlertKind, CoinSymbol, RemoteClient};
use cryptodash::error::DashboardError;
use cryptodash::session::{AlertThresholdStore, NotificationDeduplicator};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_backend_failure_does_not_record_threshold() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/set-alert"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "write failed"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut store = AlertThresholdStore::new(RemoteClient::new(server.uri()));
    let result = store
        .set_threshold(CoinSymbol::Ethereum, Some(4000.0), None)
        .await;

    assert!(matches!(
        result,
        Err(DashboardError::Backend { status: 500, .. })
    ));
    assert!(
        !store
            .active_thresholds()
            .iter()
            .any(|t| t.coin == CoinSymbol::Ethereum && t.upper == Some(4000.0))
    );
    assert!(store.get(CoinSymbol::Ethereum).is_none());
}

#[tokio::test]
async fn test_failure_keeps_previous_threshold_and_success_replaces_it() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/set-alert"))
        .and(body_json(json!({
            "coin": "bitcoin",
            "upperThreshold": 70000.0,
            "lowerThreshold": 60000.0
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/set-alert"))
        .and(body_json(json!({
            "coin": "bitcoin",
            "upperThreshold": 80000.0,
            "lowerThreshold": null
        })))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/set-alert"))
        .and(body_json(json!({
            "coin": "bitcoin",
            "upperThreshold": null,
            "lowerThreshold": 55000.0
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut store = AlertThresholdStore::new(RemoteClient::new(server.uri()));
    store
        .set_threshold(CoinSymbol::Bitcoin, Some(70000.0), Some(60000.0))
        .await
        .unwrap();

    assert!(
        store
            .set_threshold(CoinSymbol::Bitcoin, Some(80000.0), None)
            .await
            .is_err()
    );
    let kept = store.get(CoinSymbol::Bitcoin).copied().unwrap();
    assert_eq!(kept.upper, Some(70000.0));
    assert_eq!(kept.lower, Some(60000.0));

    store
        .set_threshold(CoinSymbol::Bitcoin, None, Some(55000.0))
        .await
        .unwrap();
    let active = store.active_thresholds();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].upper, None);
    assert_eq!(active[0].lower, Some(55000.0));
}

#[tokio::test]
async fn test_identical_polls_append_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/check-alerts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"coin": "bitcoin", "price": 70100.0, "threshold": 70000.0, "type": "upper"},
            {"coin": "ripple", "price": 0.48, "threshold": 0.5, "type": "lower"}
        ])))
        .expect(2)
        .mount(&server)
        .await;

    let mut dedup = NotificationDeduplicator::new(RemoteClient::new(server.uri()));

    let first = dedup.poll().await.unwrap();
    assert_eq!(first.len(), 2);
    let after_first = dedup.len();

    let second = dedup.poll().await.unwrap();
    assert!(second.is_empty());
    assert_eq!(dedup.len(), after_first);
    assert_eq!(dedup.log()[0].coin, CoinSymbol::Bitcoin);
    assert_eq!(dedup.log()[1].kind, AlertKind::Lower);
}

#[tokio::test]
async fn test_failed_poll_leaves_log_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/check-alerts"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "down"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut dedup = NotificationDeduplicator::new(RemoteClient::new(server.uri()));
    assert!(dedup.poll().await.is_err());
    assert!(dedup.is_empty());
}
