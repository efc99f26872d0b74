//! End-to-end fan-out through the hub

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;

use sensor_hub::delivery::WorkerExit;
use sensor_hub::{
    ingest_json, BackfillPolicy, ChannelTransport, DeliveryPolicy, Hub, Reading, RegistryConfig,
    Transport, TransportError,
};

async fn recv_reading(rx: &mut mpsc::Receiver<Bytes>) -> Reading {
    let payload = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for reading")
        .expect("transport channel closed");
    serde_json::from_slice(&payload).unwrap()
}

/// Transport whose writes always fail
struct FailingTransport {
    attempts: Arc<AtomicUsize>,
}

impl Transport for FailingTransport {
    async fn send(&self, _payload: Bytes) -> Result<(), TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(TransportError::Timeout)
    }

    async fn closed(&self) {
        std::future::pending::<()>().await
    }
}

#[tokio::test]
async fn test_ingested_reading_reaches_every_subscriber() {
    let hub = Arc::new(Hub::new());

    let (a, mut rx_a) = ChannelTransport::new(8);
    let (b, mut rx_b) = ChannelTransport::new(8);
    hub.connect(a).await.unwrap();
    hub.connect(b).await.unwrap();

    let reading = ingest_json(br#"{"deviceId":"NYC","temperature":30,"humidity":45}"#).unwrap();
    assert_eq!(hub.publish(reading).await.unwrap(), 2);

    for rx in [&mut rx_a, &mut rx_b] {
        let received = recv_reading(rx).await;
        assert_eq!(received.device_id, "NYC");
        assert_eq!(received.temperature, 30);
        assert_eq!(received.humidity, 45);
    }
}

#[tokio::test]
async fn test_payload_carries_timestamp() {
    let hub = Arc::new(Hub::new());
    let (transport, mut rx) = ChannelTransport::new(8);
    hub.connect(transport).await.unwrap();

    let reading = ingest_json(br#"{"deviceId":"NYC","temperature":30,"humidity":45}"#).unwrap();
    hub.publish(reading).await.unwrap();

    let payload = rx.recv().await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&payload).unwrap();
    let timestamp = json["timestamp"].as_str().expect("timestamp is a string");
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
}

#[tokio::test]
async fn test_per_subscriber_order_matches_publish_order() {
    let hub = Arc::new(Hub::new());
    let mut receivers = Vec::new();
    for _ in 0..4 {
        let (transport, rx) = ChannelTransport::new(64);
        hub.connect(transport).await.unwrap();
        receivers.push(rx);
    }

    for t in 0..20 {
        hub.publish(Reading::now("LON", t, 50)).await.unwrap();
    }

    for rx in &mut receivers {
        for expected in 0..20 {
            assert_eq!(recv_reading(rx).await.temperature, expected);
        }
    }
}

#[tokio::test]
async fn test_late_subscriber_gets_backfill_then_live() {
    let hub = Arc::new(Hub::with_config(
        RegistryConfig::default().backfill(BackfillPolicy::LastN(3)),
    ));

    for t in 1..=4 {
        hub.publish(Reading::now("TYO", t, 50)).await.unwrap();
    }

    let (transport, mut rx) = ChannelTransport::new(8);
    hub.connect(transport).await.unwrap();
    hub.publish(Reading::now("TYO", 5, 50)).await.unwrap();

    let mut temps = Vec::new();
    for _ in 0..4 {
        temps.push(recv_reading(&mut rx).await.temperature);
    }
    assert_eq!(temps, vec![2, 3, 4, 5]);
}

#[tokio::test]
async fn test_failing_subscriber_is_torn_down_alone() {
    let config = RegistryConfig::default()
        .delivery(DeliveryPolicy::default().backoff(Duration::from_millis(5)));
    let hub = Arc::new(Hub::with_config(config));

    let attempts = Arc::new(AtomicUsize::new(0));
    let failing = hub
        .connect(FailingTransport {
            attempts: Arc::clone(&attempts),
        })
        .await
        .unwrap();
    let (healthy, mut rx) = ChannelTransport::new(8);
    hub.connect(healthy).await.unwrap();

    hub.publish(Reading::now("NYC", 1, 40)).await.unwrap();

    let exit = tokio::time::timeout(Duration::from_secs(1), failing.worker)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(exit, WorkerExit::RetriesExhausted);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert!(hub.registry().get(failing.session_id).await.is_none());

    // The healthy subscriber is unaffected and keeps receiving
    assert_eq!(recv_reading(&mut rx).await.temperature, 1);
    hub.publish(Reading::now("NYC", 2, 40)).await.unwrap();
    assert_eq!(recv_reading(&mut rx).await.temperature, 2);

    let stats = hub.stats().await;
    assert_eq!(stats.sessions_failed, 1);
    assert_eq!(stats.active_sessions, 1);
}
