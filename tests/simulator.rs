//! Simulator posting to a live hub

use std::sync::Arc;
use std::time::Duration;

use sensor_hub::server::router;
use sensor_hub::{ChannelTransport, DeviceSimulator, Hub, Reading, ServerConfig, SimulatorConfig};

#[tokio::test]
async fn test_simulator_feeds_subscribers() {
    let hub = Arc::new(Hub::new());
    let app = router(Arc::clone(&hub), &ServerConfig::default());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    let (transport, mut rx) = ChannelTransport::new(64);
    hub.connect(transport).await.unwrap();

    let config = SimulatorConfig::default()
        .endpoint(format!("http://{}/api/readings", addr))
        .devices(["NYC", "LON"])
        .interval(Duration::from_millis(20))
        .seed(11);

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let simulator = tokio::spawn(DeviceSimulator::new(config).run_until(async {
        let _ = stop_rx.await;
    }));

    let mut devices = Vec::new();
    for _ in 0..4 {
        let payload = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        let reading: Reading = serde_json::from_slice(&payload).unwrap();
        assert!((-10..=40).contains(&reading.temperature));
        assert!((0..=100).contains(&reading.humidity));
        devices.push(reading.device_id);
    }
    assert_eq!(devices, vec!["NYC", "LON", "NYC", "LON"]);

    let _ = stop_tx.send(());
    let report = simulator.await.unwrap();
    assert!(report.sent >= 4);
    assert_eq!(report.failed, 0);

    server.abort();
}
