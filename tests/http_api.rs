//! Integration tests for the HTTP API

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tokio_stream::StreamExt;
use tower::ServiceExt;

use sensor_hub::server::router;
use sensor_hub::{Hub, Reading, RegistryConfig, ServerConfig};

fn test_app() -> (Router, Arc<Hub>) {
    let hub = Arc::new(Hub::new());
    let app = router(Arc::clone(&hub), &ServerConfig::default());
    (app, hub)
}

fn post_reading(body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/readings")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Read SSE body chunks until one `reading` event has been seen
async fn next_reading(stream: &mut axum::body::BodyDataStream) -> Reading {
    let mut buf = String::new();
    loop {
        let chunk = tokio::time::timeout(Duration::from_secs(2), stream.next())
            .await
            .expect("timed out waiting for SSE event")
            .expect("SSE stream ended")
            .unwrap();
        buf.push_str(std::str::from_utf8(&chunk).unwrap());

        if let Some(end) = buf.find("\n\n") {
            let event = &buf[..end];
            if event.lines().any(|l| l == "event: reading") {
                let data = event
                    .lines()
                    .find_map(|l| l.strip_prefix("data: "))
                    .expect("event without data");
                return serde_json::from_str(data).unwrap();
            }
            buf.drain(..end + 2);
        }
    }
}

#[tokio::test]
async fn test_health() {
    let (app, _) = test_app();

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn test_ingest_accepts_reading() {
    let (app, hub) = test_app();

    let response = app
        .oneshot(post_reading(
            r#"{"deviceId":"NYC","temperature":30,"humidity":45}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = json_body(response).await;
    assert_eq!(body["reading"]["deviceId"], "NYC");
    assert_eq!(body["reading"]["temperature"], 30);
    assert_eq!(body["reading"]["humidity"], 45);
    assert!(body["reading"]["timestamp"].is_string());
    assert_eq!(body["sessions"], 0);

    assert_eq!(hub.stats().await.readings_published, 1);
}

#[tokio::test]
async fn test_ingest_rejects_invalid_reading() {
    let (app, hub) = test_app();

    let cases = [
        r#"{"temperature":30,"humidity":45}"#,
        r#"{"deviceId":"  ","temperature":30,"humidity":45}"#,
        r#"{"deviceId":"NYC","humidity":45}"#,
        r#"{"deviceId":"NYC","temperature":"warm","humidity":45}"#,
        r#"not json"#,
    ];

    for body in cases {
        let response = app.clone().oneshot(post_reading(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);

        let json = json_body(response).await;
        assert_eq!(json["error"], "validation");
        assert!(json["message"].is_string());
    }

    // Nothing reached the hub
    assert_eq!(hub.stats().await.readings_published, 0);
}

#[tokio::test]
async fn test_sse_subscribers_receive_readings() {
    let (app, hub) = test_app();

    let first = app.clone().oneshot(get("/api/events")).await.unwrap();
    let second = app.clone().oneshot(get("/api/events")).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(
        first.headers()[header::CONTENT_TYPE].to_str().unwrap(),
        "text/event-stream"
    );
    assert_eq!(hub.stats().await.active_sessions, 2);

    let response = app
        .oneshot(post_reading(
            r#"{"deviceId":"NYC","temperature":30,"humidity":45}"#,
        ))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["sessions"], 2);

    for response in [first, second] {
        let mut stream = response.into_body().into_data_stream();
        let reading = next_reading(&mut stream).await;
        assert_eq!(reading.device_id, "NYC");
        assert_eq!(reading.temperature, 30);
        assert_eq!(reading.humidity, 45);
    }
}

#[tokio::test]
async fn test_sse_disconnect_removes_session() {
    let (app, hub) = test_app();

    let response = app.oneshot(get("/api/events")).await.unwrap();
    assert_eq!(hub.registry().len().await, 1);

    drop(response);

    for _ in 0..100 {
        if hub.registry().is_empty().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("session was not removed after the SSE body was dropped");
}

#[tokio::test]
async fn test_session_limit_returns_unavailable() {
    let hub = Arc::new(Hub::with_config(RegistryConfig::default().max_sessions(1)));
    let app = router(Arc::clone(&hub), &ServerConfig::default());

    let _first = app.clone().oneshot(get("/api/events")).await.unwrap();
    let second = app.oneshot(get("/api/events")).await.unwrap();

    assert_eq!(second.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_stats() {
    let (app, hub) = test_app();
    let _session = hub.open_session().await.unwrap();
    hub.publish(Reading::now("TYO", 18, 60)).await.unwrap();

    let response = app.oneshot(get("/api/stats")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["hub"]["readings_published"], 1);
    assert_eq!(body["hub"]["active_sessions"], 1);
    assert_eq!(body["sessions"].as_array().unwrap().len(), 1);
    assert_eq!(body["sessions"][0]["state"], "active");
    assert_eq!(body["sessions"][0]["queued"], 1);
}
