//! HTTP API
//!
//! | Method | Path            | Purpose                               |
//! |--------|-----------------|---------------------------------------|
//! | POST   | `/api/readings` | Ingest one reading and fan it out     |
//! | GET    | `/api/events`   | Subscribe over Server-Sent Events     |
//! | GET    | `/api/stats`    | Hub and per-session statistics        |
//! | GET    | `/health`       | Liveness                              |

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::Serialize;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};

use crate::delivery::ChannelTransport;
use crate::hub::Hub;
use crate::reading::{ingest_json, Reading};
use crate::server::config::ServerConfig;
use crate::server::error::ApiError;
use crate::stats::{HubStats, SessionStats};

/// SSE event name carrying a reading
pub const READING_EVENT: &str = "reading";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    /// Fan-out engine
    pub hub: Arc<Hub>,
    /// Server settings (SSE buffering, timeouts)
    pub config: Arc<ServerConfig>,
}

/// Response to an accepted reading
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    /// The reading as normalized and published
    pub reading: Reading,
    /// Number of sessions it was enqueued to
    pub sessions: usize,
}

/// Response of `GET /api/stats`
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    /// Hub-wide counters
    pub hub: HubStats,
    /// One entry per live session
    pub sessions: Vec<SessionStats>,
}

/// Build the API router
pub fn router(hub: Arc<Hub>, config: &ServerConfig) -> Router {
    let state = AppState {
        hub,
        config: Arc::new(config.clone()),
    };

    Router::new()
        .route("/api/readings", post(ingest_reading))
        .route("/api/events", get(subscribe_events))
        .route("/api/stats", get(stats))
        .route("/health", get(health))
        .with_state(state)
}

async fn ingest_reading(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<IngestResponse>), ApiError> {
    let reading = ingest_json(&body)?;
    let sessions = state.hub.publish(reading.clone()).await?;

    Ok((StatusCode::ACCEPTED, Json(IngestResponse { reading, sessions })))
}

async fn subscribe_events(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let (transport, rx) =
        ChannelTransport::with_timeout(state.config.sse_buffer, state.config.write_timeout);

    // Worker runs detached; dropping the body closes the channel and ends it
    let subscription = state.hub.connect(transport).await?;

    tracing::info!(session_id = %subscription.session_id, "SSE subscriber connected");

    let stream = ReceiverStream::new(rx).map(|payload| {
        Ok(Event::default()
            .event(READING_EVENT)
            .data(String::from_utf8_lossy(&payload)))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(state.config.sse_keep_alive)))
}

async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let hub = state.hub.stats().await;
    let sessions = state.hub.registry().session_stats().await;

    Json(StatsResponse { hub, sessions })
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
