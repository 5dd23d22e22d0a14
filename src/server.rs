//! HTTP front for the telemetry core.
//!
//! This module provides the small API layer the dashboard consumes:
//! - On-demand queries (status, last-known values, spectra)
//! - A server-sent-events feed of the live observer stream
//! - Command forwarding to the outbound transport
//!
//! # Architecture
//!
//! ```text
//! transport ──→ ingestion ──→ context ──→ /api/stream (SSE observers)
//!                                  ↑
//!                     /api/telemetry, /api/telemetry/spectrum, /api/command
//! ```

use crate::context::TelemetryContext;
use crate::core::{AxisSpectra, DeviceStatus};
use crate::ingest::SensorId;
use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tower_http::cors::{Any, CorsLayer};

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub transport: String,
}

/// Connectivity and liveness snapshot
#[derive(Serialize)]
pub struct StatusResponse {
    pub connected: bool,
    pub device: DeviceStatus,
}

/// Spectra for both sensors; a sensor is `null` while its window is not full
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpectrumResponse {
    pub sensor_a: Option<AxisSpectra>,
    pub sensor_b: Option<AxisSpectra>,
}

/// Command forwarded to the outbound transport
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    /// Target topic; defaults to the configured trigger topic
    pub topic: Option<String>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// GET /health
async fn health(State(context): State<Arc<TelemetryContext>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        transport: if context.transport_connected() {
            "connected".to_string()
        } else {
            "disconnected".to_string()
        },
    })
}

/// GET /api/status
async fn status(State(context): State<Arc<TelemetryContext>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        connected: context.transport_connected(),
        device: context.liveness_status(),
    })
}

/// GET /api/telemetry — last-known value per observed topic.
async fn telemetry(State(context): State<Arc<TelemetryContext>>) -> Json<serde_json::Value> {
    let values = context.all_known_values();
    Json(serde_json::to_value(values).unwrap_or_else(|_| serde_json::json!({})))
}

/// GET /api/telemetry/spectrum
async fn spectrum(State(context): State<Arc<TelemetryContext>>) -> Json<SpectrumResponse> {
    Json(SpectrumResponse {
        sensor_a: context.spectral_result(SensorId::A),
        sensor_b: context.spectral_result(SensorId::B),
    })
}

/// GET /api/stream — continuous SSE feed of observer events.
///
/// Attaching delivers an initial status snapshot; dropping the connection
/// closes the observer queue, which detaches it on the next broadcast.
async fn stream(
    State(context): State<Arc<TelemetryContext>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (id, receiver) = context.attach_observer();
    tracing::info!(observer = %id, "stream client connected");

    let events = ReceiverStream::new(receiver).map(|event| {
        let payload = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
        Ok(Event::default().data(payload))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

/// POST /api/command
async fn command(
    State(context): State<Arc<TelemetryContext>>,
    Json(request): Json<CommandRequest>,
) -> Result<Json<StatusResponse>, (StatusCode, Json<ErrorResponse>)> {
    let topic = request
        .topic
        .unwrap_or_else(|| context.config().topics.command_trigger.clone());

    context.send_command(&topic, &request.payload).map_err(|e| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: e.to_string(),
                code: "NOT_CONNECTED".to_string(),
            }),
        )
    })?;

    Ok(Json(StatusResponse {
        connected: context.transport_connected(),
        device: context.liveness_status(),
    }))
}

/// Run the HTTP server
pub async fn run(
    context: Arc<TelemetryContext>,
    port: u16,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let app = Router::new()
        .route("/health", get(health))
        .route("/api/status", get(status))
        .route("/api/telemetry", get(telemetry))
        .route("/api/telemetry/spectrum", get(spectrum))
        .route("/api/stream", get(stream))
        .route("/api/command", post(command))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(context);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("telemetry API listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("server shutdown signal received");
            })
            .await
        {
            tracing::error!("server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
