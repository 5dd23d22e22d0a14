//! End-to-end pipeline tests: inbound messages through ingestion, buffering,
//! spectral analysis, and observer broadcast, without the HTTP layer.

use std::f64::consts::PI;
use std::sync::Arc;
use std::time::Duration;
use trainflow_telemetry::transport::ChannelCommandSink;
use trainflow_telemetry::{
    Config, InboundMessage, SensorId, StreamEvent, TelemetryContext,
};

fn context() -> Arc<TelemetryContext> {
    let (sink, _rx) = ChannelCommandSink::new();
    TelemetryContext::new(Config::default(), Arc::new(sink))
}

fn sample_message(topic: &str, x: f64) -> InboundMessage {
    let magnitude = x.abs();
    InboundMessage::new(
        topic,
        serde_json::json!({"x": x, "y": 0.0, "z": 0.0, "magnitude": magnitude})
            .to_string()
            .into_bytes(),
    )
}

#[tokio::test]
async fn test_ingest_fills_buffer_and_bounds_it() {
    let ctx = context();
    let (tx, rx) = tokio::sync::mpsc::channel(1024);
    ctx.spawn_ingest(rx);

    let capacity = ctx.config().buffer_capacity;
    for i in 0..capacity + 100 {
        tx.send(sample_message("trainflow/sensor/A", i as f64))
            .await
            .unwrap();
    }
    drop(tx);

    // Wait for the drained channel to settle
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(ctx.buffered_samples(SensorId::A), capacity);
    assert_eq!(ctx.buffered_samples(SensorId::B), 0);
}

#[tokio::test]
async fn test_quiet_signal_is_gated_loud_signal_yields_peaks() {
    let ctx = context();
    let (tx, rx) = tokio::sync::mpsc::channel(1024);
    ctx.spawn_ingest(rx);

    let window = ctx.config().fft_window_size;
    let rate = ctx.config().sample_rate_hz;

    // Quiet traffic fills the window but stays below the significance gate
    for i in 0..window {
        let x = (2.0 * PI * 15.0 * i as f64 / rate).sin() * 5.0;
        tx.send(sample_message("trainflow/sensor/A", x))
            .await
            .unwrap();
    }
    tokio::time::sleep(Duration::from_millis(200)).await;

    let spectra = ctx
        .spectral_result(SensorId::A)
        .expect("window should be full");
    assert!(spectra.is_empty(), "quiet signal must be gated");

    // A loud 15 Hz vibration crosses the gate and produces an in-band peak
    for i in 0..window {
        let x = (2.0 * PI * 15.0 * i as f64 / rate).sin() * 2000.0;
        tx.send(sample_message("trainflow/sensor/A", x))
            .await
            .unwrap();
    }
    tokio::time::sleep(Duration::from_millis(200)).await;

    let spectra = ctx
        .spectral_result(SensorId::A)
        .expect("window should be full");
    assert!(!spectra.x.is_empty());

    let peak = spectra
        .x
        .iter()
        .max_by(|a, b| a.magnitude.total_cmp(&b.magnitude))
        .unwrap();
    assert!(
        (14..=16).contains(&peak.frequency),
        "peak at {} Hz",
        peak.frequency
    );
}

#[tokio::test]
async fn test_observer_sees_status_then_data() {
    let ctx = context();
    let (tx, rx) = tokio::sync::mpsc::channel(64);
    ctx.spawn_ingest(rx);

    let (_id, mut events) = ctx.attach_observer();

    match events.recv().await.unwrap() {
        StreamEvent::Status { connected, .. } => assert!(!connected),
        other => panic!("expected initial status, got {other:?}"),
    }

    tx.send(sample_message("trainflow/sensor/B", 1.0))
        .await
        .unwrap();

    match events.recv().await.unwrap() {
        StreamEvent::Data { topic, data, .. } => {
            assert_eq!(topic, "trainflow/sensor/B");
            assert_eq!(data["x"], 1.0);
        }
        other => panic!("expected data event, got {other:?}"),
    }
}

#[tokio::test]
async fn test_status_ticker_reaches_observers() {
    let (sink, _rx) = ChannelCommandSink::new();
    let config = Config {
        status_interval: Duration::from_millis(20),
        ..Config::default()
    };
    let ctx = TelemetryContext::new(config, Arc::new(sink));

    let (_id, mut events) = ctx.attach_observer();
    let _ = events.recv().await; // initial status

    let ticker = ctx.spawn_status_ticker();

    let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
        .await
        .expect("ticker did not fire")
        .unwrap();
    match event {
        StreamEvent::PeriodicStatus { timestamp, .. } => assert!(timestamp > 0),
        other => panic!("expected periodic status, got {other:?}"),
    }

    ticker.abort();
}

#[tokio::test]
async fn test_detached_observer_stops_receiving() {
    let ctx = context();
    let (tx, rx) = tokio::sync::mpsc::channel(64);
    ctx.spawn_ingest(rx);

    let (id, mut events) = ctx.attach_observer();
    let _ = events.recv().await; // initial status
    ctx.detach_observer(id);

    tx.send(sample_message("trainflow/sensor/A", 1.0))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Sender side is gone, so the queue closes without delivering
    assert!(events.recv().await.is_none());
}
