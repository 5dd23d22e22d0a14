//! Shared telemetry state with an explicit construction lifecycle.
//!
//! One [`TelemetryContext`] instance owns the buffers, liveness tracker,
//! last-value store, broadcaster, and outbound publisher, and is passed
//! explicitly to every consumer. Multiple independent instances can coexist,
//! which the tests rely on.

use crate::broadcast::{EventBroadcaster, StreamEvent};
use crate::config::Config;
use crate::core::{AxisSpectra, DeviceStatus, LivenessTracker, Sample, SampleBuffer, SpectralAnalyzer};
use crate::ingest::{IngestionAdapter, InboundMessage, SensorId, TopicRoutes};
use crate::transport::{CommandPublisher, CommandSink, TransportError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

pub struct TelemetryContext {
    config: Config,
    routes: TopicRoutes,
    buffer_a: Mutex<SampleBuffer>,
    buffer_b: Mutex<SampleBuffer>,
    liveness: Mutex<LivenessTracker>,
    last_values: Mutex<HashMap<String, serde_json::Value>>,
    broadcaster: EventBroadcaster,
    analyzer: SpectralAnalyzer,
    commands: CommandPublisher,
}

impl TelemetryContext {
    /// Build a context from configuration and an outbound transport sink.
    pub fn new(config: Config, sink: Arc<dyn CommandSink>) -> Arc<Self> {
        let routes = TopicRoutes::new(&config.topics);
        let broadcaster =
            EventBroadcaster::new(config.observer_queue_depth, routes.stream_topics());
        let analyzer = SpectralAnalyzer::new(
            config.sample_rate_hz,
            config.fft_window_size,
            config.signal_threshold,
            config.min_frequency_hz,
            config.max_frequency_hz,
        );

        Arc::new(Self {
            routes,
            buffer_a: Mutex::new(SampleBuffer::new(config.buffer_capacity)),
            buffer_b: Mutex::new(SampleBuffer::new(config.buffer_capacity)),
            liveness: Mutex::new(LivenessTracker::new(config.heartbeat_timeout)),
            last_values: Mutex::new(HashMap::new()),
            broadcaster,
            analyzer,
            commands: CommandPublisher::new(sink),
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn routes(&self) -> &TopicRoutes {
        &self.routes
    }

    pub(crate) fn broadcaster(&self) -> &EventBroadcaster {
        &self.broadcaster
    }

    fn buffer(&self, sensor: SensorId) -> &Mutex<SampleBuffer> {
        match sensor {
            SensorId::A => &self.buffer_a,
            SensorId::B => &self.buffer_b,
        }
    }

    pub(crate) fn push_sample(&self, sensor: SensorId, sample: Sample) {
        self.buffer(sensor).lock().push(sample);
    }

    pub(crate) fn record_activity(&self) {
        self.liveness.lock().record_activity();
    }

    pub(crate) fn store_last_value(&self, topic: &str, value: serde_json::Value) {
        self.last_values.lock().insert(topic.to_string(), value);
    }

    /// Number of samples currently buffered for a sensor.
    pub fn buffered_samples(&self, sensor: SensorId) -> usize {
        self.buffer(sensor).lock().len()
    }

    /// Per-axis spectra for a sensor, `None` while the window is not full.
    ///
    /// The window is copied out under the buffer lock; the transform runs
    /// outside it so analysis never stalls ingestion.
    pub fn spectral_result(&self, sensor: SensorId) -> Option<AxisSpectra> {
        let window = self
            .buffer(sensor)
            .lock()
            .snapshot(self.analyzer.window_size());
        self.analyzer.analyze(&window)
    }

    /// Current device liveness, evaluated lazily against the heartbeat.
    pub fn liveness_status(&self) -> DeviceStatus {
        self.liveness.lock().status()
    }

    /// Last decoded (or raw, if undecodable) value seen on a topic.
    pub fn last_known_value(&self, topic: &str) -> Option<serde_json::Value> {
        self.last_values.lock().get(topic).cloned()
    }

    /// All last-known values keyed by topic.
    pub fn all_known_values(&self) -> HashMap<String, serde_json::Value> {
        self.last_values.lock().clone()
    }

    /// Whether the outbound transport is currently connected.
    pub fn transport_connected(&self) -> bool {
        self.commands.is_connected()
    }

    /// Forward a command to the outbound transport.
    pub fn send_command(
        &self,
        topic: &str,
        payload: &serde_json::Value,
    ) -> Result<(), TransportError> {
        self.commands.publish(topic, payload)
    }

    /// Attach an observer, delivering the current status snapshot to it.
    pub fn attach_observer(&self) -> (Uuid, mpsc::Receiver<StreamEvent>) {
        self.broadcaster.attach(self.status_event())
    }

    /// Detach an observer, releasing its queue immediately.
    pub fn detach_observer(&self, id: Uuid) {
        self.broadcaster.detach(id);
    }

    /// Snapshot of transport connectivity and device liveness.
    pub fn status_event(&self) -> StreamEvent {
        StreamEvent::Status {
            connected: self.transport_connected(),
            device: self.liveness_status(),
        }
    }

    /// Spawn the ingestion task draining the inbound transport stream.
    pub fn spawn_ingest(
        self: &Arc<Self>,
        inbound: mpsc::Receiver<InboundMessage>,
    ) -> JoinHandle<()> {
        let adapter = IngestionAdapter::new(self.clone());
        tokio::spawn(adapter.run(inbound))
    }

    /// Spawn the periodic status ticker so observers receive heartbeat
    /// updates even when no sensor data is flowing.
    pub fn spawn_status_ticker(self: &Arc<Self>) -> JoinHandle<()> {
        let context = self.clone();
        let period = self.config.status_interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                context.broadcaster.broadcast(StreamEvent::PeriodicStatus {
                    device: context.liveness_status(),
                    timestamp: chrono::Utc::now().timestamp_millis(),
                });
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ChannelCommandSink;
    use chrono::Utc;

    fn context() -> Arc<TelemetryContext> {
        let (sink, _rx) = ChannelCommandSink::new();
        TelemetryContext::new(Config::default(), Arc::new(sink))
    }

    fn sample(magnitude: f64) -> Sample {
        Sample {
            received_at: Utc::now(),
            x: 1.0,
            y: 0.0,
            z: 0.0,
            magnitude,
            extra: serde_json::Map::new(),
        }
    }

    #[test]
    fn test_spectral_result_not_ready_then_gated() {
        let ctx = context();

        for _ in 0..255 {
            ctx.push_sample(SensorId::A, sample(10.0));
        }
        assert!(ctx.spectral_result(SensorId::A).is_none());

        ctx.push_sample(SensorId::A, sample(10.0));
        let spectra = ctx.spectral_result(SensorId::A).unwrap();
        assert!(spectra.is_empty());
    }

    #[test]
    fn test_sensors_are_independent() {
        let ctx = context();
        ctx.push_sample(SensorId::A, sample(1.0));

        assert_eq!(ctx.buffered_samples(SensorId::A), 1);
        assert_eq!(ctx.buffered_samples(SensorId::B), 0);
        assert!(ctx.spectral_result(SensorId::B).is_none());
    }

    #[test]
    fn test_status_event_reflects_state() {
        let ctx = context();
        match ctx.status_event() {
            StreamEvent::Status { connected, device } => {
                assert!(!connected);
                assert_eq!(device, DeviceStatus::Offline);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_send_command_surfaces_disconnect() {
        let ctx = context();
        assert_eq!(
            ctx.send_command("trainflow/command/trigger", &serde_json::json!({})),
            Err(TransportError::NotConnected)
        );
    }

    #[test]
    fn test_concurrent_writer_and_readers() {
        let ctx = context();
        let capacity = ctx.config().buffer_capacity;

        std::thread::scope(|scope| {
            let writer_ctx = &ctx;
            scope.spawn(move || {
                for i in 0..2000 {
                    writer_ctx.push_sample(SensorId::A, sample(i as f64));
                }
            });

            for _ in 0..4 {
                let reader_ctx = &ctx;
                scope.spawn(move || {
                    for _ in 0..200 {
                        let len = reader_ctx.buffered_samples(SensorId::A);
                        assert!(len <= capacity);
                        let _ = reader_ctx.spectral_result(SensorId::A);
                    }
                });
            }
        });

        assert_eq!(ctx.buffered_samples(SensorId::A), capacity);
    }
}
