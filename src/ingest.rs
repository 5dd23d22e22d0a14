//! Inbound message classification and routing.
//!
//! The adapter consumes the abstract `(topic, payload)` stream delivered by
//! the external transport, decodes payloads as JSON, and routes the results:
//! sample topics feed the per-sensor buffers and the liveness tracker,
//! everything else lands in the last-value store. Undecodable payloads are
//! preserved as raw strings instead of crashing ingestion.

use crate::config::TopicConfig;
use crate::context::TelemetryContext;
use crate::core::Sample;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

/// One message from the inbound transport stream.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// The two physical sensors, identified by their topic suffix letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorId {
    A,
    B,
}

/// Static mapping from topic to routing decision.
#[derive(Debug, Clone)]
pub struct TopicRoutes {
    sensor_a: String,
    sensor_b: String,
    train_state: String,
}

impl TopicRoutes {
    pub fn new(topics: &TopicConfig) -> Self {
        Self {
            sensor_a: topics.sensor_a.clone(),
            sensor_b: topics.sensor_b.clone(),
            train_state: topics.train_state.clone(),
        }
    }

    /// Which sensor a sample topic belongs to, if any.
    pub fn sensor_for(&self, topic: &str) -> Option<SensorId> {
        if topic == self.sensor_a {
            Some(SensorId::A)
        } else if topic == self.sensor_b {
            Some(SensorId::B)
        } else {
            None
        }
    }

    /// Topics observers receive as data events.
    pub fn stream_topics(&self) -> Vec<String> {
        vec![
            self.sensor_a.clone(),
            self.sensor_b.clone(),
            self.train_state.clone(),
        ]
    }
}

/// Routes decoded inbound messages into the telemetry context.
pub struct IngestionAdapter {
    context: Arc<TelemetryContext>,
}

impl IngestionAdapter {
    pub fn new(context: Arc<TelemetryContext>) -> Self {
        Self { context }
    }

    /// Decode and route one message. Never fails; never blocks.
    pub fn handle_message(&self, message: InboundMessage) {
        let text = String::from_utf8_lossy(&message.payload).into_owned();

        let value: serde_json::Value = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) => {
                // Keep the raw payload queryable; no routing, no heartbeat.
                tracing::debug!(topic = %message.topic, error = %e, "storing undecodable payload as string");
                self.context
                    .store_last_value(&message.topic, serde_json::Value::String(text));
                return;
            }
        };

        self.context.store_last_value(&message.topic, value.clone());

        if let Some(sensor) = self.context.routes().sensor_for(&message.topic) {
            if let Some(sample) = Sample::from_value(&value) {
                self.context.push_sample(sensor, sample);
                self.context.record_activity();
            }
        }

        self.context
            .broadcaster()
            .message_observed(&message.topic, &value);
    }

    /// Drain the inbound stream until the transport closes it.
    pub async fn run(self, mut inbound: mpsc::Receiver<InboundMessage>) {
        while let Some(message) = inbound.recv().await {
            self.handle_message(message);
        }
        tracing::info!("inbound stream closed, ingestion stopped");
    }
}
