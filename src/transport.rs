//! Abstract outbound transport seam.
//!
//! The core never speaks a broker protocol itself. Commands go through the
//! [`CommandSink`] trait; a real MQTT/AMQP client implements it at the
//! process edge, and [`ChannelCommandSink`] provides an in-process
//! implementation for the simulator and for tests.

use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Transport failures surfaced to callers.
#[derive(Debug, PartialEq, Eq)]
pub enum TransportError {
    NotConnected,
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::NotConnected => write!(f, "transport not connected"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Outbound publish capability provided by the external transport.
pub trait CommandSink: Send + Sync {
    /// Publish a payload to a topic, or fail when the transport is down.
    fn publish(&self, topic: &str, payload: &Value) -> Result<(), TransportError>;

    /// Whether the transport currently has a live connection.
    fn is_connected(&self) -> bool;
}

/// A command accepted for outbound publication.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundCommand {
    pub topic: String,
    pub payload: Value,
}

/// Forwards accepted commands onto the outbound transport.
///
/// No retry and no queueing: a failed publish is dropped and the typed
/// failure is the caller's to surface.
pub struct CommandPublisher {
    sink: Arc<dyn CommandSink>,
}

impl CommandPublisher {
    pub fn new(sink: Arc<dyn CommandSink>) -> Self {
        Self { sink }
    }

    pub fn is_connected(&self) -> bool {
        self.sink.is_connected()
    }

    /// Publish `payload` on `topic`.
    pub fn publish(&self, topic: &str, payload: &Value) -> Result<(), TransportError> {
        match self.sink.publish(topic, payload) {
            Ok(()) => {
                tracing::info!(topic, "published command");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(topic, error = %e, "command publish failed");
                Err(e)
            }
        }
    }
}

/// Channel-backed sink for in-process wiring.
///
/// Publishes are forwarded to an unbounded receiver while the shared
/// connected flag is set, and rejected with `NotConnected` otherwise.
#[derive(Clone)]
pub struct ChannelCommandSink {
    sender: mpsc::UnboundedSender<OutboundCommand>,
    connected: Arc<AtomicBool>,
}

impl ChannelCommandSink {
    /// Create a disconnected sink and the receiver that drains it.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundCommand>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender,
                connected: Arc::new(AtomicBool::new(false)),
            },
            receiver,
        )
    }

    /// Mark the transport as connected or disconnected.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

impl CommandSink for ChannelCommandSink {
    fn publish(&self, topic: &str, payload: &Value) -> Result<(), TransportError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        self.sender
            .send(OutboundCommand {
                topic: topic.to_string(),
                payload: payload.clone(),
            })
            .map_err(|_| TransportError::NotConnected)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_fails_when_disconnected() {
        let (sink, _rx) = ChannelCommandSink::new();
        let publisher = CommandPublisher::new(Arc::new(sink));

        assert!(!publisher.is_connected());
        assert_eq!(
            publisher.publish("trainflow/command/trigger", &serde_json::json!({})),
            Err(TransportError::NotConnected)
        );
    }

    #[tokio::test]
    async fn test_publish_forwards_when_connected() {
        let (sink, mut rx) = ChannelCommandSink::new();
        sink.set_connected(true);
        let publisher = CommandPublisher::new(Arc::new(sink));

        let payload = serde_json::json!({"action": "trigger"});
        publisher
            .publish("trainflow/command/trigger", &payload)
            .unwrap();

        let command = rx.recv().await.unwrap();
        assert_eq!(command.topic, "trainflow/command/trigger");
        assert_eq!(command.payload, payload);
    }

    #[test]
    fn test_dropped_receiver_reports_not_connected() {
        let (sink, rx) = ChannelCommandSink::new();
        sink.set_connected(true);
        drop(rx);

        assert_eq!(
            sink.publish("t", &serde_json::json!(1)),
            Err(TransportError::NotConnected)
        );
    }
}
