//! Fan-out of ingestion events and status heartbeats to attached observers.
//!
//! Each observer owns a bounded queue. Broadcasting iterates a copy of the
//! observer set and writes without blocking: a full queue drops that event
//! for that observer only, and a closed queue detaches the observer. A
//! stalled consumer can therefore never back-pressure the ingestion path or
//! its peers.

use crate::core::DeviceStatus;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::sync::mpsc;
use uuid::Uuid;

/// A discrete event delivered to observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StreamEvent {
    /// A decoded message observed on one of the forwarded topics
    #[serde(rename_all = "camelCase")]
    Data {
        topic: String,
        data: serde_json::Value,
        timestamp: i64,
    },
    /// Initial snapshot delivered to a newly attached observer
    #[serde(rename_all = "camelCase")]
    Status {
        connected: bool,
        device: DeviceStatus,
    },
    /// Heartbeat status emitted on a fixed interval
    #[serde(rename_all = "camelCase")]
    PeriodicStatus { device: DeviceStatus, timestamp: i64 },
}

struct Observer {
    id: Uuid,
    sender: mpsc::Sender<StreamEvent>,
}

/// Dynamic set of observers with isolated per-observer delivery.
pub struct EventBroadcaster {
    observers: Mutex<Vec<Observer>>,
    queue_depth: usize,
    /// Topics forwarded to observers as data events; everything else only
    /// updates internal state.
    stream_topics: HashSet<String>,
}

impl EventBroadcaster {
    pub fn new(queue_depth: usize, stream_topics: impl IntoIterator<Item = String>) -> Self {
        Self {
            observers: Mutex::new(Vec::new()),
            queue_depth,
            stream_topics: stream_topics.into_iter().collect(),
        }
    }

    /// Register a new observer and deliver `initial` to it alone.
    ///
    /// Dropping the receiver detaches the observer on its next delivery;
    /// `detach` removes it synchronously.
    pub fn attach(&self, initial: StreamEvent) -> (Uuid, mpsc::Receiver<StreamEvent>) {
        let (sender, receiver) = mpsc::channel(self.queue_depth);
        let id = Uuid::new_v4();

        // Queue is freshly created, so this cannot fail on capacity.
        let _ = sender.try_send(initial);

        self.observers.lock().push(Observer { id, sender });
        tracing::debug!(observer = %id, "observer attached");
        (id, receiver)
    }

    /// Remove an observer, releasing its queue immediately.
    pub fn detach(&self, id: Uuid) {
        self.observers.lock().retain(|o| o.id != id);
        tracing::debug!(observer = %id, "observer detached");
    }

    /// Number of currently attached observers.
    pub fn observer_count(&self) -> usize {
        self.observers.lock().len()
    }

    /// Deliver `event` to every attached observer.
    pub fn broadcast(&self, event: StreamEvent) {
        // Copy the sender list out so attach/detach never race the iteration.
        let targets: Vec<(Uuid, mpsc::Sender<StreamEvent>)> = self
            .observers
            .lock()
            .iter()
            .map(|o| (o.id, o.sender.clone()))
            .collect();

        let mut disconnected = Vec::new();
        for (id, sender) in targets {
            match sender.try_send(event.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(observer = %id, "observer queue full, dropping event");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => disconnected.push(id),
            }
        }

        if !disconnected.is_empty() {
            self.observers
                .lock()
                .retain(|o| !disconnected.contains(&o.id));
            for id in disconnected {
                tracing::debug!(observer = %id, "observer disconnected, detaching");
            }
        }
    }

    /// Forward an observed message as a data event if its topic is one of
    /// the forwarded stream topics.
    pub fn message_observed(&self, topic: &str, data: &serde_json::Value) {
        if self.stream_topics.contains(topic) {
            self.broadcast(StreamEvent::Data {
                topic: topic.to_string(),
                data: data.clone(),
                timestamp: chrono::Utc::now().timestamp_millis(),
            });
        }
    }
}
