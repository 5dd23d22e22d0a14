//! Device liveness derived from sample recency.
//!
//! There are no timer-driven transitions: status is a pure function of the
//! elapsed time since the last accepted sample versus a fixed timeout, so any
//! reader (query or periodic tick) sees the correct state at the moment it
//! asks.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Online/offline status of the physical sensor source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Online,
    Offline,
}

/// Tracks the timestamp of the last accepted sample for the whole source.
#[derive(Debug)]
pub struct LivenessTracker {
    timeout: Duration,
    last_activity: Option<Instant>,
}

impl LivenessTracker {
    /// Create a tracker that reports offline after `timeout` without activity.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            last_activity: None,
        }
    }

    /// Record that a sample was accepted now.
    pub fn record_activity(&mut self) {
        self.record_activity_at(Instant::now());
    }

    /// Record activity at an explicit instant (simulated time in tests).
    pub fn record_activity_at(&mut self, now: Instant) {
        self.last_activity = Some(now);
    }

    /// Current status, evaluated against the wall clock.
    pub fn status(&self) -> DeviceStatus {
        self.status_at(Instant::now())
    }

    /// Status as of an explicit instant.
    ///
    /// Offline until the first activity is recorded, and again once `timeout`
    /// has elapsed since the last one.
    pub fn status_at(&self, now: Instant) -> DeviceStatus {
        match self.last_activity {
            Some(last) if now.duration_since(last) < self.timeout => DeviceStatus::Online,
            _ => DeviceStatus::Offline,
        }
    }
}
