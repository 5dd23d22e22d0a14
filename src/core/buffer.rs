//! Per-sensor sample storage.
//!
//! Each sensor owns a fixed-capacity ring of timestamped samples. The
//! ingestion task is the only writer; the spectral analyzer and the HTTP
//! layer read via `snapshot`, which copies out without mutating.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One accelerometer reading, immutable once stored.
///
/// Fields the core does not interpret (e.g. per-axis voltages) ride along in
/// `extra` and are preserved on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    /// Arrival time, stamped by the ingestion adapter
    pub received_at: DateTime<Utc>,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    /// Combined vibration magnitude reported by the sensor
    #[serde(default)]
    pub magnitude: f64,
    /// Opaque pass-through fields (voltage readings etc.)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Sample {
    /// Decode a sample from an inbound JSON payload, stamping arrival time.
    ///
    /// Missing axis fields decode as zero, and non-object payloads (bare
    /// numbers, arrays) decode as all-zero samples; unknown object fields are
    /// preserved. Payloads with no content (null, `false`, `0`, the empty
    /// string) yield no sample.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        if !has_content(value) {
            return None;
        }

        let empty = serde_json::Map::new();
        let obj = value.as_object().unwrap_or(&empty);

        let field = |key: &str| obj.get(key).and_then(|v| v.as_f64()).unwrap_or(0.0);
        let extra: serde_json::Map<String, serde_json::Value> = obj
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), "x" | "y" | "z" | "magnitude"))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Some(Self {
            received_at: Utc::now(),
            x: field("x"),
            y: field("y"),
            z: field("z"),
            magnitude: field("magnitude"),
            extra,
        })
    }

    /// Select one axis value from the sample.
    pub fn axis(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }
}

/// Accelerometer axis selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All three axes, in wire order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];
}

/// Whether a decoded payload carries any reading at all. Empty-ish values
/// (null, `false`, `0`, `""`) are treated as absent.
fn has_content(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
    }
}

/// Fixed-capacity FIFO buffer of samples for one sensor.
#[derive(Debug)]
pub struct SampleBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl SampleBuffer {
    /// Create an empty buffer holding at most `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest when at capacity.
    pub fn push(&mut self, sample: Sample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Copy out the most recent `n` samples (or fewer), oldest first.
    pub fn snapshot(&self, n: usize) -> Vec<Sample> {
        let skip = self.samples.len().saturating_sub(n);
        self.samples.iter().skip(skip).cloned().collect()
    }

    /// Number of samples currently held.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the buffer holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum number of samples the buffer retains.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Extract one axis from a window of samples.
pub fn axis_values(window: &[Sample], axis: Axis) -> Vec<f64> {
    window.iter().map(|s| s.axis(axis)).collect()
}
