//! TrainFlow Telemetry - streaming core for trackside vibration sensing.
//!
//! This library ingests accelerometer telemetry from two trackside sensors,
//! keeps bounded sample history, watches device liveness, runs gated spectral
//! analysis over the most recent window, and fans live events out to any
//! number of attached observers.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     TrainFlow Telemetry                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌────────────┐   ┌─────────────┐           │
//! │  │ Ingestion │──▶│  Buffers   │──▶│  Spectral   │           │
//! │  │ (decode/  │   │ (512/axis, │   │ (256-pt FFT │           │
//! │  │  route)   │   │  bounded)  │   │  + gating)  │           │
//! │  └───────────┘   └────────────┘   └─────────────┘           │
//! │        │                                                     │
//! │        ▼                                                     │
//! │  ┌───────────┐   ┌────────────┐   ┌─────────────┐           │
//! │  │ Liveness  │   │ Broadcast  │──▶│ HTTP / SSE  │           │
//! │  │ (5s beat) │   │ (observers)│   │   server    │           │
//! │  └───────────┘   └────────────┘   └─────────────┘           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use trainflow_telemetry::{Config, TelemetryContext};
//! use trainflow_telemetry::transport::ChannelCommandSink;
//!
//! let (sink, _commands) = ChannelCommandSink::new();
//! let context = TelemetryContext::new(Config::default(), Arc::new(sink));
//!
//! // Feed it inbound messages via context.spawn_ingest(receiver)
//! ```

pub mod broadcast;
pub mod config;
pub mod context;
pub mod core;
pub mod ingest;
pub mod server;
pub mod simulator;
pub mod transport;

// Re-export key types at crate root for convenience
pub use broadcast::{EventBroadcaster, StreamEvent};
pub use config::{Config, TopicConfig};
pub use context::TelemetryContext;
pub use core::{AxisSpectra, DeviceStatus, Sample, SampleBuffer, SpectralAnalyzer, SpectralPoint};
pub use ingest::{InboundMessage, SensorId};
pub use transport::{ChannelCommandSink, CommandSink, OutboundCommand, TransportError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
