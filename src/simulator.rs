//! Synthetic sensor source for running without real hardware.
//!
//! Generates the same shape of traffic the trackside unit produces: 50 Hz
//! accelerometer payloads for both sensors with pass-through voltage
//! readings, plus train-state transitions. Between passes the signal is
//! low-amplitude noise below the significance gate; a train pass sweeps a
//! vibration burst well above it. Passes happen on a fixed schedule and on
//! demand via the trigger command topic.

use crate::config::TopicConfig;
use crate::ingest::InboundMessage;
use crate::transport::OutboundCommand;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use std::time::Duration;
use tokio::sync::mpsc;

/// Amplitude of idle vibration noise, in sensor units.
const IDLE_NOISE: f64 = 25.0;

/// Peak axis amplitude during a train pass; comfortably above the 1500-unit
/// significance gate once all axes combine.
const PASS_AMPLITUDE: f64 = 2500.0;

/// Zero-g midpoint of the accelerometer's analog output, in volts.
const ZERO_G_VOLTAGE: f64 = 1.65;

/// Volts per sensor unit for the reported voltage pass-through.
const VOLTS_PER_UNIT: f64 = 0.00033;

/// How long one simulated pass lasts.
const PASS_DURATION: Duration = Duration::from_secs(8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Approaching,
    Passing,
    Departing,
}

impl Phase {
    fn label(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Approaching => "approaching",
            Phase::Passing => "passing",
            Phase::Departing => "departing",
        }
    }

    /// Phase for a pass progress fraction in [0, 1).
    fn for_progress(progress: f64) -> Self {
        if progress < 0.25 {
            Phase::Approaching
        } else if progress < 0.75 {
            Phase::Passing
        } else {
            Phase::Departing
        }
    }
}

/// Drives synthetic samples into the inbound channel.
pub struct SensorSimulator {
    inbound: mpsc::Sender<InboundMessage>,
    topics: TopicConfig,
    sample_rate_hz: f64,
    /// Interval between automatic train passes
    pass_interval: Duration,
}

impl SensorSimulator {
    pub fn new(
        inbound: mpsc::Sender<InboundMessage>,
        topics: TopicConfig,
        sample_rate_hz: f64,
        pass_interval: Duration,
    ) -> Self {
        Self {
            inbound,
            topics,
            sample_rate_hz,
            pass_interval,
        }
    }

    /// Generate samples until the inbound channel closes. Commands on the
    /// trigger topic start a pass immediately.
    pub async fn run(self, mut commands: mpsc::UnboundedReceiver<OutboundCommand>) {
        let mut rng = StdRng::from_entropy();
        let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / self.sample_rate_hz));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let pass_ticks = (PASS_DURATION.as_secs_f64() * self.sample_rate_hz) as u64;
        let interval_ticks = (self.pass_interval.as_secs_f64() * self.sample_rate_hz) as u64;

        let mut tick: u64 = 0;
        let mut pass_started_at: Option<u64> = None;
        let mut phase = Phase::Idle;

        tracing::info!(
            rate = self.sample_rate_hz,
            "sensor simulator started"
        );

        loop {
            ticker.tick().await;
            tick += 1;

            // Manual trigger from the command path
            while let Ok(command) = commands.try_recv() {
                if command.topic == self.topics.command_trigger && pass_started_at.is_none() {
                    tracing::info!("train pass triggered by command");
                    pass_started_at = Some(tick);
                }
            }

            // Scheduled passes
            if interval_ticks > 0 && tick % interval_ticks == 0 && pass_started_at.is_none() {
                pass_started_at = Some(tick);
            }

            let progress = pass_started_at.map(|start| {
                let elapsed = tick - start;
                elapsed as f64 / pass_ticks as f64
            });

            let next_phase = match progress {
                Some(p) if p < 1.0 => Phase::for_progress(p),
                _ => {
                    pass_started_at = None;
                    Phase::Idle
                }
            };

            if next_phase != phase {
                phase = next_phase;
                let state = serde_json::json!({
                    "phase": phase.label(),
                    "speed": if phase == Phase::Idle { 0.0 } else { 80.0 },
                });
                if !self.publish(&self.topics.train_state, state).await {
                    return;
                }
            }

            let t = tick as f64 / self.sample_rate_hz;
            let envelope = match progress {
                // Half-sine envelope over the pass
                Some(p) if p < 1.0 => (PI * p).sin() * PASS_AMPLITUDE,
                _ => 0.0,
            };

            for (topic, phase_offset) in [
                (&self.topics.sensor_a, 0.0),
                // Sensor B sits further down the track
                (&self.topics.sensor_b, 0.4),
            ] {
                let sample = vibration_sample(t + phase_offset, envelope, &mut rng);
                if !self.publish(topic, sample).await {
                    return;
                }
            }
        }
    }

    async fn publish(&self, topic: &str, value: serde_json::Value) -> bool {
        let message = InboundMessage::new(topic, value.to_string().into_bytes());
        if self.inbound.send(message).await.is_err() {
            tracing::info!("inbound channel closed, simulator stopped");
            return false;
        }
        true
    }
}

/// One synthetic accelerometer payload at time `t`.
fn vibration_sample(t: f64, envelope: f64, rng: &mut StdRng) -> serde_json::Value {
    let noise = |rng: &mut StdRng| rng.gen_range(-IDLE_NOISE..IDLE_NOISE);

    // Wheel-impact vibration concentrates low in the band; two components
    // keep the spectrum from looking like a single synthetic tone.
    let x = envelope * (2.0 * PI * 12.0 * t).sin() + noise(rng);
    let y = envelope * 0.6 * (2.0 * PI * 18.0 * t).sin() + noise(rng);
    let z = envelope * 0.3 * (2.0 * PI * 15.0 * t).sin() + noise(rng);
    let magnitude = (x * x + y * y + z * z).sqrt();

    let volts = |v: f64| (ZERO_G_VOLTAGE + v * VOLTS_PER_UNIT).clamp(0.0, 3.3);

    serde_json::json!({
        "x": x,
        "y": y,
        "z": z,
        "magnitude": magnitude,
        "voltage": { "x": volts(x), "y": volts(y), "z": volts(z) },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_sample_stays_below_gate() {
        let mut rng = StdRng::seed_from_u64(7);
        for i in 0..100 {
            let sample = vibration_sample(i as f64 / 50.0, 0.0, &mut rng);
            let magnitude = sample["magnitude"].as_f64().unwrap();
            assert!(magnitude < 1500.0, "idle magnitude {magnitude}");
        }
    }

    #[test]
    fn test_pass_peak_crosses_gate() {
        let mut rng = StdRng::seed_from_u64(7);
        let peak = (0..400)
            .map(|i| {
                let sample = vibration_sample(i as f64 / 50.0, PASS_AMPLITUDE, &mut rng);
                sample["magnitude"].as_f64().unwrap()
            })
            .fold(0.0_f64, f64::max);
        assert!(peak > 1500.0, "pass peak {peak}");
    }

    #[test]
    fn test_voltage_within_rail() {
        let mut rng = StdRng::seed_from_u64(7);
        let sample = vibration_sample(0.1, PASS_AMPLITUDE, &mut rng);
        for axis in ["x", "y", "z"] {
            let v = sample["voltage"][axis].as_f64().unwrap();
            assert!((0.0..=3.3).contains(&v));
        }
    }

    #[test]
    fn test_phase_progression() {
        assert_eq!(Phase::for_progress(0.1), Phase::Approaching);
        assert_eq!(Phase::for_progress(0.5), Phase::Passing);
        assert_eq!(Phase::for_progress(0.9), Phase::Departing);
    }
}
