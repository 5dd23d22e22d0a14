//! On-demand frequency decomposition of buffered sample windows.
//!
//! The analyzer copies the most recent window out of a sensor's buffer,
//! applies a peak-magnitude significance gate, and computes a per-axis DFT
//! over the zero-padded window. Quiet windows are skipped entirely so the
//! stream of noise-only spectra never reaches observers.

use crate::core::buffer::{axis_values, Axis, Sample};
use num_complex::Complex;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};

/// Signals shorter than this produce no spectrum at all.
const MIN_SIGNAL_LEN: usize = 16;

/// One frequency bin of a decomposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralPoint {
    /// Bin frequency rounded to the nearest integer Hz
    pub frequency: u32,
    /// Normalized bin magnitude
    pub magnitude: f64,
}

/// Per-axis spectra for one sensor.
///
/// All three axes empty means the window was below the significance gate;
/// "not ready" is expressed by the analyzer returning `None` instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AxisSpectra {
    pub x: Vec<SpectralPoint>,
    pub y: Vec<SpectralPoint>,
    pub z: Vec<SpectralPoint>,
}

impl AxisSpectra {
    /// Spectra with no bins on any axis (the gated-off result).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether every axis is empty.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty() && self.y.is_empty() && self.z.is_empty()
    }
}

/// Computes gated per-axis spectra from sample windows.
#[derive(Debug, Clone)]
pub struct SpectralAnalyzer {
    sample_rate_hz: f64,
    window_size: usize,
    signal_threshold: f64,
    min_frequency_hz: f64,
    max_frequency_hz: f64,
}

impl SpectralAnalyzer {
    pub fn new(
        sample_rate_hz: f64,
        window_size: usize,
        signal_threshold: f64,
        min_frequency_hz: f64,
        max_frequency_hz: f64,
    ) -> Self {
        Self {
            sample_rate_hz,
            window_size,
            signal_threshold,
            min_frequency_hz,
            max_frequency_hz,
        }
    }

    /// Window size required before any result is produced.
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Analyze the most recent window of `samples`.
    ///
    /// Returns `None` while fewer than the window size have been buffered
    /// ("not ready"), and empty per-axis spectra when the window's peak
    /// magnitude is below the significance threshold ("quiet").
    pub fn analyze(&self, samples: &[Sample]) -> Option<AxisSpectra> {
        if samples.len() < self.window_size {
            return None;
        }
        let window = &samples[samples.len() - self.window_size..];

        // Gate on the sensor-reported magnitude, not any single axis.
        let peak = window
            .iter()
            .map(|s| s.magnitude.abs())
            .fold(0.0_f64, f64::max);
        if peak < self.signal_threshold {
            return Some(AxisSpectra::empty());
        }

        let [x, y, z] = Axis::ALL.map(|axis| self.spectrum(&axis_values(window, axis)));
        Some(AxisSpectra { x, y, z })
    }

    /// Decompose one axis signal into band-filtered frequency bins.
    pub fn spectrum(&self, signal: &[f64]) -> Vec<SpectralPoint> {
        compute_spectrum(
            signal,
            self.sample_rate_hz,
            self.min_frequency_hz,
            self.max_frequency_hz,
        )
    }
}

/// DFT of a zero-padded signal, filtered to `[min_hz, max_hz]`.
///
/// Bin magnitudes are `sqrt(re² + im²) / padded_len` and bin frequencies are
/// `k * sample_rate / padded_len` for `k` in the first half of the padded
/// length. Frequencies are rounded to the nearest integer Hz after band
/// filtering; adjacent bins that round to the same label are kept as
/// separate entries.
pub fn compute_spectrum(
    signal: &[f64],
    sample_rate_hz: f64,
    min_hz: f64,
    max_hz: f64,
) -> Vec<SpectralPoint> {
    if signal.len() < MIN_SIGNAL_LEN {
        return Vec::new();
    }

    let padded_len = signal.len().next_power_of_two();
    let mut buffer: Vec<Complex<f64>> = signal
        .iter()
        .map(|&v| Complex::new(v, 0.0))
        .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
        .take(padded_len)
        .collect();

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(padded_len);
    fft.process(&mut buffer);

    let mut points = Vec::new();
    for (k, bin) in buffer.iter().enumerate().take(padded_len / 2) {
        let frequency = k as f64 * sample_rate_hz / padded_len as f64;
        if frequency >= min_hz && frequency <= max_hz {
            points.push(SpectralPoint {
                frequency: frequency.round() as u32,
                magnitude: bin.norm() / padded_len as f64,
            });
        }
    }

    points
}
