//! Configuration for the TrainFlow telemetry core.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for the telemetry core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Sensor sample rate in Hz
    pub sample_rate_hz: f64,

    /// Capacity of each per-sensor ring buffer (must be >= fft_window_size)
    pub buffer_capacity: usize,

    /// Number of most-recent samples fed into each spectral decomposition
    pub fft_window_size: usize,

    /// Peak-magnitude threshold below which spectra are not computed
    pub signal_threshold: f64,

    /// Lower edge of the retained frequency band in Hz
    pub min_frequency_hz: f64,

    /// Upper edge of the retained frequency band in Hz
    pub max_frequency_hz: f64,

    /// Device is considered offline after this long without a sample
    #[serde(with = "duration_millis_serde")]
    pub heartbeat_timeout: Duration,

    /// Interval between periodic status broadcasts to observers
    #[serde(with = "duration_millis_serde")]
    pub status_interval: Duration,

    /// Per-observer event queue depth; events beyond this are dropped
    pub observer_queue_depth: usize,

    /// Topic names for inbound message routing
    pub topics: TopicConfig,

    /// Port for the HTTP API (0 for random)
    pub server_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_rate_hz: 50.0,
            buffer_capacity: 512,
            fft_window_size: 256,
            signal_threshold: 1500.0,
            min_frequency_hz: 10.0,
            max_frequency_hz: 250.0,
            heartbeat_timeout: Duration::from_millis(5000),
            status_interval: Duration::from_millis(1000),
            observer_queue_depth: 256,
            topics: TopicConfig::default(),
            server_port: 5000,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("trainflow-telemetry")
            .join("config.json")
    }

    /// Check cross-field invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_capacity < self.fft_window_size {
            return Err(ConfigError::Invalid(format!(
                "buffer_capacity ({}) must be >= fft_window_size ({})",
                self.buffer_capacity, self.fft_window_size
            )));
        }
        if self.sample_rate_hz <= 0.0 {
            return Err(ConfigError::Invalid(
                "sample_rate_hz must be positive".to_string(),
            ));
        }
        if self.min_frequency_hz > self.max_frequency_hz {
            return Err(ConfigError::Invalid(format!(
                "min_frequency_hz ({}) must be <= max_frequency_hz ({})",
                self.min_frequency_hz, self.max_frequency_hz
            )));
        }
        Ok(())
    }
}

/// Topic names the ingestion adapter routes on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicConfig {
    /// Sample topic for sensor A
    pub sensor_a: String,
    /// Sample topic for sensor B
    pub sensor_b: String,
    /// Last-value topic carrying the detected train state
    pub train_state: String,
    /// Outbound topic for the "trigger train" command
    pub command_trigger: String,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            sensor_a: "trainflow/sensor/A".to_string(),
            sensor_b: "trainflow/sensor/B".to_string(),
            train_state: "trainflow/trainState".to_string(),
            command_trigger: "trainflow/command/trigger".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::Invalid(e) => write!(f, "Invalid config: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for millisecond durations.
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
