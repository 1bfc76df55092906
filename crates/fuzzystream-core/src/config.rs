//! Beacon configuration.
//!
//! Every knob has a default matching the reference deployment (50 Hz digit
//! cadence, 4 digits per message, 1 s reseed interval, port 8765). A JSON file
//! may override any subset of fields; the CLI layers flags on top of that.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default thermal zone exposed by the Linux thermal framework.
pub const DEFAULT_THERMAL_PATH: &str = "/sys/class/thermal/thermal_zone0/temp";

/// Default external measurement tool (Raspberry Pi firmware utility).
pub const DEFAULT_SENSOR_TOOL: &str = "vcgencmd";

/// Shortest accepted reseed interval.
pub const MIN_RESEED_INTERVAL: Duration = Duration::from_millis(1);

/// Longest accepted reseed interval (one day).
pub const MAX_RESEED_INTERVAL: Duration = Duration::from_secs(86_400);

/// Runtime configuration for the beacon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BeaconConfig {
    /// Cadence of a single digit, in milliseconds.
    pub tick_interval_ms: u64,
    /// Digits per WebSocket message. `1` sends every digit on its own tick.
    pub batch_size: usize,
    /// Seconds between reseed cycles.
    pub reseed_interval_s: f64,
    pub host: String,
    pub port: u16,
    /// Run the periodic reseed loop. When false the generator is seeded from
    /// the OS and stirred once at startup only.
    pub reseed: bool,
    /// Fold the temperature sensor into reseeding.
    pub temperature: bool,
    /// Upper bound on one sensor read.
    pub sensor_timeout_ms: u64,
    /// Filesystem sensor probed at startup.
    pub thermal_path: PathBuf,
    /// External tool probed on `PATH` when no thermal zone exists.
    pub sensor_tool: String,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 20,
            batch_size: 4,
            reseed_interval_s: 1.0,
            host: "0.0.0.0".to_string(),
            port: 8765,
            reseed: true,
            temperature: true,
            sensor_timeout_ms: 2000,
            thermal_path: PathBuf::from(DEFAULT_THERMAL_PATH),
            sensor_tool: DEFAULT_SENSOR_TOOL.to_string(),
        }
    }
}

impl BeaconConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reject values the loops cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::invalid("batch_size", "must be at least 1"));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::invalid("tick_interval_ms", "must be at least 1"));
        }
        if self.sensor_timeout_ms == 0 {
            return Err(ConfigError::invalid("sensor_timeout_ms", "must be at least 1"));
        }
        self.reseed_interval()?;
        if self.host.trim().is_empty() {
            return Err(ConfigError::invalid("host", "must not be empty"));
        }
        // Guard the multiplication in `broadcast_period`.
        if self.tick_interval_ms.checked_mul(self.batch_size as u64).is_none() {
            return Err(ConfigError::invalid(
                "batch_size",
                "tick_interval_ms * batch_size overflows",
            ));
        }
        Ok(())
    }

    /// Time between two broadcast ticks: one message carries `batch_size`
    /// digits, so the period scales with the batch.
    pub fn broadcast_period(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.saturating_mul(self.batch_size as u64))
    }

    /// `reseed_interval_s` as a [`Duration`], between
    /// [`MIN_RESEED_INTERVAL`] and [`MAX_RESEED_INTERVAL`].
    pub fn reseed_interval(&self) -> Result<Duration, ConfigError> {
        let secs = self.reseed_interval_s;
        let out_of_range = || {
            ConfigError::invalid(
                "reseed_interval_s",
                format!(
                    "must be between {} and {} seconds, got {secs}",
                    MIN_RESEED_INTERVAL.as_secs_f64(),
                    MAX_RESEED_INTERVAL.as_secs_f64(),
                ),
            )
        };
        let interval = Duration::try_from_secs_f64(secs).map_err(|_| out_of_range())?;
        if !(MIN_RESEED_INTERVAL..=MAX_RESEED_INTERVAL).contains(&interval) {
            return Err(out_of_range());
        }
        Ok(interval)
    }

    pub fn sensor_timeout(&self) -> Duration {
        Duration::from_millis(self.sensor_timeout_ms)
    }

    /// `host:port` string suitable for binding.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The sensor probe described by this config.
    pub fn sensor_probe(&self) -> SensorProbe {
        SensorProbe {
            thermal_path: self.thermal_path.clone(),
            tool: self.sensor_tool.clone(),
            timeout: self.sensor_timeout(),
        }
    }
}

/// Where sensor detection looks, and how long a read may take.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorProbe {
    pub thermal_path: PathBuf,
    pub tool: String,
    pub timeout: Duration,
}

impl Default for SensorProbe {
    fn default() -> Self {
        BeaconConfig::default().sensor_probe()
    }
}
