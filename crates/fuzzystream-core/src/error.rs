//! Error types for configuration loading and sensor reads.
//!
//! Sensor errors never escape [`TemperatureSensor::read`](crate::TemperatureSensor::read):
//! they are logged and collapsed into an unavailable reading. Configuration
//! errors are fatal at startup and propagate to the binary.

use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

/// Failure to load or validate a [`BeaconConfig`](crate::BeaconConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Why a single temperature read produced no value.
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse temperature from {raw:?}")]
    Parse { raw: String },

    #[error("read timed out after {0:?}")]
    Timeout(Duration),

    #[error("measurement tool exited with {status}")]
    ToolFailed { status: ExitStatus },

    #[error("no thermal sensor on this host")]
    Unsupported,
}
