//! Temperature sensor selection.
//!
//! The host is probed once at startup and a [`TemperatureSensor`] strategy is
//! chosen. Every strategy answers [`TemperatureSensor::read`] with a reading or
//! `None`; failures are logged here and never reach the caller.

use std::time::Duration;

use log::{info, warn};

use crate::config::SensorProbe;
use crate::error::SensorError;
use crate::sources::helpers::command_exists;
use crate::sources::{ExternalToolSensor, FilesystemSensor};

/// A temperature in degrees Celsius, or `None` when the sensor is unavailable.
pub type TemperatureReading = Option<f64>;

/// Which kind of sensor detection settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// No sensor; reseeding uses clocks and OS padding only.
    NoSensor,
    /// Thermal zone file (Coral Dev Board, generic Linux).
    Filesystem,
    /// External measurement tool (`vcgencmd` on Raspberry Pi).
    ExternalTool,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSensor => write!(f, "none"),
            Self::Filesystem => write!(f, "thermal_zone"),
            Self::ExternalTool => write!(f, "external_tool"),
        }
    }
}

/// Capability-checked temperature reader.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TemperatureSensor {
    #[default]
    NoSensor,
    Filesystem(FilesystemSensor),
    ExternalTool(ExternalToolSensor),
}

impl TemperatureSensor {
    /// Probe the host: a thermal zone file wins, then the measurement tool on
    /// `PATH`, otherwise no sensor. Never fails.
    pub fn detect(probe: &SensorProbe) -> Self {
        let thermal = FilesystemSensor::new(&probe.thermal_path, probe.timeout);
        let sensor = if thermal.is_available() {
            Self::Filesystem(thermal)
        } else if command_exists(&probe.tool) {
            Self::ExternalTool(ExternalToolSensor::measure_temp(&probe.tool, probe.timeout))
        } else {
            Self::NoSensor
        };
        sensor.log_detected();
        sensor
    }

    pub fn filesystem(path: impl Into<std::path::PathBuf>, timeout: Duration) -> Self {
        Self::Filesystem(FilesystemSensor::new(path, timeout))
    }

    pub fn external_tool(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self::ExternalTool(ExternalToolSensor::new(program, args, timeout))
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Self::NoSensor => SourceKind::NoSensor,
            Self::Filesystem(_) => SourceKind::Filesystem,
            Self::ExternalTool(_) => SourceKind::ExternalTool,
        }
    }

    /// Take one reading. Errors are logged and reported as `None`.
    pub async fn read(&self) -> TemperatureReading {
        match self.try_read().await {
            Ok(celsius) => Some(celsius),
            Err(SensorError::Unsupported) => None,
            Err(e) => {
                warn!("temp read failed ({}): {e}", self.kind());
                None
            }
        }
    }

    /// Take one reading, keeping the failure reason.
    pub async fn try_read(&self) -> Result<f64, SensorError> {
        match self {
            Self::NoSensor => Err(SensorError::Unsupported),
            Self::Filesystem(s) => s.read().await,
            Self::ExternalTool(s) => s.read().await,
        }
    }

    fn log_detected(&self) {
        match self {
            Self::Filesystem(s) => info!("thermal zone detected ({})", s.path().display()),
            Self::ExternalTool(s) => info!("measurement tool detected ({})", s.program()),
            Self::NoSensor => info!("no thermal sensor found, using time-only entropy"),
        }
    }
}
