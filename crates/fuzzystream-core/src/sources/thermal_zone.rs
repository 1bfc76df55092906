//! FilesystemSensor: CPU temperature from a Linux thermal zone.
//!
//! The thermal framework exposes the die temperature as an integer number of
//! millidegrees Celsius, e.g. `61000` for 61.0 °C. Found on the Coral Dev Board
//! and most ARM boards with a mainline kernel.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::SensorError;

/// Reads a `thermal_zone*/temp` file.
#[derive(Debug, Clone, PartialEq)]
pub struct FilesystemSensor {
    path: PathBuf,
    timeout: Duration,
}

impl FilesystemSensor {
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the sensor file exists on this host.
    pub fn is_available(&self) -> bool {
        self.path.exists()
    }

    pub async fn read(&self) -> Result<f64, SensorError> {
        let raw = tokio::time::timeout(self.timeout, tokio::fs::read_to_string(&self.path))
            .await
            .map_err(|_| SensorError::Timeout(self.timeout))??;
        parse_millidegrees(&raw)
    }
}

/// `"61000\n"` -> `61.0`
pub fn parse_millidegrees(raw: &str) -> Result<f64, SensorError> {
    let trimmed = raw.trim();
    trimmed
        .parse::<i64>()
        .map(|milli| milli as f64 / 1000.0)
        .map_err(|_| SensorError::Parse {
            raw: trimmed.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_millidegrees() {
        assert_eq!(parse_millidegrees("61000\n").unwrap(), 61.0);
        assert_eq!(parse_millidegrees("  42937 ").unwrap(), 42.937);
        assert_eq!(parse_millidegrees("-5000").unwrap(), -5.0);
    }

    #[test]
    fn rejects_non_integer_content() {
        assert!(matches!(
            parse_millidegrees("61.5"),
            Err(SensorError::Parse { .. })
        ));
        assert!(parse_millidegrees("").is_err());
    }

    #[tokio::test]
    async fn reads_fake_thermal_zone() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "48500").unwrap();

        let sensor = FilesystemSensor::new(file.path(), Duration::from_secs(2));
        assert!(sensor.is_available());
        assert_eq!(sensor.read().await.unwrap(), 48.5);
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let sensor = FilesystemSensor::new("/nonexistent/thermal_zone0/temp", Duration::from_secs(1));
        assert!(!sensor.is_available());
        assert!(matches!(sensor.read().await, Err(SensorError::Io(_))));
    }
}
